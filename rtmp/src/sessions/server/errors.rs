use thiserror::Error;

use super::PolicyOutcome;
use crate::chunk_io::{ChunkEncodingError, ChunkReassemblyError, Packet};
use crate::handshake::HandshakeError;
use crate::messages::{MessageDeserializationError, MessageSerializationError};

/// Errors that end a server session.  The connection should be closed after any of them.
#[derive(Debug, Error)]
pub enum ServerSessionError {
    #[error("The handshake with the client failed: {0}")]
    Handshake(#[from] HandshakeError),

    #[error("An error occurred deserializing incoming data: {0}")]
    ChunkReassembly(#[from] ChunkReassemblyError),

    #[error("An error occurred serializing outbound messages: {0}")]
    ChunkEncoding(#[from] ChunkEncodingError),

    #[error("An error occurred while attempting to turn an RTMP message into a message payload: {0}")]
    MessageSerialization(#[from] MessageSerializationError),

    #[error("An error occurred while attempting to turn a message payload into an RTMP message: {0}")]
    MessageDeserialization(#[from] MessageDeserializationError),

    /// A connection request was made without a valid RTMP app name
    #[error("The connection request did not have a non-empty RTMP app name")]
    NoAppNameForConnectionRequest,

    /// The handler refused a publish or play request.  `final_response` holds every response
    /// produced by the rejected input, ending with the error status, and should be sent before
    /// the connection is closed.  Events raised earlier in the same input are not reported.
    #[error("Request for stream '{stream_name}' was rejected with outcome {outcome:?}")]
    PolicyRejected {
        outcome: PolicyOutcome,
        stream_name: String,
        final_response: Packet,
    },

    #[error("The session was closed by an earlier error")]
    SessionClosed,
}
