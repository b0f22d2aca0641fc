use thiserror::Error;

use crate::chunk_io::{ChunkEncodingError, ChunkReassemblyError};
use crate::handshake::HandshakeError;
use crate::messages::{MessageDeserializationError, MessageSerializationError};

/// Errors that end a client session.  The connection should be closed after any of them.
#[derive(Debug, Error)]
pub enum ClientSessionError {
    #[error("The handshake with the server failed: {0}")]
    Handshake(#[from] HandshakeError),

    /// Encountered when an error occurs while reassembling the incoming byte data
    #[error("An error occurred deserializing incoming data: {0}")]
    ChunkReassembly(#[from] ChunkReassemblyError),

    /// Encountered when an error occurs while serializing outbound messages
    #[error("An error occurred serializing outbound messages: {0}")]
    ChunkEncoding(#[from] ChunkEncodingError),

    /// Encountered when an error occurs while turning an RTMP message into an message payload
    #[error(
        "An error occurred while attempting to turn an RTMP message into a message payload: {0}"
    )]
    MessageSerialization(#[from] MessageSerializationError),

    /// Encountered when an error occurs while turning a message payload into an RTMP message
    #[error(
        "An error occurred while attempting to turn a message payload into an RTMP message: {0}"
    )]
    MessageDeserialization(#[from] MessageDeserializationError),

    /// The server answered one of our requests with `_error`
    #[error("The server rejected the '{command}' request: {code:?} {description:?}")]
    RequestRejected {
        command: String,
        code: Option<String>,
        description: Option<String>,
    },

    /// A response to a `createStream` request should have a numeric as the first parameter
    /// in the additional values property of the amf0 command.  Without a stream ID we have no
    /// way to know what stream to request playback on.
    #[error("The server sent a create stream success result without a stream id")]
    CreateStreamResponseHadNoStreamNumber,

    #[error("The session was closed by an earlier error")]
    SessionClosed,
}
