use streamkit_amf0::Amf0Value;

use crate::sessions::StreamMetadata;
use crate::time::RtmpTimestamp;

/// Events that can be raised by the client session so that custom business logic can be written
/// to react to it
#[derive(PartialEq, Debug, Clone)]
pub enum ClientSessionEvent {
    HandshakeCompleted,

    /// Raised when a connection request has been accepted by the server
    ConnectionRequestAccepted,

    /// The server allocated a message stream for playback
    StreamCreated { stream_id: u32 },

    /// The server confirmed playback of the stream has started
    PlaybackStarted { stream_name: String, stream_id: u32 },

    /// The server signalled the end of the stream being played
    PlaybackFinished { stream_id: u32 },

    /// Every `onStatus` the server sends, including the ones that lead to other events
    StatusReceived {
        level: String,
        code: String,
        description: Option<String>,
    },

    /// The server sent new metadata for the stream being played
    StreamMetadataReceived { metadata: StreamMetadata },

    /// The server is changing the maximum size of the RTMP chunks they will be sending
    ServerChunkSizeChanged { new_chunk_size: u32 },

    /// The server sent an Amf0 command that was not able to be handled
    UnhandleableAmf0Command {
        command_name: String,
        transaction_id: f64,
        command_object: Amf0Value,
        additional_values: Vec<Amf0Value>,
    },

    /// The server sent us a result to a transaction that we don't know about
    UnknownTransactionResultReceived {
        transaction_id: f64,
        command_object: Amf0Value,
        additional_values: Vec<Amf0Value>,
    },

    /// The server has sent an acknowledgement that they have received the specified number of bytes
    AcknowledgementReceived { bytes_received: u32 },

    /// The server has responded to a ping request
    PingResponseReceived { timestamp: RtmpTimestamp },
}
