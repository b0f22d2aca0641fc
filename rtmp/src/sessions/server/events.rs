use streamkit_amf0::Amf0Value;

use crate::sessions::StreamMetadata;
use crate::time::RtmpTimestamp;

/// An event that a server session can raise
#[derive(Debug, PartialEq, Clone)]
pub enum ServerSessionEvent {
    HandshakeCompleted,

    /// The client is changing the maximum size of the RTMP chunks they will be sending
    ClientChunkSizeChanged { new_chunk_size: u32 },

    /// The client connected on the specified RTMP application name
    ConnectionAccepted { app_name: String },

    PublishStreamStarted {
        app_name: String,
        stream_name: String,
        stream_id: u32,
    },

    /// The client is finished publishing on the specified stream
    PublishStreamFinished { app_name: String, stream_name: String },

    PlayStreamStarted {
        app_name: String,
        stream_name: String,
        stream_id: u32,
    },

    /// The client is finished with playback of the specified stream
    PlayStreamFinished { app_name: String, stream_name: String },

    /// The client is changing metadata properties of the stream being published
    StreamMetadataChanged {
        app_name: String,
        stream_name: String,
        metadata: StreamMetadata,
    },

    /// The client sent an Amf0 command that was not able to be handled
    UnhandleableAmf0Command {
        command_name: String,
        transaction_id: f64,
        command_object: Amf0Value,
        additional_values: Vec<Amf0Value>,
    },

    /// The client answered a command the application sent with `_result`
    CommandResultReceived {
        transaction_id: f64,
        command_object: Amf0Value,
        additional_values: Vec<Amf0Value>,
    },

    /// The client answered a command the application sent with `_error`
    CommandErrorReceived {
        transaction_id: f64,
        command_object: Amf0Value,
        additional_values: Vec<Amf0Value>,
    },

    /// The client has sent an acknowledgement that they have received the specified number of bytes
    AcknowledgementReceived { bytes_received: u32 },

    /// The client has responded to a ping request
    PingResponseReceived { timestamp: RtmpTimestamp },
}
