/*!
RTMP message types and the conversion between them and raw `MessagePayload`s.

A `MessagePayload` is what the chunk layer produces and consumes: a type id, message stream id,
timestamp and opaque body.  `RtmpMessage` is the decoded form the sessions work with.
*/

mod deserialization_errors;
mod message_payload;
mod serialization_errors;
mod types;

pub use self::deserialization_errors::MessageDeserializationError;
pub use self::message_payload::MessagePayload;
pub use self::serialization_errors::MessageSerializationError;

use crate::time::RtmpTimestamp;
use bytes::Bytes;
use streamkit_amf0::Amf0Value;

pub const SET_CHUNK_SIZE_TYPE_ID: u8 = 1;
pub const ABORT_TYPE_ID: u8 = 2;
pub const ACKNOWLEDGEMENT_TYPE_ID: u8 = 3;
pub const USER_CONTROL_TYPE_ID: u8 = 4;
pub const WINDOW_ACKNOWLEDGEMENT_SIZE_TYPE_ID: u8 = 5;
pub const SET_PEER_BANDWIDTH_TYPE_ID: u8 = 6;
pub const AUDIO_TYPE_ID: u8 = 8;
pub const VIDEO_TYPE_ID: u8 = 9;
pub const AMF0_DATA_TYPE_ID: u8 = 18;
pub const AMF0_COMMAND_TYPE_ID: u8 = 20;

/// The kind of media carried by an audio or video message
#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash)]
pub enum MediaType {
    Audio,
    Video,
}

impl MediaType {
    pub fn from_type_id(type_id: u8) -> Option<MediaType> {
        match type_id {
            AUDIO_TYPE_ID => Some(MediaType::Audio),
            VIDEO_TYPE_ID => Some(MediaType::Video),
            _ => None,
        }
    }
}

/// How the peer should apply a `SetPeerBandwidth` limit
#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub enum PeerBandwidthLimitType {
    /// Limit output bandwidth to the indicated window size
    Hard,

    /// Limit output to the indicated window or the limit already in effect, whichever is smaller
    Soft,

    /// Treat as hard if the previous limit was hard, otherwise ignore
    Dynamic,
}

/// Events that can be raised through a user control message
#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub enum UserControlEventType {
    /// A stream has become functional
    StreamBegin,

    /// Playback of the stream is over
    StreamEof,

    /// There is no more data on the stream
    StreamDry,

    /// The client's buffer size, in milliseconds
    SetBufferLength,

    StreamIsRecorded,
    PingRequest,
    PingResponse,

    /// Any event id without a defined meaning.  Its four byte payload is discarded.
    Unrecognized(u16),
}

/// Every RTMP message the sessions know how to read or write
#[derive(PartialEq, Debug, Clone)]
pub enum RtmpMessage {
    /// A message with a type id this crate has no decoder for
    Unknown { type_id: u8, data: Bytes },

    /// Tells the peer to discard the partially received message on the given chunk stream
    Abort { stream_id: u32 },

    /// Total number of bytes received so far
    Acknowledgement { sequence_number: u32 },

    Amf0Command {
        command_name: String,
        transaction_id: f64,
        command_object: Amf0Value,
        additional_arguments: Vec<Amf0Value>,
    },

    Amf0Data { values: Vec<Amf0Value> },
    AudioData { data: Bytes },

    /// The maximum chunk size the sender will use from now on
    SetChunkSize { size: u32 },

    SetPeerBandwidth {
        size: u32,
        limit_type: PeerBandwidthLimitType,
    },

    UserControl {
        event_type: UserControlEventType,
        stream_id: Option<u32>,
        buffer_length: Option<u32>,
        timestamp: Option<RtmpTimestamp>,
    },

    VideoData { data: Bytes },

    /// How many bytes the peer should receive before sending an `Acknowledgement`
    WindowAcknowledgement { size: u32 },
}

impl RtmpMessage {
    pub fn into_message_payload(
        self,
        timestamp: RtmpTimestamp,
        message_stream_id: u32,
    ) -> Result<MessagePayload, MessageSerializationError> {
        MessagePayload::from_rtmp_message(self, timestamp, message_stream_id)
    }

    pub fn get_message_type_id(&self) -> u8 {
        match *self {
            RtmpMessage::Unknown { type_id, .. } => type_id,
            RtmpMessage::Abort { .. } => ABORT_TYPE_ID,
            RtmpMessage::Acknowledgement { .. } => ACKNOWLEDGEMENT_TYPE_ID,
            RtmpMessage::Amf0Command { .. } => AMF0_COMMAND_TYPE_ID,
            RtmpMessage::Amf0Data { .. } => AMF0_DATA_TYPE_ID,
            RtmpMessage::AudioData { .. } => AUDIO_TYPE_ID,
            RtmpMessage::SetChunkSize { .. } => SET_CHUNK_SIZE_TYPE_ID,
            RtmpMessage::SetPeerBandwidth { .. } => SET_PEER_BANDWIDTH_TYPE_ID,
            RtmpMessage::UserControl { .. } => USER_CONTROL_TYPE_ID,
            RtmpMessage::VideoData { .. } => VIDEO_TYPE_ID,
            RtmpMessage::WindowAcknowledgement { .. } => WINDOW_ACKNOWLEDGEMENT_SIZE_TYPE_ID,
        }
    }
}
