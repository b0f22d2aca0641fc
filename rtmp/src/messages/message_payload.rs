use bytes::Bytes;

use super::types;
use crate::messages::{MessageDeserializationError, MessageSerializationError, RtmpMessage};
use crate::messages::{
    ABORT_TYPE_ID, ACKNOWLEDGEMENT_TYPE_ID, AMF0_COMMAND_TYPE_ID, AMF0_DATA_TYPE_ID,
    AUDIO_TYPE_ID, SET_CHUNK_SIZE_TYPE_ID, SET_PEER_BANDWIDTH_TYPE_ID, USER_CONTROL_TYPE_ID,
    VIDEO_TYPE_ID, WINDOW_ACKNOWLEDGEMENT_SIZE_TYPE_ID,
};
use crate::time::RtmpTimestamp;

/// A complete RTMP message as it travels through the chunk layer: header values plus the
/// undecoded body.
#[derive(PartialEq, Debug, Clone)]
pub struct MessagePayload {
    pub timestamp: RtmpTimestamp,
    pub type_id: u8,
    pub message_stream_id: u32,
    pub data: Bytes,
}

impl MessagePayload {
    pub fn new() -> MessagePayload {
        MessagePayload {
            timestamp: RtmpTimestamp::new(0),
            type_id: 0,
            message_stream_id: 0,
            data: Bytes::new(),
        }
    }

    pub fn to_rtmp_message(&self) -> Result<RtmpMessage, MessageDeserializationError> {
        let data = &self.data[..];
        match self.type_id {
            SET_CHUNK_SIZE_TYPE_ID => types::set_chunk_size::deserialize(data),
            ABORT_TYPE_ID => types::abort::deserialize(data),
            ACKNOWLEDGEMENT_TYPE_ID => types::acknowledgement::deserialize(data),
            USER_CONTROL_TYPE_ID => types::user_control::deserialize(data),
            WINDOW_ACKNOWLEDGEMENT_SIZE_TYPE_ID => types::window_acknowledgement_size::deserialize(data),
            SET_PEER_BANDWIDTH_TYPE_ID => types::set_peer_bandwidth::deserialize(data),
            AUDIO_TYPE_ID => Ok(RtmpMessage::AudioData { data: self.data.clone() }),
            VIDEO_TYPE_ID => Ok(RtmpMessage::VideoData { data: self.data.clone() }),
            AMF0_DATA_TYPE_ID => types::amf0_data::deserialize(data),
            AMF0_COMMAND_TYPE_ID => types::amf0_command::deserialize(data),
            type_id => Ok(RtmpMessage::Unknown {
                type_id,
                data: self.data.clone(),
            }),
        }
    }

    pub fn from_rtmp_message(
        message: RtmpMessage,
        timestamp: RtmpTimestamp,
        message_stream_id: u32,
    ) -> Result<MessagePayload, MessageSerializationError> {
        let type_id = message.get_message_type_id();
        let data = match message {
            RtmpMessage::Unknown { data, .. } => data,
            RtmpMessage::Abort { stream_id } => types::abort::serialize(stream_id),
            RtmpMessage::Acknowledgement { sequence_number } => {
                types::acknowledgement::serialize(sequence_number)
            }

            RtmpMessage::Amf0Command {
                command_name,
                transaction_id,
                command_object,
                additional_arguments,
            } => types::amf0_command::serialize(
                command_name,
                transaction_id,
                command_object,
                additional_arguments,
            )?,

            RtmpMessage::Amf0Data { values } => types::amf0_data::serialize(values)?,
            RtmpMessage::AudioData { data } => data,
            RtmpMessage::SetChunkSize { size } => types::set_chunk_size::serialize(size)?,
            RtmpMessage::SetPeerBandwidth { size, limit_type } => {
                types::set_peer_bandwidth::serialize(limit_type, size)
            }

            RtmpMessage::UserControl {
                event_type,
                stream_id,
                buffer_length,
                timestamp,
            } => types::user_control::serialize(event_type, stream_id, buffer_length, timestamp),

            RtmpMessage::VideoData { data } => data,
            RtmpMessage::WindowAcknowledgement { size } => {
                types::window_acknowledgement_size::serialize(size)
            }
        };

        Ok(MessagePayload {
            timestamp,
            type_id,
            message_stream_id,
            data,
        })
    }
}

impl Default for MessagePayload {
    fn default() -> Self {
        MessagePayload::new()
    }
}
