use std::collections::HashMap;

use bytes::{Bytes, BytesMut};
use log::trace;

use super::chunk_header::{self, ChunkHeader, ChunkType, DEFAULT_CHUNK_SIZE, MAX_TIMESTAMP_FIELD};
use super::ChunkEncodingError;
use crate::messages::{MessagePayload, RtmpMessage};
use crate::messages::{AMF0_COMMAND_TYPE_ID, AMF0_DATA_TYPE_ID, AUDIO_TYPE_ID, VIDEO_TYPE_ID};
use crate::time::RtmpTimestamp;

const MAX_MESSAGE_LENGTH: usize = MAX_TIMESTAMP_FIELD as usize;

/// Bytes ready to be written to the peer.
#[derive(Debug, Clone, PartialEq)]
pub struct Packet {
    pub bytes: Bytes,

    /// True when the packet only carries media and can be skipped if the connection is backed
    /// up, without corrupting the header compression state of the peer.
    pub can_be_dropped: bool,
}

/// Splits outbound messages into chunks, compressing headers against the last header sent on
/// each chunk stream.
pub struct ChunkEncoder {
    previous_headers: HashMap<u32, ChunkHeader>,
    max_chunk_size: usize,
}

impl ChunkEncoder {
    pub fn new() -> ChunkEncoder {
        ChunkEncoder {
            previous_headers: HashMap::new(),
            max_chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }

    pub fn max_chunk_size(&self) -> usize {
        self.max_chunk_size
    }

    /// Creates the `SetChunkSize` message announcing the new size and switches to it.  The
    /// announcement itself is still chunked at the old size, so it must be sent before any packet
    /// serialized after this call.
    pub fn set_max_chunk_size(
        &mut self,
        new_size: u32,
        time: RtmpTimestamp,
    ) -> Result<Packet, ChunkEncodingError> {
        let payload = RtmpMessage::SetChunkSize { size: new_size }.into_message_payload(time, 0)?;
        let packet = self.serialize(&payload, false, false)?;

        trace!("Outbound chunk size changing from {} to {}", self.max_chunk_size, new_size);
        self.max_chunk_size = new_size as usize;
        Ok(packet)
    }

    pub fn serialize(
        &mut self,
        message: &MessagePayload,
        force_uncompressed: bool,
        can_be_dropped: bool,
    ) -> Result<Packet, ChunkEncodingError> {
        let mut bytes = BytesMut::new();
        self.serialize_into(message, force_uncompressed, &mut bytes)?;

        Ok(Packet {
            bytes: bytes.freeze(),
            can_be_dropped,
        })
    }

    /// Serializes several messages back to back into a single packet
    pub fn serialize_all(&mut self, messages: &[MessagePayload]) -> Result<Packet, ChunkEncodingError> {
        let mut bytes = BytesMut::new();
        for message in messages {
            self.serialize_into(message, false, &mut bytes)?;
        }

        Ok(Packet {
            bytes: bytes.freeze(),
            can_be_dropped: false,
        })
    }

    /// Appends the chunks for `message` to `bytes`, returning how many bytes were written
    pub fn serialize_into(
        &mut self,
        message: &MessagePayload,
        force_uncompressed: bool,
        bytes: &mut BytesMut,
    ) -> Result<usize, ChunkEncodingError> {
        if message.data.is_empty() {
            return Err(ChunkEncodingError::EmptyMessage);
        }

        if message.data.len() > MAX_MESSAGE_LENGTH {
            return Err(ChunkEncodingError::MessageTooLong {
                size: message.data.len(),
            });
        }

        let chunk_stream_id = get_chunk_stream_id_for_message_type(message.type_id);
        let mut header = ChunkHeader {
            timestamp: message.timestamp,
            message_length: message.data.len() as u32,
            message_type_id: message.type_id,
            message_stream_id: message.message_stream_id,
            ..ChunkHeader::new(chunk_stream_id)
        };

        let previous = self.previous_headers.get(&chunk_stream_id);
        let chunk_type = if force_uncompressed {
            ChunkType::Full
        } else {
            chunk_header::select_chunk_type(&header, previous)
        };

        header.set_timestamp_fields(chunk_type, previous);

        let chunk_count = (message.data.len() + self.max_chunk_size - 1) / self.max_chunk_size;
        let extended = header.has_extended_timestamp();
        bytes.reserve(
            message.data.len()
                + chunk_header::header_length(chunk_type, chunk_stream_id, extended)
                + (chunk_count - 1)
                    * chunk_header::header_length(ChunkType::Continuation, chunk_stream_id, extended),
        );

        let start = bytes.len();
        for (index, chunk) in message.data.chunks(self.max_chunk_size).enumerate() {
            let chunk_type = if index == 0 { chunk_type } else { ChunkType::Continuation };
            chunk_header::encode_header(chunk_type, &header, bytes);
            bytes.extend_from_slice(chunk);
        }

        self.previous_headers.insert(chunk_stream_id, header);
        Ok(bytes.len() - start)
    }
}

impl Default for ChunkEncoder {
    fn default() -> Self {
        ChunkEncoder::new()
    }
}

fn get_chunk_stream_id_for_message_type(type_id: u8) -> u32 {
    match type_id {
        1..=6 => 2,
        AMF0_DATA_TYPE_ID | AMF0_COMMAND_TYPE_ID => 3,
        AUDIO_TYPE_ID => 4,
        VIDEO_TYPE_ID => 6,
        _ => 8,
    }
}
