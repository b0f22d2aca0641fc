use std::collections::HashMap;

use byteorder::{BigEndian, ByteOrder};
use bytes::BytesMut;
use log::{trace, warn};

use super::chunk_header::{self, ChunkHeader, ChunkType, MessageHeaderFields, DEFAULT_CHUNK_SIZE};
use super::ChunkReassemblyError;
use crate::byte_cursor::ByteCursor;
use crate::messages::{MediaType, MessagePayload};
use crate::time::RtmpTimestamp;

const MAX_CHUNK_SIZE: usize = 0x7FFF_FFFF;

/// Where the reassembler is within the current chunk.  Parsing can stop at any stage when the
/// input runs out and picks up from the same spot on the next call.
#[derive(PartialEq, Eq, Debug, Clone, Copy)]
pub enum ParseStage {
    Init,
    BasicHeader,
    Timestamp,
    MessageLength,
    TypeId,
    StreamId,
    ExtendedTimestamp,
    Payload,
}

/// Something the reassembler produced from the input
#[derive(PartialEq, Debug)]
pub enum ChunkEvent<'a> {
    Message(MessagePayload),

    /// A piece of an audio or video message, only raised when media fragment delivery is enabled
    MediaFragment(PartialPayload<'a>),
}

/// A piece of an audio or video message body, borrowed directly from the input buffer
#[derive(PartialEq, Debug)]
pub struct PartialPayload<'a> {
    pub media_type: MediaType,
    pub chunk_stream_id: u32,
    pub message_stream_id: u32,
    pub timestamp: RtmpTimestamp,
    pub data: &'a [u8],
    pub is_first: bool,
    pub is_last: bool,
}

// Audio and video each get a dedicated slot so the common case of one audio and one video chunk
// stream avoids hashing by chunk stream id.  A second concurrent media message of the same kind
// falls back to a slot keyed by its chunk stream.
#[derive(PartialEq, Eq, Hash, Debug, Clone, Copy)]
enum SlotKey {
    Audio,
    Video,
    Stream(u32),
}

struct InFlightMessage {
    chunk_stream_id: u32,
    header: ChunkHeader,
    media_type: Option<MediaType>,
    body: Option<BytesMut>, // None when the body is handed out as media fragments
    received: usize,
}

/// Turns the inbound byte stream into complete messages.
///
/// Each call to `input()` consumes bytes until it either runs out of input or has an event to
/// return.  Callers should keep calling with the unconsumed remainder until no event is produced.
pub struct ChunkReassembler {
    stage: ParseStage,
    max_chunk_size: usize,
    deliver_media_fragments: bool,
    headers: HashMap<u32, ChunkHeader>,
    in_flight: HashMap<SlotKey, InFlightMessage>,
    scratch: [u8; 11],
    scratch_length: usize,
    chunk_type: ChunkType,
    chunk_stream_id: u32,
    fields: MessageHeaderFields,
    current_slot: Option<SlotKey>,
    bytes_in_chunk: usize,
}

impl ChunkReassembler {
    pub fn new() -> ChunkReassembler {
        ChunkReassembler {
            stage: ParseStage::Init,
            max_chunk_size: DEFAULT_CHUNK_SIZE,
            deliver_media_fragments: false,
            headers: HashMap::new(),
            in_flight: HashMap::new(),
            scratch: [0; 11],
            scratch_length: 0,
            chunk_type: ChunkType::Full,
            chunk_stream_id: 0,
            fields: MessageHeaderFields::default(),
            current_slot: None,
            bytes_in_chunk: 0,
        }
    }

    pub fn stage(&self) -> ParseStage {
        self.stage
    }

    pub fn max_chunk_size(&self) -> usize {
        self.max_chunk_size
    }

    /// Applies a chunk size announced by the peer.  Takes effect from the next chunk.
    pub fn set_max_chunk_size(&mut self, new_size: usize) -> Result<(), ChunkReassemblyError> {
        if new_size == 0 || new_size > MAX_CHUNK_SIZE {
            return Err(ChunkReassemblyError::InvalidMaxChunkSize {
                chunk_size: new_size,
            });
        }

        self.max_chunk_size = new_size;
        Ok(())
    }

    /// When enabled, audio and video bodies are handed out chunk by chunk as `MediaFragment`
    /// events instead of being buffered into a single `Message`.
    pub fn set_deliver_media_fragments(&mut self, enabled: bool) {
        self.deliver_media_fragments = enabled;
    }

    /// Discards the partially received message on the chunk stream, if any
    pub fn abort(&mut self, chunk_stream_id: u32) {
        if let Some(slot) = self.find_in_flight(chunk_stream_id) {
            trace!("Aborting partial message on chunk stream {}", chunk_stream_id);
            self.in_flight.remove(&slot);
            if self.current_slot == Some(slot) {
                self.current_slot = None;
            }
        }
    }

    /// Consumes bytes from `bytes` until an event is ready or the input is exhausted.  Returns the
    /// event (if any) and how many bytes were consumed.
    pub fn input<'a>(
        &mut self,
        bytes: &'a [u8],
    ) -> Result<(Option<ChunkEvent<'a>>, usize), ChunkReassemblyError> {
        let mut cursor = ByteCursor::new(bytes);
        loop {
            match self.stage {
                ParseStage::Init => {
                    let first_byte = match cursor.read_u8() {
                        Ok(byte) => byte,
                        Err(_) => break,
                    };

                    self.scratch[0] = first_byte;
                    self.scratch_length = 1;
                    self.stage = ParseStage::BasicHeader;
                }

                ParseStage::BasicHeader => {
                    let length = chunk_header::basic_header_length(self.scratch[0]);
                    if !self.fill_scratch(&mut cursor, length) {
                        break;
                    }

                    self.start_chunk()?;
                }

                ParseStage::Timestamp
                | ParseStage::MessageLength
                | ParseStage::TypeId
                | ParseStage::StreamId => {
                    let field_end = match self.stage {
                        ParseStage::Timestamp => 3,
                        ParseStage::MessageLength => 6,
                        ParseStage::TypeId => 7,
                        _ => 11,
                    };

                    if !self.fill_scratch(&mut cursor, field_end) {
                        break;
                    }

                    if field_end >= self.chunk_type.message_header_length() {
                        self.finish_message_header()?;
                    } else {
                        self.stage = match self.stage {
                            ParseStage::Timestamp => ParseStage::MessageLength,
                            ParseStage::MessageLength => ParseStage::TypeId,
                            _ => ParseStage::StreamId,
                        };
                    }
                }

                ParseStage::ExtendedTimestamp => {
                    if !self.fill_scratch(&mut cursor, 4) {
                        break;
                    }

                    let extended_timestamp = BigEndian::read_u32(&self.scratch[..4]);
                    self.resolve_header(Some(extended_timestamp))?;
                }

                ParseStage::Payload => match self.read_payload(&mut cursor) {
                    Some(event) => return Ok((Some(event), cursor.position())),
                    None if self.stage == ParseStage::Payload => break,
                    None => (),
                },
            }
        }

        Ok((None, cursor.position()))
    }

    fn fill_scratch(&mut self, cursor: &mut ByteCursor, target_length: usize) -> bool {
        while self.scratch_length < target_length {
            if cursor.is_empty() {
                return false;
            }

            let bytes = cursor.read_up_to(target_length - self.scratch_length);
            let end = self.scratch_length + bytes.len();
            self.scratch[self.scratch_length..end].copy_from_slice(bytes);
            self.scratch_length = end;
        }

        true
    }

    fn start_chunk(&mut self) -> Result<(), ChunkReassemblyError> {
        let (basic_header, _) = chunk_header::decode_basic_header(&self.scratch[..self.scratch_length])
            .ok_or(ChunkReassemblyError::MalformedHeader {
                chunk_stream_id: 0,
                reason: "incomplete basic header",
            })?;

        self.chunk_type = basic_header.chunk_type;
        self.chunk_stream_id = basic_header.chunk_stream_id;
        self.fields = MessageHeaderFields::default();
        self.scratch_length = 0;

        if self.chunk_type != ChunkType::Full && !self.headers.contains_key(&self.chunk_stream_id) {
            return Err(ChunkReassemblyError::MalformedHeader {
                chunk_stream_id: self.chunk_stream_id,
                reason: "compressed header received before any full header on this chunk stream",
            });
        }

        if self.chunk_type == ChunkType::Continuation {
            self.finish_message_header()
        } else {
            self.stage = ParseStage::Timestamp;
            Ok(())
        }
    }

    fn finish_message_header(&mut self) -> Result<(), ChunkReassemblyError> {
        let (fields, _) =
            chunk_header::decode_message_header(self.chunk_type, &self.scratch[..self.scratch_length])
                .ok_or(ChunkReassemblyError::MalformedHeader {
                    chunk_stream_id: self.chunk_stream_id,
                    reason: "incomplete message header",
                })?;

        self.fields = fields;
        let has_extended_timestamp = match self.chunk_type {
            ChunkType::Continuation => self
                .headers
                .get(&self.chunk_stream_id)
                .map_or(false, |header| header.has_extended_timestamp()),

            _ => fields.has_extended_timestamp(),
        };

        if has_extended_timestamp {
            self.scratch_length = 0;
            self.stage = ParseStage::ExtendedTimestamp;
            Ok(())
        } else {
            self.resolve_header(None)
        }
    }

    fn resolve_header(&mut self, extended_timestamp: Option<u32>) -> Result<(), ChunkReassemblyError> {
        let chunk_stream_id = self.chunk_stream_id;
        self.scratch_length = 0;
        self.bytes_in_chunk = 0;

        // A type 3 chunk only continues a message when one is in flight, and the value of a
        // repeated extended timestamp is ignored in that case.
        if self.chunk_type == ChunkType::Continuation {
            if let Some(slot) = self.find_in_flight(chunk_stream_id) {
                self.current_slot = Some(slot);
                self.stage = ParseStage::Payload;
                return Ok(());
            }
        }

        let header = self.next_header(extended_timestamp)?;
        if header.message_length == 0 {
            return Err(ChunkReassemblyError::ZeroLengthMessage { chunk_stream_id });
        }

        if let Some(slot) = self.find_in_flight(chunk_stream_id) {
            warn!(
                "New message header on chunk stream {} while a message was still in flight, discarding the partial message",
                chunk_stream_id
            );

            self.in_flight.remove(&slot);
        }

        let media_type = MediaType::from_type_id(header.message_type_id);
        let slot = self.choose_slot(chunk_stream_id, media_type);
        let body = match (media_type, self.deliver_media_fragments) {
            (Some(_), true) => None,
            _ => Some(BytesMut::with_capacity(header.message_length as usize)),
        };

        self.in_flight.insert(
            slot,
            InFlightMessage {
                chunk_stream_id,
                header: header.clone(),
                media_type,
                body,
                received: 0,
            },
        );

        self.headers.insert(chunk_stream_id, header);
        self.current_slot = Some(slot);
        self.stage = ParseStage::Payload;
        Ok(())
    }

    fn next_header(&self, extended_timestamp: Option<u32>) -> Result<ChunkHeader, ChunkReassemblyError> {
        let chunk_stream_id = self.chunk_stream_id;
        let fields = self.fields;
        let previous = self.headers.get(&chunk_stream_id);

        match (self.chunk_type, previous) {
            (ChunkType::Full, _) => {
                let timestamp_field = fields.timestamp_field.unwrap_or(0);
                Ok(ChunkHeader {
                    chunk_stream_id,
                    timestamp: RtmpTimestamp::new(extended_timestamp.unwrap_or(timestamp_field)),
                    timestamp_delta: 0,
                    timestamp_field,
                    extended_timestamp: extended_timestamp.unwrap_or(0),
                    message_length: fields.message_length.unwrap_or(0),
                    message_type_id: fields.type_id.unwrap_or(0),
                    message_stream_id: fields.message_stream_id.unwrap_or(0),
                })
            }

            (_, None) => Err(ChunkReassemblyError::MalformedHeader {
                chunk_stream_id,
                reason: "compressed header received before any full header on this chunk stream",
            }),

            (ChunkType::Continuation, Some(previous)) => {
                let mut header = previous.clone();
                header.timestamp = previous.timestamp + previous.timestamp_delta;
                Ok(header)
            }

            (_, Some(previous)) => {
                let timestamp_field = fields.timestamp_field.unwrap_or(0);
                let delta = extended_timestamp.unwrap_or(timestamp_field);

                let mut header = previous.clone();
                header.timestamp = previous.timestamp + delta;
                header.timestamp_delta = delta;
                header.timestamp_field = timestamp_field;
                header.extended_timestamp = extended_timestamp.unwrap_or(0);

                if let Some(length) = fields.message_length {
                    header.message_length = length;
                }

                if let Some(type_id) = fields.type_id {
                    header.message_type_id = type_id;
                }

                Ok(header)
            }
        }
    }

    fn find_in_flight(&self, chunk_stream_id: u32) -> Option<SlotKey> {
        [SlotKey::Stream(chunk_stream_id), SlotKey::Audio, SlotKey::Video]
            .iter()
            .copied()
            .find(|key| {
                self.in_flight
                    .get(key)
                    .map_or(false, |message| message.chunk_stream_id == chunk_stream_id)
            })
    }

    fn choose_slot(&self, chunk_stream_id: u32, media_type: Option<MediaType>) -> SlotKey {
        let preferred = match media_type {
            Some(MediaType::Audio) => SlotKey::Audio,
            Some(MediaType::Video) => SlotKey::Video,
            None => return SlotKey::Stream(chunk_stream_id),
        };

        if self.in_flight.contains_key(&preferred) {
            SlotKey::Stream(chunk_stream_id)
        } else {
            preferred
        }
    }

    fn read_payload<'a>(&mut self, cursor: &mut ByteCursor<'a>) -> Option<ChunkEvent<'a>> {
        let slot = match self.current_slot {
            Some(slot) => slot,
            None => {
                // The message was aborted mid chunk, so the rest of this chunk has no owner
                self.stage = ParseStage::Init;
                return None;
            }
        };

        let message = match self.in_flight.get_mut(&slot) {
            Some(message) => message,
            None => {
                self.current_slot = None;
                self.stage = ParseStage::Init;
                return None;
            }
        };

        let remaining_in_chunk = self.max_chunk_size.saturating_sub(self.bytes_in_chunk);
        if remaining_in_chunk == 0 {
            self.stage = ParseStage::Init;
            return None;
        }

        let remaining_in_message = message.header.message_length as usize - message.received;
        let data = cursor.read_up_to(remaining_in_message.min(remaining_in_chunk));
        if data.is_empty() {
            return None;
        }

        let is_first = message.received == 0;
        message.received += data.len();
        self.bytes_in_chunk += data.len();

        let is_complete = message.received == message.header.message_length as usize;
        if is_complete || self.bytes_in_chunk >= self.max_chunk_size {
            self.stage = ParseStage::Init;
        }

        match message.body {
            Some(ref mut body) => {
                body.extend_from_slice(data);
                if !is_complete {
                    return None;
                }
            }

            None => {
                let media_type = message.media_type?;
                let fragment = PartialPayload {
                    media_type,
                    chunk_stream_id: message.chunk_stream_id,
                    message_stream_id: message.header.message_stream_id,
                    timestamp: message.header.timestamp,
                    data,
                    is_first,
                    is_last: is_complete,
                };

                if is_complete {
                    self.in_flight.remove(&slot);
                    self.current_slot = None;
                }

                return Some(ChunkEvent::MediaFragment(fragment));
            }
        }

        let message = self.in_flight.remove(&slot)?;
        self.current_slot = None;

        Some(ChunkEvent::Message(MessagePayload {
            timestamp: message.header.timestamp,
            type_id: message.header.message_type_id,
            message_stream_id: message.header.message_stream_id,
            data: message.body.map(|body| body.freeze()).unwrap_or_default(),
        }))
    }
}

impl Default for ChunkReassembler {
    fn default() -> Self {
        ChunkReassembler::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use byteorder::{LittleEndian, WriteBytesExt};

    fn write_basic_header(bytes: &mut Vec<u8>, format: u8, csid: u32) {
        if csid < 64 {
            bytes.push((format << 6) | csid as u8);
        } else if csid < 320 {
            bytes.push(format << 6);
            bytes.push((csid - 64) as u8);
        } else {
            bytes.push((format << 6) | 1);
            bytes.write_u16::<LittleEndian>((csid - 64) as u16).unwrap();
        }
    }

    fn write_timestamp_field(bytes: &mut Vec<u8>, value: u32) {
        let field = value.min(0xFF_FFFF);
        bytes.write_u24::<BigEndian>(field).unwrap();
    }

    fn write_extended_timestamp(bytes: &mut Vec<u8>, value: u32) {
        if value >= 0xFF_FFFF {
            bytes.write_u32::<BigEndian>(value).unwrap();
        }
    }

    fn append_continuations(bytes: &mut Vec<u8>, csid: u32, payload: &[u8], max_chunk_size: usize, extended: Option<u32>) {
        let mut chunks = payload.chunks(max_chunk_size);
        if let Some(first) = chunks.next() {
            bytes.extend_from_slice(first);
        }

        for chunk in chunks {
            write_basic_header(bytes, 3, csid);
            if let Some(value) = extended {
                bytes.write_u32::<BigEndian>(value).unwrap();
            }

            bytes.extend_from_slice(chunk);
        }
    }

    fn form_type_0_chunk(csid: u32, timestamp: u32, message_stream_id: u32, type_id: u8, payload: &[u8], max_chunk_size: usize) -> Vec<u8> {
        let mut bytes = Vec::new();
        write_basic_header(&mut bytes, 0, csid);
        write_timestamp_field(&mut bytes, timestamp);
        bytes.write_u24::<BigEndian>(payload.len() as u32).unwrap();
        bytes.push(type_id);
        bytes.write_u32::<LittleEndian>(message_stream_id).unwrap();
        write_extended_timestamp(&mut bytes, timestamp);

        let extended = if timestamp >= 0xFF_FFFF { Some(timestamp) } else { None };
        append_continuations(&mut bytes, csid, payload, max_chunk_size, extended);
        bytes
    }

    fn form_type_1_chunk(csid: u32, delta: u32, type_id: u8, payload: &[u8], max_chunk_size: usize) -> Vec<u8> {
        let mut bytes = Vec::new();
        write_basic_header(&mut bytes, 1, csid);
        write_timestamp_field(&mut bytes, delta);
        bytes.write_u24::<BigEndian>(payload.len() as u32).unwrap();
        bytes.push(type_id);
        write_extended_timestamp(&mut bytes, delta);
        append_continuations(&mut bytes, csid, payload, max_chunk_size, None);
        bytes
    }

    fn form_type_2_chunk(csid: u32, delta: u32, payload: &[u8], max_chunk_size: usize) -> Vec<u8> {
        let mut bytes = Vec::new();
        write_basic_header(&mut bytes, 2, csid);
        write_timestamp_field(&mut bytes, delta);
        append_continuations(&mut bytes, csid, payload, max_chunk_size, None);
        bytes
    }

    fn form_type_3_chunk(csid: u32, payload: &[u8]) -> Vec<u8> {
        let mut bytes = Vec::new();
        write_basic_header(&mut bytes, 3, csid);
        bytes.extend_from_slice(payload);
        bytes
    }

    /// Feeds everything through the reassembler, collecting every complete message
    fn read_all(reassembler: &mut ChunkReassembler, mut bytes: &[u8]) -> Vec<MessagePayload> {
        let mut messages = Vec::new();
        loop {
            let (event, consumed) = reassembler.input(bytes).unwrap();
            bytes = &bytes[consumed..];
            match event {
                Some(ChunkEvent::Message(message)) => messages.push(message),
                Some(ChunkEvent::MediaFragment(_)) => panic!("Unexpected media fragment"),
                None => break,
            }
        }

        assert!(bytes.is_empty(), "{} bytes left unconsumed", bytes.len());
        messages
    }

    fn read_one_byte_at_a_time(reassembler: &mut ChunkReassembler, bytes: &[u8]) -> Vec<MessagePayload> {
        let mut messages = Vec::new();
        for index in 0..bytes.len() {
            let (event, consumed) = reassembler.input(&bytes[index..index + 1]).unwrap();
            assert_eq!(consumed, 1, "byte {} was not consumed", index);
            if let Some(ChunkEvent::Message(message)) = event {
                messages.push(message);
            }
        }

        messages
    }

    #[test]
    fn can_read_type_0_chunk_with_small_chunk_stream_id_and_small_timestamp() {
        let payload = [1, 2, 3, 4];
        let bytes = form_type_0_chunk(3, 72, 5, 20, &payload, 128);

        let mut reassembler = ChunkReassembler::new();
        let messages = read_all(&mut reassembler, &bytes);

        assert_eq!(messages.len(), 1, "Unexpected number of messages");
        assert_eq!(messages[0].timestamp, RtmpTimestamp::new(72));
        assert_eq!(messages[0].type_id, 20);
        assert_eq!(messages[0].message_stream_id, 5);
        assert_eq!(&messages[0].data[..], &payload[..]);
        assert_eq!(reassembler.stage(), ParseStage::Init);
    }

    #[test]
    fn can_read_chunk_with_two_byte_chunk_stream_id() {
        let bytes = form_type_0_chunk(300, 1, 1, 9, &[5; 10], 128);

        let mut reassembler = ChunkReassembler::new();
        let messages = read_all(&mut reassembler, &bytes);

        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].data.len(), 10);
    }

    #[test]
    fn can_read_chunk_with_three_byte_chunk_stream_id() {
        let bytes = form_type_0_chunk(50000, 1, 1, 9, &[5; 10], 128);
        assert_eq!(&bytes[..3], &[0x01, 0x10, 0xC3], "Chunk stream id not written little endian");

        let mut reassembler = ChunkReassembler::new();
        let messages = read_all(&mut reassembler, &bytes);

        assert_eq!(messages.len(), 1);
    }

    #[test]
    fn message_split_across_chunks_is_reassembled() {
        let payload: Vec<u8> = (0..300).map(|x| x as u8).collect();
        let bytes = form_type_0_chunk(4, 0, 1, 8, &payload, 128);

        let mut reassembler = ChunkReassembler::new();
        let messages = read_all(&mut reassembler, &bytes);

        assert_eq!(messages.len(), 1);
        assert_eq!(&messages[0].data[..], &payload[..]);
    }

    #[test]
    fn input_fed_one_byte_at_a_time_produces_same_messages() {
        let payload: Vec<u8> = (0..300).map(|x| x as u8).collect();
        let mut bytes = form_type_0_chunk(70, 0xFF_FFFF + 5, 1, 9, &payload, 128);
        bytes.extend(form_type_1_chunk(70, 40, 8, &[9; 20], 128));

        let mut reassembler = ChunkReassembler::new();
        let messages = read_one_byte_at_a_time(&mut reassembler, &bytes);

        assert_eq!(messages.len(), 2);
        assert_eq!(&messages[0].data[..], &payload[..]);
        assert_eq!(messages[0].timestamp, RtmpTimestamp::new(0xFF_FFFF + 5));
        assert_eq!(messages[1].timestamp, RtmpTimestamp::new(0xFF_FFFF + 45));
        assert_eq!(messages[1].type_id, 8);
    }

    #[test]
    fn input_stops_mid_header_and_resumes() {
        let bytes = form_type_0_chunk(100, 5, 1, 20, &[1, 2, 3], 128);

        let mut reassembler = ChunkReassembler::new();
        let (event, consumed) = reassembler.input(&bytes[..1]).unwrap();
        assert_eq!(event, None);
        assert_eq!(consumed, 1);
        assert_eq!(reassembler.stage(), ParseStage::BasicHeader);

        let (event, consumed) = reassembler.input(&bytes[1..6]).unwrap();
        assert_eq!(event, None);
        assert_eq!(consumed, 5);
        assert_eq!(reassembler.stage(), ParseStage::MessageLength);

        let messages = read_all(&mut reassembler, &bytes[6..]);
        assert_eq!(messages.len(), 1);
    }

    #[test]
    fn type_3_chunk_starting_new_message_inherits_all_header_fields() {
        let mut bytes = form_type_0_chunk(6, 1000, 1, 9, &[1; 50], 128);
        bytes.extend(form_type_3_chunk(6, &[2; 50]));

        let mut reassembler = ChunkReassembler::new();
        let messages = read_all(&mut reassembler, &bytes);

        assert_eq!(messages.len(), 2);
        assert_eq!(messages[1].timestamp, RtmpTimestamp::new(1000));
        assert_eq!(messages[1].type_id, 9);
        assert_eq!(messages[1].message_stream_id, 1);
        assert_eq!(&messages[1].data[..], &[2; 50][..]);
    }

    #[test]
    fn type_3_chunk_after_type_1_reapplies_the_delta() {
        let mut bytes = form_type_0_chunk(6, 1000, 1, 9, &[1; 10], 128);
        bytes.extend(form_type_1_chunk(6, 33, 9, &[2; 12], 128));
        bytes.extend(form_type_3_chunk(6, &[3; 12]));

        let mut reassembler = ChunkReassembler::new();
        let messages = read_all(&mut reassembler, &bytes);

        assert_eq!(messages.len(), 3);
        assert_eq!(messages[1].timestamp, RtmpTimestamp::new(1033));
        assert_eq!(messages[2].timestamp, RtmpTimestamp::new(1066));
        assert_eq!(messages[2].data.len(), 12);
    }

    #[test]
    fn type_2_chunk_keeps_length_and_type() {
        let mut bytes = form_type_0_chunk(6, 10, 1, 9, &[1; 4], 128);
        bytes.extend(form_type_2_chunk(6, 20, &[2; 4], 128));

        let mut reassembler = ChunkReassembler::new();
        let messages = read_all(&mut reassembler, &bytes);

        assert_eq!(messages.len(), 2);
        assert_eq!(messages[1].timestamp, RtmpTimestamp::new(30));
        assert_eq!(messages[1].type_id, 9);
        assert_eq!(messages[1].message_stream_id, 1);
    }

    #[test]
    fn timestamps_wrap_around() {
        let mut bytes = form_type_0_chunk(6, 0xFFFF_FFF0, 1, 9, &[1; 4], 128);
        bytes.extend(form_type_2_chunk(6, 0x20, &[2; 4], 128));

        let mut reassembler = ChunkReassembler::new();
        let messages = read_all(&mut reassembler, &bytes);

        assert_eq!(messages[1].timestamp, RtmpTimestamp::new(0x10));
        assert_eq!(messages[1].timestamp.delta_since(messages[0].timestamp), 0x20);
    }

    #[test]
    fn continuation_chunks_skip_repeated_extended_timestamp() {
        let payload: Vec<u8> = (0..200).map(|x| x as u8).collect();
        let bytes = form_type_0_chunk(4, 0x0100_0000, 1, 8, &payload, 128);

        let mut reassembler = ChunkReassembler::new();
        let messages = read_all(&mut reassembler, &bytes);

        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].timestamp, RtmpTimestamp::new(0x0100_0000));
        assert_eq!(&messages[0].data[..], &payload[..]);
    }

    #[test]
    fn interleaved_chunk_streams_are_reassembled_independently() {
        let audio: Vec<u8> = vec![1; 200];
        let video: Vec<u8> = vec![2; 200];

        let audio_chunks = form_type_0_chunk(4, 10, 1, 8, &audio, 128);
        let video_chunks = form_type_0_chunk(6, 20, 1, 9, &video, 128);

        // first chunk of each is 12 header bytes + 128 payload bytes
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&audio_chunks[..140]);
        bytes.extend_from_slice(&video_chunks[..140]);
        bytes.extend_from_slice(&audio_chunks[140..]);
        bytes.extend_from_slice(&video_chunks[140..]);

        let mut reassembler = ChunkReassembler::new();
        let messages = read_all(&mut reassembler, &bytes);

        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].type_id, 8);
        assert_eq!(&messages[0].data[..], &audio[..]);
        assert_eq!(messages[1].type_id, 9);
        assert_eq!(&messages[1].data[..], &video[..]);
    }

    #[test]
    fn two_video_streams_in_flight_do_not_collide() {
        let first = form_type_0_chunk(6, 0, 1, 9, &[1; 200], 128);
        let second = form_type_0_chunk(7, 0, 2, 9, &[2; 200], 128);

        let mut bytes = Vec::new();
        bytes.extend_from_slice(&first[..140]);
        bytes.extend_from_slice(&second[..140]);
        bytes.extend_from_slice(&second[140..]);
        bytes.extend_from_slice(&first[140..]);

        let mut reassembler = ChunkReassembler::new();
        let messages = read_all(&mut reassembler, &bytes);

        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].message_stream_id, 2);
        assert_eq!(&messages[0].data[..], &[2; 200][..]);
        assert_eq!(messages[1].message_stream_id, 1);
        assert_eq!(&messages[1].data[..], &[1; 200][..]);
    }

    #[test]
    fn larger_chunk_size_is_applied() {
        let payload = vec![7; 1000];
        let bytes = form_type_0_chunk(5, 0, 1, 9, &payload, 4096);

        let mut reassembler = ChunkReassembler::new();
        reassembler.set_max_chunk_size(4096).unwrap();
        let messages = read_all(&mut reassembler, &bytes);

        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].data.len(), 1000);
    }

    #[test]
    fn invalid_chunk_sizes_are_rejected() {
        let mut reassembler = ChunkReassembler::new();

        match reassembler.set_max_chunk_size(0) {
            Err(ChunkReassemblyError::InvalidMaxChunkSize { chunk_size: 0 }) => (),
            x => panic!("Unexpected result: {:?}", x),
        }

        assert!(reassembler.set_max_chunk_size(0x8000_0000).is_err());
        assert_eq!(reassembler.max_chunk_size(), DEFAULT_CHUNK_SIZE);
    }

    #[test]
    fn zero_length_message_is_a_protocol_error() {
        let bytes = form_type_0_chunk(3, 0, 0, 20, &[], 128);

        let mut reassembler = ChunkReassembler::new();
        match reassembler.input(&bytes) {
            Err(ChunkReassemblyError::ZeroLengthMessage { chunk_stream_id: 3 }) => (),
            x => panic!("Unexpected result: {:?}", x),
        }
    }

    #[test]
    fn compressed_header_without_previous_header_is_malformed() {
        let bytes = form_type_1_chunk(9, 10, 9, &[1; 5], 128);

        let mut reassembler = ChunkReassembler::new();
        match reassembler.input(&bytes) {
            Err(ChunkReassemblyError::MalformedHeader { chunk_stream_id: 9, .. }) => (),
            x => panic!("Unexpected result: {:?}", x),
        }
    }

    #[test]
    fn new_header_mid_message_discards_partial_message() {
        let first = form_type_0_chunk(6, 0, 1, 9, &[1; 200], 128);
        let mut bytes = first[..140].to_vec();
        bytes.extend(form_type_0_chunk(6, 50, 1, 9, &[2; 20], 128));

        let mut reassembler = ChunkReassembler::new();
        let messages = read_all(&mut reassembler, &bytes);

        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].timestamp, RtmpTimestamp::new(50));
        assert_eq!(&messages[0].data[..], &[2; 20][..]);
    }

    #[test]
    fn aborted_message_is_discarded() {
        let first = form_type_0_chunk(6, 0, 1, 9, &[1; 200], 128);

        let mut reassembler = ChunkReassembler::new();
        let messages = read_all(&mut reassembler, &first[..140]);
        assert!(messages.is_empty());

        reassembler.abort(6);

        // A type 3 chunk now starts a fresh message using the cached header
        let bytes = form_type_3_chunk(6, &[3; 128]);
        let messages = read_all(&mut reassembler, &bytes);
        assert!(messages.is_empty(), "Message completed from aborted data");

        let bytes = form_type_3_chunk(6, &[3; 72]);
        let messages = read_all(&mut reassembler, &bytes);
        assert_eq!(messages.len(), 1);
        assert_eq!(&messages[0].data[..], &[3; 200][..]);
    }

    #[test]
    fn media_fragments_are_delivered_per_chunk_when_enabled() {
        let payload: Vec<u8> = (0..300).map(|x| x as u8).collect();
        let bytes = form_type_0_chunk(6, 40, 1, 9, &payload, 128);

        let mut reassembler = ChunkReassembler::new();
        reassembler.set_deliver_media_fragments(true);

        let mut remaining = &bytes[..];
        let mut fragments = Vec::new();
        loop {
            let (event, consumed) = reassembler.input(remaining).unwrap();
            match event {
                Some(ChunkEvent::MediaFragment(fragment)) => {
                    assert_eq!(fragment.media_type, MediaType::Video);
                    assert_eq!(fragment.timestamp, RtmpTimestamp::new(40));
                    fragments.push((fragment.data.to_vec(), fragment.is_first, fragment.is_last));
                }

                Some(ChunkEvent::Message(_)) => panic!("Media should not be buffered"),
                None => break,
            }

            remaining = &remaining[consumed..];
        }

        assert_eq!(fragments.len(), 3);
        assert_eq!(fragments[0].0.len(), 128);
        assert!(fragments[0].1 && !fragments[0].2);
        assert!(!fragments[1].1 && !fragments[1].2);
        assert_eq!(fragments[2].0.len(), 44);
        assert!(!fragments[2].1 && fragments[2].2);

        let joined: Vec<u8> = fragments.into_iter().flat_map(|(data, _, _)| data).collect();
        assert_eq!(joined, payload);
    }

    #[test]
    fn non_media_messages_are_buffered_even_when_fragments_enabled() {
        let bytes = form_type_0_chunk(3, 0, 0, 20, &[1; 200], 128);

        let mut reassembler = ChunkReassembler::new();
        reassembler.set_deliver_media_fragments(true);
        let messages = read_all(&mut reassembler, &bytes);

        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].data.len(), 200);
    }
}
