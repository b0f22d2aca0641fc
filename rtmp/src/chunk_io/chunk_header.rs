//! Encoding and decoding of the basic and message headers that prefix every chunk.
//!
//! These functions are pure.  The per chunk stream cache that gives compressed headers their
//! meaning lives in the reassembler and encoder, which store one `ChunkHeader` per chunk stream.

use bytes::{BufMut, BytesMut};

use crate::byte_cursor::{write_u24, ByteCursor};
use crate::time::RtmpTimestamp;

/// The largest value the 3 byte timestamp field can hold.  A field containing this value signals
/// that the real timestamp follows the message header as a 4 byte extended timestamp.
pub const MAX_TIMESTAMP_FIELD: u32 = 0xFF_FFFF;

pub const MIN_CHUNK_STREAM_ID: u32 = 2;
pub const MAX_CHUNK_STREAM_ID: u32 = 65599;

/// Chunk size both peers start with until a `SetChunkSize` message says otherwise
pub const DEFAULT_CHUNK_SIZE: usize = 128;

const EXTENDED_TIMESTAMP_LENGTH: usize = 4;

#[derive(PartialEq, Eq, Debug, Clone, Copy)]
pub enum ChunkType {
    /// Type 0: timestamp, length, type id and message stream id are all present
    Full,

    /// Type 1: timestamp delta, length and type id
    TimeDeltaWithoutMessageStreamId,

    /// Type 2: timestamp delta only
    TimeDeltaOnly,

    /// Type 3: no message header at all
    Continuation,
}

impl ChunkType {
    pub fn from_basic_header_byte(byte: u8) -> ChunkType {
        match byte >> 6 {
            0 => ChunkType::Full,
            1 => ChunkType::TimeDeltaWithoutMessageStreamId,
            2 => ChunkType::TimeDeltaOnly,
            _ => ChunkType::Continuation,
        }
    }

    fn format_bits(self) -> u8 {
        match self {
            ChunkType::Full => 0,
            ChunkType::TimeDeltaWithoutMessageStreamId => 1,
            ChunkType::TimeDeltaOnly => 2,
            ChunkType::Continuation => 3,
        }
    }

    /// Size of the message header following the basic header, excluding any extended timestamp
    pub fn message_header_length(self) -> usize {
        match self {
            ChunkType::Full => 11,
            ChunkType::TimeDeltaWithoutMessageStreamId => 7,
            ChunkType::TimeDeltaOnly => 3,
            ChunkType::Continuation => 0,
        }
    }
}

#[derive(PartialEq, Eq, Debug, Clone, Copy)]
pub struct BasicHeader {
    pub chunk_type: ChunkType,
    pub chunk_stream_id: u32,
}

/// The raw values carried by a message header.  Fields the chunk type does not carry are `None`.
#[derive(PartialEq, Eq, Debug, Clone, Copy, Default)]
pub struct MessageHeaderFields {
    pub timestamp_field: Option<u32>,
    pub message_length: Option<u32>,
    pub type_id: Option<u8>,
    pub message_stream_id: Option<u32>,
}

impl MessageHeaderFields {
    pub fn has_extended_timestamp(&self) -> bool {
        self.timestamp_field == Some(MAX_TIMESTAMP_FIELD)
    }
}

/// The resolved header of the most recent message on a chunk stream.
#[derive(PartialEq, Eq, Debug, Clone)]
pub struct ChunkHeader {
    pub chunk_stream_id: u32,

    /// Absolute timestamp of the message
    pub timestamp: RtmpTimestamp,

    /// Delta that a type 3 chunk starting a new message adds to `timestamp`.  Zero after a
    /// type 0 header.
    pub timestamp_delta: u32,

    /// What was written in the 3 byte timestamp field of the last header with one
    pub timestamp_field: u32,

    /// Value of the 4 byte extended timestamp, only meaningful when `timestamp_field` is
    /// `MAX_TIMESTAMP_FIELD`
    pub extended_timestamp: u32,

    pub message_length: u32,
    pub message_type_id: u8,
    pub message_stream_id: u32,
}

impl ChunkHeader {
    pub fn new(chunk_stream_id: u32) -> ChunkHeader {
        ChunkHeader {
            chunk_stream_id,
            timestamp: RtmpTimestamp::new(0),
            timestamp_delta: 0,
            timestamp_field: 0,
            extended_timestamp: 0,
            message_length: 0,
            message_type_id: 0,
            message_stream_id: 0,
        }
    }

    pub fn has_extended_timestamp(&self) -> bool {
        self.timestamp_field == MAX_TIMESTAMP_FIELD
    }

    /// Fills in the delta and the on-the-wire timestamp values for sending this header with the
    /// given chunk type, relative to the previous header on the same chunk stream.
    pub fn set_timestamp_fields(&mut self, chunk_type: ChunkType, previous: Option<&ChunkHeader>) {
        let raw_value = match (chunk_type, previous) {
            (ChunkType::Full, _) | (_, None) => {
                self.timestamp_delta = 0;
                self.timestamp.value
            }

            (ChunkType::Continuation, Some(previous)) => {
                self.timestamp_delta = previous.timestamp_delta;
                self.timestamp_field = previous.timestamp_field;
                self.extended_timestamp = previous.extended_timestamp;
                return;
            }

            (_, Some(previous)) => {
                self.timestamp_delta = self.timestamp.delta_since(previous.timestamp);
                self.timestamp_delta
            }
        };

        self.timestamp_field = raw_value.min(MAX_TIMESTAMP_FIELD);
        self.extended_timestamp = raw_value;
    }
}

/// Number of bytes in the basic header that starts with `first_byte`
pub fn basic_header_length(first_byte: u8) -> usize {
    match first_byte & 0x3F {
        0 => 2,
        1 => 3,
        _ => 1,
    }
}

/// Decodes a basic header, returning it along with the number of bytes it occupied.  Returns
/// `None` if `bytes` does not contain the complete basic header yet.
pub fn decode_basic_header(bytes: &[u8]) -> Option<(BasicHeader, usize)> {
    let first_byte = *bytes.first()?;
    let length = basic_header_length(first_byte);
    if bytes.len() < length {
        return None;
    }

    let chunk_stream_id = match length {
        1 => (first_byte & 0x3F) as u32,
        2 => 64 + bytes[1] as u32,
        _ => 64 + bytes[1] as u32 + (bytes[2] as u32) * 256,
    };

    let header = BasicHeader {
        chunk_type: ChunkType::from_basic_header_byte(first_byte),
        chunk_stream_id,
    };

    Some((header, length))
}

/// Decodes the message header for the given chunk type.  Returns `None` if `bytes` is shorter
/// than the header.
pub fn decode_message_header(
    chunk_type: ChunkType,
    bytes: &[u8],
) -> Option<(MessageHeaderFields, usize)> {
    let length = chunk_type.message_header_length();
    if bytes.len() < length {
        return None;
    }

    let mut cursor = ByteCursor::new(&bytes[..length]);
    let mut fields = MessageHeaderFields::default();
    if length >= 3 {
        fields.timestamp_field = Some(cursor.read_u24().ok()?);
    }

    if length >= 7 {
        fields.message_length = Some(cursor.read_u24().ok()?);
        fields.type_id = Some(cursor.read_u8().ok()?);
    }

    if length >= 11 {
        fields.message_stream_id = Some(cursor.read_u32_le().ok()?);
    }

    Some((fields, length))
}

/// Writes the smallest basic header form able to represent `chunk_stream_id`
pub fn encode_basic_header(chunk_type: ChunkType, chunk_stream_id: u32, bytes: &mut BytesMut) {
    debug_assert!(
        chunk_stream_id >= MIN_CHUNK_STREAM_ID && chunk_stream_id <= MAX_CHUNK_STREAM_ID,
        "chunk stream id {} out of range",
        chunk_stream_id
    );

    let format = chunk_type.format_bits() << 6;
    if chunk_stream_id < 64 {
        bytes.put_u8(format | chunk_stream_id as u8);
    } else if chunk_stream_id < 320 {
        bytes.put_u8(format);
        bytes.put_u8((chunk_stream_id - 64) as u8);
    } else {
        let value = chunk_stream_id - 64;
        bytes.put_u8(format | 1);
        bytes.put_u8((value & 0xFF) as u8);
        bytes.put_u8((value >> 8) as u8);
    }
}

/// Writes the basic header, message header and (when needed) extended timestamp for `header`.
/// Returns the number of bytes written.
pub fn encode_header(chunk_type: ChunkType, header: &ChunkHeader, bytes: &mut BytesMut) -> usize {
    let start = bytes.len();
    encode_basic_header(chunk_type, header.chunk_stream_id, bytes);

    if chunk_type != ChunkType::Continuation {
        write_u24(bytes, header.timestamp_field);
    }

    if chunk_type == ChunkType::Full || chunk_type == ChunkType::TimeDeltaWithoutMessageStreamId {
        write_u24(bytes, header.message_length);
        bytes.put_u8(header.message_type_id);
    }

    if chunk_type == ChunkType::Full {
        bytes.put_u32_le(header.message_stream_id);
    }

    if header.has_extended_timestamp() {
        bytes.put_u32(header.extended_timestamp);
    }

    bytes.len() - start
}

/// Picks the most compressed chunk type that still lets the peer reconstruct `header` from the
/// previous header sent on the same chunk stream.
pub fn select_chunk_type(header: &ChunkHeader, previous: Option<&ChunkHeader>) -> ChunkType {
    let previous = match previous {
        Some(previous) => previous,
        None => return ChunkType::Full,
    };

    if header.message_stream_id != previous.message_stream_id
        || header.timestamp.value < previous.timestamp.value
    {
        return ChunkType::Full;
    }

    if header.message_type_id != previous.message_type_id
        || header.message_length != previous.message_length
    {
        return ChunkType::TimeDeltaWithoutMessageStreamId;
    }

    if header.timestamp.delta_since(previous.timestamp) != previous.timestamp_delta {
        return ChunkType::TimeDeltaOnly;
    }

    ChunkType::Continuation
}

/// Total header size, used to size buffers
pub fn header_length(chunk_type: ChunkType, chunk_stream_id: u32, extended: bool) -> usize {
    let basic = match chunk_stream_id {
        0..=63 => 1,
        64..=319 => 2,
        _ => 3,
    };

    let extended = if extended { EXTENDED_TIMESTAMP_LENGTH } else { 0 };
    basic + chunk_type.message_header_length() + extended
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header(timestamp: u32, length: u32, type_id: u8, stream_id: u32) -> ChunkHeader {
        ChunkHeader {
            timestamp: RtmpTimestamp::new(timestamp),
            message_length: length,
            message_type_id: type_id,
            message_stream_id: stream_id,
            ..ChunkHeader::new(3)
        }
    }

    #[test]
    fn basic_header_lengths_follow_low_six_bits() {
        assert_eq!(basic_header_length(0b0000_0000), 2);
        assert_eq!(basic_header_length(0b1100_0001), 3);
        assert_eq!(basic_header_length(0b0100_0101), 1);
    }

    #[test]
    fn can_decode_single_byte_basic_header() {
        let (header, length) = decode_basic_header(&[0b1000_0101]).unwrap();
        assert_eq!(header.chunk_type, ChunkType::TimeDeltaOnly);
        assert_eq!(header.chunk_stream_id, 5);
        assert_eq!(length, 1);
    }

    #[test]
    fn can_decode_two_byte_basic_header() {
        let (header, length) = decode_basic_header(&[0b0100_0000, 200]).unwrap();
        assert_eq!(header.chunk_type, ChunkType::TimeDeltaWithoutMessageStreamId);
        assert_eq!(header.chunk_stream_id, 264);
        assert_eq!(length, 2);
    }

    #[test]
    fn three_byte_basic_header_is_little_endian() {
        let (header, length) = decode_basic_header(&[0b1100_0001, 0x10, 0x02]).unwrap();
        assert_eq!(header.chunk_type, ChunkType::Continuation);
        assert_eq!(header.chunk_stream_id, 64 + 0x10 + 0x02 * 256);
        assert_eq!(length, 3);
    }

    #[test]
    fn incomplete_basic_header_returns_none() {
        assert_eq!(decode_basic_header(&[]), None);
        assert_eq!(decode_basic_header(&[0b0000_0001, 0x10]), None);
    }

    #[test]
    fn encoded_basic_header_uses_smallest_form() {
        let mut bytes = BytesMut::new();
        encode_basic_header(ChunkType::Full, 63, &mut bytes);
        assert_eq!(&bytes[..], &[63]);

        let mut bytes = BytesMut::new();
        encode_basic_header(ChunkType::Full, 64, &mut bytes);
        assert_eq!(&bytes[..], &[0, 0]);

        let mut bytes = BytesMut::new();
        encode_basic_header(ChunkType::Continuation, 320, &mut bytes);
        assert_eq!(&bytes[..], &[0b1100_0001, 0x00, 0x01]);

        let mut bytes = BytesMut::new();
        encode_basic_header(ChunkType::Full, MAX_CHUNK_STREAM_ID, &mut bytes);
        assert_eq!(&bytes[..], &[1, 0xFF, 0xFF]);
    }

    #[test]
    fn can_decode_full_message_header() {
        let bytes = [0x00, 0x01, 0x00, 0x00, 0x00, 0x64, 0x09, 0x05, 0x00, 0x00, 0x00];
        let (fields, length) = decode_message_header(ChunkType::Full, &bytes).unwrap();

        assert_eq!(length, 11);
        assert_eq!(fields.timestamp_field, Some(256));
        assert_eq!(fields.message_length, Some(100));
        assert_eq!(fields.type_id, Some(9));
        assert_eq!(fields.message_stream_id, Some(5));
        assert!(!fields.has_extended_timestamp());
    }

    #[test]
    fn time_delta_only_header_carries_just_the_timestamp() {
        let (fields, length) =
            decode_message_header(ChunkType::TimeDeltaOnly, &[0xFF, 0xFF, 0xFF, 0x12]).unwrap();

        assert_eq!(length, 3);
        assert_eq!(fields.timestamp_field, Some(MAX_TIMESTAMP_FIELD));
        assert_eq!(fields.message_length, None);
        assert!(fields.has_extended_timestamp());
    }

    #[test]
    fn short_message_header_returns_none() {
        assert_eq!(decode_message_header(ChunkType::TimeDeltaWithoutMessageStreamId, &[0; 6]), None);
    }

    #[test]
    fn full_header_encodes_stream_id_little_endian() {
        let mut value = header(256, 100, 9, 5);
        value.set_timestamp_fields(ChunkType::Full, None);

        let mut bytes = BytesMut::new();
        let written = encode_header(ChunkType::Full, &value, &mut bytes);

        assert_eq!(written, 12);
        assert_eq!(
            &bytes[..],
            &[0x03, 0x00, 0x01, 0x00, 0x00, 0x00, 0x64, 0x09, 0x05, 0x00, 0x00, 0x00]
        );
    }

    #[test]
    fn large_timestamp_is_written_as_extended_timestamp() {
        let mut value = header(0x0100_0000, 10, 8, 1);
        value.set_timestamp_fields(ChunkType::Full, None);

        let mut bytes = BytesMut::new();
        let written = encode_header(ChunkType::Full, &value, &mut bytes);

        assert_eq!(written, 16);
        assert_eq!(&bytes[1..4], &[0xFF, 0xFF, 0xFF]);
        assert_eq!(&bytes[12..16], &[0x01, 0x00, 0x00, 0x00]);
    }

    #[test]
    fn continuation_repeats_extended_timestamp() {
        let mut first = header(0x0100_0000, 10, 8, 1);
        first.set_timestamp_fields(ChunkType::Full, None);

        let mut bytes = BytesMut::new();
        let written = encode_header(ChunkType::Continuation, &first, &mut bytes);

        assert_eq!(written, 5);
        assert_eq!(&bytes[..], &[0xC3, 0x01, 0x00, 0x00, 0x00]);
    }

    #[test]
    fn first_message_on_stream_uses_full_header() {
        assert_eq!(select_chunk_type(&header(0, 10, 9, 1), None), ChunkType::Full);
    }

    #[test]
    fn changed_stream_id_or_backwards_timestamp_uses_full_header() {
        let mut previous = header(100, 10, 9, 1);
        previous.set_timestamp_fields(ChunkType::Full, None);

        assert_eq!(select_chunk_type(&header(120, 10, 9, 2), Some(&previous)), ChunkType::Full);
        assert_eq!(select_chunk_type(&header(90, 10, 9, 1), Some(&previous)), ChunkType::Full);
    }

    #[test]
    fn changed_length_uses_type_1_header() {
        let mut previous = header(100, 10, 9, 1);
        previous.set_timestamp_fields(ChunkType::Full, None);

        let current = header(120, 11, 9, 1);
        assert_eq!(
            select_chunk_type(&current, Some(&previous)),
            ChunkType::TimeDeltaWithoutMessageStreamId
        );
    }

    #[test]
    fn changed_delta_uses_type_2_then_repeated_delta_uses_type_3() {
        let mut previous = header(100, 10, 9, 1);
        previous.set_timestamp_fields(ChunkType::Full, None);

        let mut second = header(133, 10, 9, 1);
        assert_eq!(select_chunk_type(&second, Some(&previous)), ChunkType::TimeDeltaOnly);
        second.set_timestamp_fields(ChunkType::TimeDeltaOnly, Some(&previous));
        assert_eq!(second.timestamp_delta, 33);

        let third = header(166, 10, 9, 1);
        assert_eq!(select_chunk_type(&third, Some(&second)), ChunkType::Continuation);
    }

    #[test]
    fn header_length_accounts_for_all_parts() {
        assert_eq!(header_length(ChunkType::Full, 3, false), 12);
        assert_eq!(header_length(ChunkType::Continuation, 400, true), 7);
        assert_eq!(header_length(ChunkType::TimeDeltaOnly, 70, false), 5);
    }
}
