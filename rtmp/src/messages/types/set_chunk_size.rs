use bytes::{BufMut, Bytes, BytesMut};

use crate::byte_cursor::ByteCursor;
use crate::messages::{
    MessageDeserializationError, MessageSerializationError, RtmpMessage, SET_CHUNK_SIZE_TYPE_ID,
};

const MAX_SIZE: u32 = 0x7FFF_FFFF;

pub fn serialize(size: u32) -> Result<Bytes, MessageSerializationError> {
    if size == 0 || size > MAX_SIZE {
        return Err(MessageSerializationError::InvalidChunkSize { size });
    }

    let mut bytes = BytesMut::with_capacity(4);
    bytes.put_u32(size);
    Ok(bytes.freeze())
}

pub fn deserialize(data: &[u8]) -> Result<RtmpMessage, MessageDeserializationError> {
    // The first bit is reserved and must be zero
    let size = ByteCursor::new(data).read_u32()?;
    if size == 0 || size > MAX_SIZE {
        return Err(MessageDeserializationError::InvalidMessageFormat {
            type_id: SET_CHUNK_SIZE_TYPE_ID,
        });
    }

    Ok(RtmpMessage::SetChunkSize { size })
}
