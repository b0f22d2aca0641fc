use bytes::{BufMut, Bytes, BytesMut};

use crate::byte_cursor::ByteCursor;
use crate::messages::{MessageDeserializationError, RtmpMessage};

pub fn serialize(stream_id: u32) -> Bytes {
    let mut bytes = BytesMut::with_capacity(4);
    bytes.put_u32(stream_id);
    bytes.freeze()
}

pub fn deserialize(data: &[u8]) -> Result<RtmpMessage, MessageDeserializationError> {
    let stream_id = ByteCursor::new(data).read_u32()?;
    Ok(RtmpMessage::Abort { stream_id })
}

#[cfg(test)]
mod tests {
    use super::{deserialize, serialize};
    use crate::messages::{MessageDeserializationError, RtmpMessage};

    #[test]
    fn body_is_chunk_stream_id_as_big_endian_u32() {
        assert_eq!(&serialize(0x0102)[..], &[0, 0, 1, 2]);
        assert_eq!(
            deserialize(&[0, 0, 0, 6]).unwrap(),
            RtmpMessage::Abort { stream_id: 6 }
        );
    }

    #[test]
    fn short_body_is_rejected() {
        match deserialize(&[0, 0]) {
            Err(MessageDeserializationError::BodyTooShort(_)) => (),
            x => panic!("Unexpected result: {:?}", x),
        }
    }
}
