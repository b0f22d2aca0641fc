use bytes::{BufMut, Bytes, BytesMut};

use crate::byte_cursor::ByteCursor;
use crate::messages::{MessageDeserializationError, RtmpMessage};

pub fn serialize(sequence_number: u32) -> Bytes {
    let mut bytes = BytesMut::with_capacity(4);
    bytes.put_u32(sequence_number);
    bytes.freeze()
}

pub fn deserialize(data: &[u8]) -> Result<RtmpMessage, MessageDeserializationError> {
    let sequence_number = ByteCursor::new(data).read_u32()?;
    Ok(RtmpMessage::Acknowledgement { sequence_number })
}

#[cfg(test)]
mod tests {
    use super::{deserialize, serialize};
    use crate::messages::RtmpMessage;

    #[test]
    fn sequence_number_uses_four_big_endian_bytes() {
        let bytes = serialize(501);

        assert_eq!(&bytes[..], &[0, 0, 0x01, 0xF5]);
        assert_eq!(
            deserialize(&bytes).unwrap(),
            RtmpMessage::Acknowledgement {
                sequence_number: 501
            }
        );
    }
}
