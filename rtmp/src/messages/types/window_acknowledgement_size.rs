use bytes::{BufMut, Bytes, BytesMut};

use crate::byte_cursor::ByteCursor;
use crate::messages::{MessageDeserializationError, RtmpMessage};

pub fn serialize(size: u32) -> Bytes {
    let mut bytes = BytesMut::with_capacity(4);
    bytes.put_u32(size);
    bytes.freeze()
}

pub fn deserialize(data: &[u8]) -> Result<RtmpMessage, MessageDeserializationError> {
    let size = ByteCursor::new(data).read_u32()?;
    Ok(RtmpMessage::WindowAcknowledgement { size })
}

#[cfg(test)]
mod tests {
    use super::deserialize;
    use crate::messages::RtmpMessage;

    #[test]
    fn can_read_window_size() {
        let result = deserialize(&[0x00, 0x26, 0x25, 0xA0]).unwrap();

        assert_eq!(result, RtmpMessage::WindowAcknowledgement { size: 2_500_000 });
    }
}
