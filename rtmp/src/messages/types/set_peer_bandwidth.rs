use bytes::{BufMut, Bytes, BytesMut};

use crate::byte_cursor::ByteCursor;
use crate::messages::{
    MessageDeserializationError, PeerBandwidthLimitType, RtmpMessage, SET_PEER_BANDWIDTH_TYPE_ID,
};

pub fn serialize(limit_type: PeerBandwidthLimitType, size: u32) -> Bytes {
    let limit = match limit_type {
        PeerBandwidthLimitType::Hard => 0,
        PeerBandwidthLimitType::Soft => 1,
        PeerBandwidthLimitType::Dynamic => 2,
    };

    let mut bytes = BytesMut::with_capacity(5);
    bytes.put_u32(size);
    bytes.put_u8(limit);
    bytes.freeze()
}

pub fn deserialize(data: &[u8]) -> Result<RtmpMessage, MessageDeserializationError> {
    let mut cursor = ByteCursor::new(data);
    let size = cursor.read_u32()?;
    let limit_type = match cursor.read_u8()? {
        0 => PeerBandwidthLimitType::Hard,
        1 => PeerBandwidthLimitType::Soft,
        2 => PeerBandwidthLimitType::Dynamic,
        _ => {
            return Err(MessageDeserializationError::InvalidMessageFormat {
                type_id: SET_PEER_BANDWIDTH_TYPE_ID,
            })
        }
    };

    Ok(RtmpMessage::SetPeerBandwidth { size, limit_type })
}
