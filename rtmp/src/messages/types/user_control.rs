use bytes::{BufMut, Bytes, BytesMut};

use crate::byte_cursor::ByteCursor;
use crate::messages::{MessageDeserializationError, RtmpMessage, UserControlEventType};
use crate::time::RtmpTimestamp;

pub fn serialize(
    event_type: UserControlEventType,
    stream_id: Option<u32>,
    buffer_length: Option<u32>,
    timestamp: Option<RtmpTimestamp>,
) -> Bytes {
    let mut bytes = BytesMut::with_capacity(10);
    bytes.put_u16(event_id(event_type));

    match event_type {
        UserControlEventType::SetBufferLength => {
            bytes.put_u32(stream_id.unwrap_or(0));
            bytes.put_u32(buffer_length.unwrap_or(0));
        }

        UserControlEventType::PingRequest | UserControlEventType::PingResponse => {
            bytes.put_u32(timestamp.map(|x| x.value).unwrap_or(0));
        }

        UserControlEventType::Unrecognized(_) => bytes.put_u32(0),
        _ => bytes.put_u32(stream_id.unwrap_or(0)),
    }

    bytes.freeze()
}

pub fn deserialize(data: &[u8]) -> Result<RtmpMessage, MessageDeserializationError> {
    let mut cursor = ByteCursor::new(data);
    let event_type = match cursor.read_u16()? {
        0 => UserControlEventType::StreamBegin,
        1 => UserControlEventType::StreamEof,
        2 => UserControlEventType::StreamDry,
        3 => UserControlEventType::SetBufferLength,
        4 => UserControlEventType::StreamIsRecorded,
        6 => UserControlEventType::PingRequest,
        7 => UserControlEventType::PingResponse,
        other => UserControlEventType::Unrecognized(other),
    };

    let mut stream_id = None;
    let mut buffer_length = None;
    let mut timestamp = None;

    match event_type {
        UserControlEventType::SetBufferLength => {
            stream_id = Some(cursor.read_u32()?);
            buffer_length = Some(cursor.read_u32()?);
        }

        UserControlEventType::PingRequest | UserControlEventType::PingResponse => {
            timestamp = Some(RtmpTimestamp::new(cursor.read_u32()?));
        }

        UserControlEventType::Unrecognized(_) => (),
        _ => stream_id = Some(cursor.read_u32()?),
    }

    Ok(RtmpMessage::UserControl {
        event_type,
        stream_id,
        buffer_length,
        timestamp,
    })
}

fn event_id(event_type: UserControlEventType) -> u16 {
    match event_type {
        UserControlEventType::StreamBegin => 0,
        UserControlEventType::StreamEof => 1,
        UserControlEventType::StreamDry => 2,
        UserControlEventType::SetBufferLength => 3,
        UserControlEventType::StreamIsRecorded => 4,
        UserControlEventType::PingRequest => 6,
        UserControlEventType::PingResponse => 7,
        UserControlEventType::Unrecognized(id) => id,
    }
}
