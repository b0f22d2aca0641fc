use bytes::Bytes;
use std::io::Cursor;
use streamkit_amf0::{self, Amf0Value};

use crate::messages::{MessageDeserializationError, MessageSerializationError, RtmpMessage};

pub fn serialize(values: Vec<Amf0Value>) -> Result<Bytes, MessageSerializationError> {
    let bytes = streamkit_amf0::serialize(&values)?;
    Ok(Bytes::from(bytes))
}

pub fn deserialize(data: &[u8]) -> Result<RtmpMessage, MessageDeserializationError> {
    let values = streamkit_amf0::deserialize(&mut Cursor::new(data))?;
    Ok(RtmpMessage::Amf0Data { values })
}

#[cfg(test)]
mod tests {
    use super::{deserialize, serialize};
    use crate::messages::RtmpMessage;
    use streamkit_amf0::Amf0Value;

    #[test]
    fn data_message_keeps_every_value() {
        let values = vec![
            Amf0Value::Utf8String("@setDataFrame".to_string()),
            Amf0Value::Utf8String("onMetaData".to_string()),
            Amf0Value::Null,
        ];

        let bytes = serialize(values.clone()).unwrap();

        assert_eq!(deserialize(&bytes).unwrap(), RtmpMessage::Amf0Data { values });
    }
}
