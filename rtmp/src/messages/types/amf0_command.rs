use bytes::Bytes;
use std::io::Cursor;
use streamkit_amf0::{self, Amf0Value};

use crate::messages::{
    MessageDeserializationError, MessageSerializationError, RtmpMessage, AMF0_COMMAND_TYPE_ID,
};

pub fn serialize(
    command_name: String,
    transaction_id: f64,
    command_object: Amf0Value,
    additional_arguments: Vec<Amf0Value>,
) -> Result<Bytes, MessageSerializationError> {
    let mut values = Vec::with_capacity(3 + additional_arguments.len());
    values.push(Amf0Value::Utf8String(command_name));
    values.push(Amf0Value::Number(transaction_id));
    values.push(command_object);
    values.extend(additional_arguments);

    let bytes = streamkit_amf0::serialize(&values)?;
    Ok(Bytes::from(bytes))
}

/// A command must at least start with its name and a transaction id.  Some encoders omit the
/// command object entirely, in which case it reads back as `Null`.
pub fn deserialize(data: &[u8]) -> Result<RtmpMessage, MessageDeserializationError> {
    let mut values = streamkit_amf0::deserialize(&mut Cursor::new(data))?.into_iter();
    let invalid = || MessageDeserializationError::InvalidMessageFormat {
        type_id: AMF0_COMMAND_TYPE_ID,
    };

    let command_name = values.next().and_then(Amf0Value::into_string).ok_or_else(invalid)?;
    let transaction_id = values
        .next()
        .and_then(|value| value.as_number())
        .ok_or_else(invalid)?;

    let command_object = values.next().unwrap_or(Amf0Value::Null);

    Ok(RtmpMessage::Amf0Command {
        command_name,
        transaction_id,
        command_object,
        additional_arguments: values.collect(),
    })
}
