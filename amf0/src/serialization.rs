//! Encoding of `Amf0Value`s into AMF0 bytes

use crate::errors::Amf0SerializationError;
use crate::markers;
use crate::Amf0Value;
use byteorder::{BigEndian, WriteBytesExt};
use std::collections::HashMap;

/// Encodes each value in order into a single byte vector
pub fn serialize(values: &[Amf0Value]) -> Result<Vec<u8>, Amf0SerializationError> {
    let mut bytes = Vec::new();
    for value in values {
        write_value(value, &mut bytes)?;
    }

    Ok(bytes)
}

fn write_value(value: &Amf0Value, bytes: &mut Vec<u8>) -> Result<(), Amf0SerializationError> {
    match value {
        Amf0Value::Number(number) => {
            bytes.push(markers::NUMBER_MARKER);
            bytes.write_f64::<BigEndian>(*number)?;
        }

        Amf0Value::Boolean(boolean) => {
            bytes.push(markers::BOOLEAN_MARKER);
            bytes.push(*boolean as u8);
        }

        Amf0Value::Utf8String(string) => {
            bytes.push(markers::STRING_MARKER);
            write_short_string(string, bytes)?;
        }

        Amf0Value::Object(properties) => {
            bytes.push(markers::OBJECT_MARKER);
            write_properties(properties, bytes)?;
        }

        Amf0Value::EcmaArray(properties) => {
            bytes.push(markers::ECMA_ARRAY_MARKER);
            bytes.write_u32::<BigEndian>(properties.len() as u32)?;
            write_properties(properties, bytes)?;
        }

        Amf0Value::StrictArray(values) => {
            bytes.push(markers::STRICT_ARRAY_MARKER);
            bytes.write_u32::<BigEndian>(values.len() as u32)?;
            for value in values {
                write_value(value, bytes)?;
            }
        }

        Amf0Value::Null => bytes.push(markers::NULL_MARKER),
        Amf0Value::Undefined => bytes.push(markers::UNDEFINED_MARKER),
    }

    Ok(())
}

fn write_short_string(value: &str, bytes: &mut Vec<u8>) -> Result<(), Amf0SerializationError> {
    if value.len() > u16::max_value() as usize {
        return Err(Amf0SerializationError::NormalStringTooLong {
            length: value.len(),
        });
    }

    bytes.write_u16::<BigEndian>(value.len() as u16)?;
    bytes.extend(value.as_bytes());
    Ok(())
}

fn write_properties(
    properties: &HashMap<String, Amf0Value>,
    bytes: &mut Vec<u8>,
) -> Result<(), Amf0SerializationError> {
    for (name, value) in properties {
        write_short_string(name, bytes)?;
        write_value(value, bytes)?;
    }

    bytes.write_u16::<BigEndian>(markers::UTF_8_EMPTY_MARKER)?;
    bytes.push(markers::OBJECT_END_MARKER);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::serialize;
    use crate::errors::Amf0SerializationError;
    use crate::markers;
    use crate::Amf0Value;
    use byteorder::{BigEndian, WriteBytesExt};
    use std::collections::HashMap;

    #[test]
    fn status_object_is_written_with_end_marker() {
        let mut properties = HashMap::new();
        properties.insert("level".to_string(), Amf0Value::Utf8String("status".to_string()));

        let result = serialize(&[Amf0Value::Null, Amf0Value::Object(properties)]).unwrap();

        let mut expected = vec![markers::NULL_MARKER, markers::OBJECT_MARKER];
        expected.write_u16::<BigEndian>(5).unwrap();
        expected.extend("level".as_bytes());
        expected.push(markers::STRING_MARKER);
        expected.write_u16::<BigEndian>(6).unwrap();
        expected.extend("status".as_bytes());
        expected.write_u16::<BigEndian>(markers::UTF_8_EMPTY_MARKER).unwrap();
        expected.push(markers::OBJECT_END_MARKER);

        assert_eq!(result, expected);
    }

    #[test]
    fn ecma_array_carries_entry_count() {
        let mut properties = HashMap::new();
        properties.insert("duration".to_string(), Amf0Value::Number(0.0));

        let result = serialize(&[Amf0Value::EcmaArray(properties)]).unwrap();

        assert_eq!(result[0], markers::ECMA_ARRAY_MARKER);
        assert_eq!(&result[1..5], &[0, 0, 0, 1]);
        assert_eq!(&result[result.len() - 3..], &[0, 0, markers::OBJECT_END_MARKER]);
    }

    #[test]
    fn number_and_boolean_use_big_endian_layout() {
        let result = serialize(&[Amf0Value::Number(2.5), Amf0Value::Boolean(true)]).unwrap();

        let mut expected = vec![markers::NUMBER_MARKER];
        expected.write_f64::<BigEndian>(2.5).unwrap();
        expected.push(markers::BOOLEAN_MARKER);
        expected.push(1);

        assert_eq!(result, expected);
    }

    #[test]
    fn string_longer_than_u16_is_rejected() {
        let value = "a".repeat(u16::max_value() as usize + 1);

        match serialize(&[Amf0Value::Utf8String(value)]) {
            Err(Amf0SerializationError::NormalStringTooLong { length: 65536 }) => (),
            x => panic!("Unexpected result: {:?}", x),
        }
    }
}
