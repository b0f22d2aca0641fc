//! Decoding of AMF0 encoded bytes into `Amf0Value`s

use crate::errors::Amf0DeserializationError;
use crate::markers;
use crate::Amf0Value;
use byteorder::{BigEndian, ReadBytesExt};
use std::collections::HashMap;
use std::io::Read;

/// Reads AMF0 values from the byte stream until it is exhausted
pub fn deserialize<R: Read>(bytes: &mut R) -> Result<Vec<Amf0Value>, Amf0DeserializationError> {
    let mut values = Vec::new();
    while let Some(value) = read_value(bytes)? {
        values.push(value);
    }

    Ok(values)
}

fn read_value<R: Read>(bytes: &mut R) -> Result<Option<Amf0Value>, Amf0DeserializationError> {
    let mut marker = [0_u8; 1];
    if bytes.read(&mut marker)? == 0 {
        return Ok(None);
    }

    let value = match marker[0] {
        markers::NUMBER_MARKER => Amf0Value::Number(bytes.read_f64::<BigEndian>()?),
        markers::BOOLEAN_MARKER => Amf0Value::Boolean(bytes.read_u8()? != 0),
        markers::STRING_MARKER => {
            let length = bytes.read_u16::<BigEndian>()? as usize;
            Amf0Value::Utf8String(read_utf8(bytes, length)?)
        }

        markers::LONG_STRING_MARKER => {
            let length = bytes.read_u32::<BigEndian>()? as usize;
            Amf0Value::Utf8String(read_utf8(bytes, length)?)
        }

        markers::OBJECT_MARKER => Amf0Value::Object(read_properties(bytes)?),
        markers::ECMA_ARRAY_MARKER => {
            // The count is advisory.  Real encoders terminate the array with the same
            // end marker objects use, so read properties until that marker instead.
            let _count = bytes.read_u32::<BigEndian>()?;
            Amf0Value::EcmaArray(read_properties(bytes)?)
        }

        markers::STRICT_ARRAY_MARKER => {
            let count = bytes.read_u32::<BigEndian>()?;
            let mut values = Vec::new();
            for _ in 0..count {
                match read_value(bytes)? {
                    Some(value) => values.push(value),
                    None => return Err(Amf0DeserializationError::UnexpectedEof),
                }
            }

            Amf0Value::StrictArray(values)
        }

        markers::NULL_MARKER => Amf0Value::Null,
        markers::UNDEFINED_MARKER => Amf0Value::Undefined,
        markers::OBJECT_END_MARKER => return Ok(None),
        marker => return Err(Amf0DeserializationError::UnknownMarker { marker }),
    };

    Ok(Some(value))
}

fn read_utf8<R: Read>(bytes: &mut R, length: usize) -> Result<String, Amf0DeserializationError> {
    // The declared length is untrusted, so only allocate for what actually arrives
    let mut buffer = Vec::new();
    bytes.by_ref().take(length as u64).read_to_end(&mut buffer)?;
    if buffer.len() < length {
        return Err(Amf0DeserializationError::UnexpectedEof);
    }

    Ok(String::from_utf8(buffer)?)
}

fn read_properties<R: Read>(
    bytes: &mut R,
) -> Result<HashMap<String, Amf0Value>, Amf0DeserializationError> {
    let mut properties = HashMap::new();
    loop {
        let name_length = bytes.read_u16::<BigEndian>()? as usize;
        if name_length == 0 {
            if bytes.read_u8()? != markers::OBJECT_END_MARKER {
                return Err(Amf0DeserializationError::UnexpectedEmptyObjectPropertyName);
            }

            return Ok(properties);
        }

        let name = read_utf8(bytes, name_length)?;
        match read_value(bytes)? {
            Some(value) => properties.insert(name, value),
            None => return Err(Amf0DeserializationError::UnexpectedEof),
        };
    }
}

#[cfg(test)]
mod tests {
    use super::deserialize;
    use crate::errors::Amf0DeserializationError;
    use crate::markers;
    use crate::Amf0Value;
    use byteorder::{BigEndian, WriteBytesExt};
    use std::collections::HashMap;
    use std::io::Cursor;

    fn write_property_name(bytes: &mut Vec<u8>, name: &str) {
        bytes.write_u16::<BigEndian>(name.len() as u16).unwrap();
        bytes.extend(name.as_bytes());
    }

    fn write_object_end(bytes: &mut Vec<u8>) {
        bytes.write_u16::<BigEndian>(markers::UTF_8_EMPTY_MARKER).unwrap();
        bytes.push(markers::OBJECT_END_MARKER);
    }

    #[test]
    fn can_read_command_shaped_value_list() {
        let mut bytes = vec![markers::STRING_MARKER];
        bytes.write_u16::<BigEndian>(7).unwrap();
        bytes.extend("connect".as_bytes());
        bytes.push(markers::NUMBER_MARKER);
        bytes.write_f64::<BigEndian>(1.0).unwrap();
        bytes.push(markers::OBJECT_MARKER);
        write_property_name(&mut bytes, "app");
        bytes.push(markers::STRING_MARKER);
        bytes.write_u16::<BigEndian>(4).unwrap();
        bytes.extend("live".as_bytes());
        write_object_end(&mut bytes);
        bytes.push(markers::NULL_MARKER);
        bytes.push(markers::BOOLEAN_MARKER);
        bytes.push(1);

        let result = deserialize(&mut Cursor::new(bytes)).unwrap();

        let mut properties = HashMap::new();
        properties.insert("app".to_string(), Amf0Value::Utf8String("live".to_string()));
        let expected = vec![
            Amf0Value::Utf8String("connect".to_string()),
            Amf0Value::Number(1.0),
            Amf0Value::Object(properties),
            Amf0Value::Null,
            Amf0Value::Boolean(true),
        ];

        assert_eq!(result, expected);
    }

    #[test]
    fn ecma_array_ignores_advertised_count() {
        let mut bytes = vec![markers::ECMA_ARRAY_MARKER];
        bytes.write_u32::<BigEndian>(0).unwrap();
        write_property_name(&mut bytes, "width");
        bytes.push(markers::NUMBER_MARKER);
        bytes.write_f64::<BigEndian>(1920.0).unwrap();
        write_property_name(&mut bytes, "encoder");
        bytes.push(markers::STRING_MARKER);
        bytes.write_u16::<BigEndian>(3).unwrap();
        bytes.extend("obs".as_bytes());
        write_object_end(&mut bytes);

        let result = deserialize(&mut Cursor::new(bytes)).unwrap();

        let mut properties = HashMap::new();
        properties.insert("width".to_string(), Amf0Value::Number(1920.0));
        properties.insert("encoder".to_string(), Amf0Value::Utf8String("obs".to_string()));
        assert_eq!(result, vec![Amf0Value::EcmaArray(properties)]);
    }

    #[test]
    fn can_read_strict_array_and_long_string() {
        let mut bytes = vec![markers::STRICT_ARRAY_MARKER];
        bytes.write_u32::<BigEndian>(2).unwrap();
        bytes.push(markers::UNDEFINED_MARKER);
        bytes.push(markers::LONG_STRING_MARKER);
        bytes.write_u32::<BigEndian>(2).unwrap();
        bytes.extend("ok".as_bytes());

        let result = deserialize(&mut Cursor::new(bytes)).unwrap();

        let expected = vec![Amf0Value::StrictArray(vec![
            Amf0Value::Undefined,
            Amf0Value::Utf8String("ok".to_string()),
        ])];
        assert_eq!(result, expected);
    }

    #[test]
    fn long_string_shorter_than_declared_length_is_rejected() {
        let mut bytes = vec![markers::LONG_STRING_MARKER];
        bytes.write_u32::<BigEndian>(u32::MAX).unwrap();
        bytes.extend("ok".as_bytes());

        match deserialize(&mut Cursor::new(bytes)) {
            Err(Amf0DeserializationError::UnexpectedEof) => (),
            x => panic!("Unexpected result: {:?}", x),
        }
    }

    #[test]
    fn unknown_marker_is_rejected() {
        let bytes = vec![0x11_u8];

        match deserialize(&mut Cursor::new(bytes)) {
            Err(Amf0DeserializationError::UnknownMarker { marker: 0x11 }) => (),
            x => panic!("Unexpected result: {:?}", x),
        }
    }

    #[test]
    fn truncated_number_is_an_io_error() {
        let bytes = vec![markers::NUMBER_MARKER, 0x40, 0x00];

        match deserialize(&mut Cursor::new(bytes)) {
            Err(Amf0DeserializationError::Io(_)) => (),
            x => panic!("Unexpected result: {:?}", x),
        }
    }

    #[test]
    fn empty_property_name_must_close_object() {
        let mut bytes = vec![markers::OBJECT_MARKER];
        bytes.write_u16::<BigEndian>(0).unwrap();
        bytes.push(markers::NULL_MARKER);

        match deserialize(&mut Cursor::new(bytes)) {
            Err(Amf0DeserializationError::UnexpectedEmptyObjectPropertyName) => (),
            x => panic!("Unexpected result: {:?}", x),
        }
    }
}
