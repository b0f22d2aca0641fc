//! Serialization and deserialization of values encoded with Adobe's Action Message Format 0,
//! as described in the AMF0 file format specification
//! <https://wwwimages2.adobe.com/content/dam/acom/en/devnet/pdf/amf0-file-format-specification.pdf>
//!
//! RTMP uses AMF0 for the arguments of every command and data message, so only the subset of
//! markers that show up in those messages is supported.
//!
//! # Examples
//! ```
//! use std::io::Cursor;
//! use std::collections::HashMap;
//! use streamkit_amf0::{Amf0Value, serialize, deserialize};
//!
//! let mut properties = HashMap::new();
//! properties.insert("app".to_string(), Amf0Value::Utf8String("live".to_string()));
//! properties.insert("capabilities".to_string(), Amf0Value::Number(15.0));
//!
//! let input = vec![
//!     Amf0Value::Utf8String("connect".to_string()),
//!     Amf0Value::Number(1.0),
//!     Amf0Value::Object(properties),
//! ];
//!
//! let bytes = serialize(&input).unwrap();
//! let output = deserialize(&mut Cursor::new(bytes)).unwrap();
//!
//! assert_eq!(input, output);
//! ```

mod deserialization;
mod errors;
mod serialization;

pub use crate::deserialization::deserialize;
pub use crate::errors::{Amf0DeserializationError, Amf0SerializationError};
pub use crate::serialization::serialize;

use std::collections::HashMap;

/// A single AMF0 encoded value
#[derive(PartialEq, Debug, Clone)]
pub enum Amf0Value {
    Number(f64),
    Boolean(bool),
    Utf8String(String),
    Object(HashMap<String, Amf0Value>),

    /// An associative array.  On the wire it differs from an object only by its marker and a
    /// leading (advisory) entry count, but encoders such as OBS send `onMetaData` this way.
    EcmaArray(HashMap<String, Amf0Value>),
    StrictArray(Vec<Amf0Value>),
    Null,
    Undefined,
}

impl Amf0Value {
    pub fn as_number(&self) -> Option<f64> {
        match *self {
            Amf0Value::Number(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_boolean(&self) -> Option<bool> {
        match *self {
            Amf0Value::Boolean(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Amf0Value::Utf8String(value) => Some(value.as_str()),
            _ => None,
        }
    }

    /// Returns the key/value pairs of either an object or an ECMA array
    pub fn as_properties(&self) -> Option<&HashMap<String, Amf0Value>> {
        match self {
            Amf0Value::Object(properties) => Some(properties),
            Amf0Value::EcmaArray(properties) => Some(properties),
            _ => None,
        }
    }

    pub fn into_string(self) -> Option<String> {
        match self {
            Amf0Value::Utf8String(value) => Some(value),
            _ => None,
        }
    }

    pub fn into_properties(self) -> Option<HashMap<String, Amf0Value>> {
        match self {
            Amf0Value::Object(properties) => Some(properties),
            Amf0Value::EcmaArray(properties) => Some(properties),
            _ => None,
        }
    }
}

mod markers {
    pub const NUMBER_MARKER: u8 = 0x00;
    pub const BOOLEAN_MARKER: u8 = 0x01;
    pub const STRING_MARKER: u8 = 0x02;
    pub const OBJECT_MARKER: u8 = 0x03;
    pub const NULL_MARKER: u8 = 0x05;
    pub const UNDEFINED_MARKER: u8 = 0x06;
    pub const ECMA_ARRAY_MARKER: u8 = 0x08;
    pub const OBJECT_END_MARKER: u8 = 0x09;
    pub const STRICT_ARRAY_MARKER: u8 = 0x0a;
    pub const LONG_STRING_MARKER: u8 = 0x0c;
    pub const UTF_8_EMPTY_MARKER: u16 = 0;
}

#[cfg(test)]
mod tests {
    use super::Amf0Value;
    use std::collections::HashMap;

    #[test]
    fn properties_available_from_object_and_ecma_array() {
        let mut properties = HashMap::new();
        properties.insert("width".to_string(), Amf0Value::Number(1280.0));

        let object = Amf0Value::Object(properties.clone());
        let array = Amf0Value::EcmaArray(properties.clone());

        assert_eq!(object.as_properties(), Some(&properties));
        assert_eq!(array.into_properties(), Some(properties));
        assert_eq!(Amf0Value::Null.as_properties(), None);
    }

    #[test]
    fn typed_accessors_reject_other_variants() {
        let value = Amf0Value::Utf8String("live".to_string());

        assert_eq!(value.as_str(), Some("live"));
        assert_eq!(value.as_number(), None);
        assert_eq!(value.as_boolean(), None);
        assert_eq!(Amf0Value::Boolean(true).as_boolean(), Some(true));
    }
}
