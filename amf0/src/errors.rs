use std::{io, string};
use thiserror::Error;

/// Errors that can occur while decoding AMF0 bytes into values
#[derive(Debug, Error)]
pub enum Amf0DeserializationError {
    #[error("Encountered unknown AMF0 marker {marker:#04x}")]
    UnknownMarker { marker: u8 },

    #[error("Object property had an empty name but was not followed by an object end marker")]
    UnexpectedEmptyObjectPropertyName,

    #[error("Hit the end of the buffer while a value was still expected")]
    UnexpectedEof,

    #[error("Failed to read AMF0 bytes: {0}")]
    Io(#[from] io::Error),

    #[error("AMF0 string was not valid UTF-8: {0}")]
    FromUtf8Error(#[from] string::FromUtf8Error),
}

/// Errors that can occur while encoding values into AMF0 bytes
#[derive(Debug, Error)]
pub enum Amf0SerializationError {
    #[error("String of {length} bytes does not fit in an AMF0 short string")]
    NormalStringTooLong { length: usize },

    #[error("Failed to write AMF0 bytes: {0}")]
    Io(#[from] io::Error),
}
