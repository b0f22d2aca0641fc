use crate::byte_cursor::CursorUnderflow;
use streamkit_amf0::Amf0DeserializationError;
use thiserror::Error;

/// Errors raised while turning a `MessagePayload` body into an `RtmpMessage`
#[derive(Debug, Error)]
pub enum MessageDeserializationError {
    /// The body did not have the shape its type id requires, such as a command without a
    /// name and transaction id
    #[error("Protocol error: message of type {type_id} was not encoded in the expected format")]
    InvalidMessageFormat { type_id: u8 },

    #[error("The message did not contain valid AMF0 values: {0}")]
    Amf0DeserializationError(#[from] Amf0DeserializationError),

    #[error("The message body was shorter than its type requires: {0}")]
    BodyTooShort(#[from] CursorUnderflow),
}
