use streamkit_amf0::Amf0SerializationError;
use thiserror::Error;

/// Errors raised while encoding an `RtmpMessage` into a `MessagePayload`
#[derive(Debug, Error)]
pub enum MessageSerializationError {
    #[error("Chunk size {size} is outside the valid range of 1 to 2147483647")]
    InvalidChunkSize { size: u32 },

    #[error("The values could not be encoded as AMF0: {0}")]
    Amf0SerializationError(#[from] Amf0SerializationError),
}
