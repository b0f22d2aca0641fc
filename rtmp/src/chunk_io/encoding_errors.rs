use crate::messages::MessageSerializationError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ChunkEncodingError {
    #[error("Message body of {size} bytes does not fit in the 24 bit message length field")]
    MessageTooLong { size: usize },

    #[error("Messages with an empty body cannot be sent")]
    EmptyMessage,

    #[error("Failed to build the set chunk size message: {0}")]
    MessageSerialization(#[from] MessageSerializationError),
}
