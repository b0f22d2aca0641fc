use thiserror::Error;

/// Errors that make the inbound chunk stream impossible to continue parsing
#[derive(Debug, Error)]
pub enum ChunkReassemblyError {
    #[error("Malformed chunk header on chunk stream {chunk_stream_id}: {reason}")]
    MalformedHeader {
        chunk_stream_id: u32,
        reason: &'static str,
    },

    #[error("Protocol error: chunk stream {chunk_stream_id} declared a zero length message")]
    ZeroLengthMessage { chunk_stream_id: u32 },

    #[error("Requested maximum chunk size of {chunk_size} is not between 1 and 2147483647")]
    InvalidMaxChunkSize { chunk_size: usize },
}
