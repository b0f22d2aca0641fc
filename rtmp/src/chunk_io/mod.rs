/*!
Framing of RTMP messages into chunks and back.

The `ChunkReassembler` turns an arbitrarily fragmented byte stream from the peer into complete
`MessagePayload`s, while the `ChunkEncoder` splits outbound messages into chunks no larger than
the negotiated maximum chunk size.  Both keep a header cache per chunk stream so that chunk
headers can be compressed, which means every byte received from (or sent to) a peer must pass
through the same instance, in order.
*/

pub mod chunk_header;
mod encoder;
mod encoding_errors;
mod reassembler;
mod reassembly_errors;

pub use self::chunk_header::{ChunkHeader, ChunkType};
pub use self::encoder::{ChunkEncoder, Packet};
pub use self::encoding_errors::ChunkEncodingError;
pub use self::reassembler::{ChunkEvent, ChunkReassembler, ParseStage, PartialPayload};
pub use self::reassembly_errors::ChunkReassemblyError;
