//! An RTMP chunk stream implementation that is independent of any I/O.
//!
//! Bytes read from a socket go into a `ServerSession` or `ClientSession`, which hands back the
//! packets to write to the peer along with events describing what the peer asked for.  The lower
//! layers (handshake, chunk reassembly and encoding, message serialization) are public so they
//! can be used on their own.

#[cfg(test)]
#[macro_use]
mod test_utils;

pub mod byte_cursor;
pub mod chunk_io;
pub mod handshake;
pub mod messages;
pub mod sessions;
pub mod time;
