/*!
The plain (non-digest) RTMP handshake.

Each side sends a one byte version (p0) followed by a 1536 byte packet (p1) made up of a 4 byte
time, 4 zero bytes and 1528 random bytes.  Each side then echoes the p1 it received back as p2,
with the time field replaced by its own time.  A server answers a client's p1 with p0, p1 and p2
combined.

The handshake buffers input until a whole packet is present, so bytes can arrive split across any
number of reads.  Bytes the peer sent after its final packet are handed back in
`HandshakeProcessResult::Completed` so they can be fed into the chunk reassembler.

```
use streamkit_rtmp::handshake::{Handshake, HandshakeProcessResult, HandshakeState, PeerType};

let mut client = Handshake::new(PeerType::Client);
let mut server = Handshake::new(PeerType::Server);

let c0_and_c1 = match client.generate_outbound_p0_and_p1().unwrap() {
    HandshakeProcessResult::InProgress { response_bytes } => response_bytes,
    x => panic!("Unexpected result: {:?}", x),
};

let s0_s1_and_s2 = match server.process_bytes(&c0_and_c1).unwrap() {
    HandshakeProcessResult::InProgress { response_bytes } => response_bytes,
    x => panic!("Unexpected result: {:?}", x),
};

let c2 = match client.process_bytes(&s0_s1_and_s2).unwrap() {
    HandshakeProcessResult::Completed { response_bytes, .. } => response_bytes,
    x => panic!("Unexpected result: {:?}", x),
};

server.process_bytes(&c2).unwrap();
assert_eq!(server.state(), HandshakeState::Done);
assert_eq!(client.state(), HandshakeState::Done);
```
*/

mod errors;

pub use self::errors::HandshakeError;

use byteorder::{BigEndian, ByteOrder};
use log::{trace, warn};
use rand::RngCore;
use std::time::Instant;

pub const RTMP_VERSION: u8 = 3;
pub const HANDSHAKE_PACKET_SIZE: usize = 1536;

/// Most bytes an unfinished handshake will hold before giving up on the peer
pub const MAX_HANDSHAKE_BUFFER_SIZE: usize = 40960;

const RANDOM_DATA_SIZE: usize = HANDSHAKE_PACKET_SIZE - 8;

#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub enum PeerType {
    Server,
    Client,
}

#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub enum HandshakeState {
    /// Waiting for the peer's version byte
    Uninitialized,

    /// Peer's version byte received, waiting for its p1
    VersionSent,

    /// Our p2 acknowledgement went out, waiting for the peer's p2
    AckSent,

    Done,
}

#[derive(Eq, PartialEq, Debug)]
pub enum HandshakeProcessResult {
    InProgress {
        response_bytes: Vec<u8>,
    },

    Completed {
        response_bytes: Vec<u8>,
        remaining_bytes: Vec<u8>,
    },
}

pub struct Handshake {
    peer_type: PeerType,
    state: HandshakeState,
    started_at: Instant,
    my_epoch: u32,
    my_random: [u8; RANDOM_DATA_SIZE],
    sent_p0_and_p1: bool,
    buffer: Vec<u8>,
}

impl Handshake {
    pub fn new(peer_type: PeerType) -> Handshake {
        let mut my_random = [0_u8; RANDOM_DATA_SIZE];
        rand::thread_rng().fill_bytes(&mut my_random);

        Handshake {
            peer_type,
            state: HandshakeState::Uninitialized,
            started_at: Instant::now(),
            my_epoch: 0,
            my_random,
            sent_p0_and_p1: false,
            buffer: Vec::with_capacity(HANDSHAKE_PACKET_SIZE + 1),
        }
    }

    pub fn state(&self) -> HandshakeState {
        self.state
    }

    pub fn peer_type(&self) -> PeerType {
        self.peer_type
    }

    /// Creates the version byte and p1 packet a client opens the handshake with
    pub fn generate_outbound_p0_and_p1(&mut self) -> Result<HandshakeProcessResult, HandshakeError> {
        if self.peer_type != PeerType::Client {
            return Err(HandshakeError::OutboundP0AndP1NotAllowed);
        }

        if self.sent_p0_and_p1 {
            return Err(HandshakeError::OutboundP0AndP1AlreadyGenerated);
        }

        self.sent_p0_and_p1 = true;
        Ok(HandshakeProcessResult::InProgress {
            response_bytes: self.create_p0_and_p1(),
        })
    }

    pub fn process_bytes(&mut self, data: &[u8]) -> Result<HandshakeProcessResult, HandshakeError> {
        if self.state == HandshakeState::Done {
            return Err(HandshakeError::HandshakeAlreadyCompleted);
        }

        if self.peer_type == PeerType::Client && !self.sent_p0_and_p1 {
            return Err(HandshakeError::ClientHandshakeNotStarted);
        }

        // Anything past the peer's last handshake packet belongs to the chunk stream
        let taken = data.len().min(self.bytes_needed());
        let buffered = self.buffer.len() + taken;
        if buffered > MAX_HANDSHAKE_BUFFER_SIZE {
            return Err(HandshakeError::HandshakeOverflow { size: buffered });
        }

        self.buffer.extend_from_slice(&data[..taken]);

        let mut response_bytes = Vec::new();
        loop {
            let progressed = match self.state {
                HandshakeState::Uninitialized => self.parse_p0(),
                HandshakeState::VersionSent => self.parse_p1(&mut response_bytes),
                HandshakeState::AckSent => self.parse_p2(),
                HandshakeState::Done => {
                    let mut remaining_bytes = self.buffer.split_off(0);
                    remaining_bytes.extend_from_slice(&data[taken..]);
                    return Ok(HandshakeProcessResult::Completed {
                        response_bytes,
                        remaining_bytes,
                    });
                }
            };

            if !progressed {
                return Ok(HandshakeProcessResult::InProgress { response_bytes });
            }
        }
    }

    fn bytes_needed(&self) -> usize {
        let packets_left = match self.state {
            HandshakeState::Uninitialized => 1 + 2 * HANDSHAKE_PACKET_SIZE,
            HandshakeState::VersionSent => 2 * HANDSHAKE_PACKET_SIZE,
            HandshakeState::AckSent => HANDSHAKE_PACKET_SIZE,
            HandshakeState::Done => 0,
        };

        packets_left.saturating_sub(self.buffer.len())
    }

    fn parse_p0(&mut self) -> bool {
        if self.buffer.is_empty() {
            return false;
        }

        let version = self.buffer.remove(0);
        if version != RTMP_VERSION {
            warn!("Peer requested RTMP version {}, continuing with version {}", version, RTMP_VERSION);
        }

        self.state = HandshakeState::VersionSent;
        true
    }

    fn parse_p1(&mut self, response_bytes: &mut Vec<u8>) -> bool {
        if self.buffer.len() < HANDSHAKE_PACKET_SIZE {
            return false;
        }

        let mut p2: Vec<u8> = self.buffer.drain(..HANDSHAKE_PACKET_SIZE).collect();
        BigEndian::write_u32(&mut p2[0..4], self.current_time());

        if self.peer_type == PeerType::Server {
            response_bytes.extend(self.create_p0_and_p1());
        }

        response_bytes.extend(p2);
        trace!("Received p1, sending p2 acknowledgement");

        self.state = HandshakeState::AckSent;
        true
    }

    fn parse_p2(&mut self) -> bool {
        if self.buffer.len() < HANDSHAKE_PACKET_SIZE {
            return false;
        }

        self.buffer.drain(..HANDSHAKE_PACKET_SIZE);
        self.state = HandshakeState::Done;
        true
    }

    fn create_p0_and_p1(&self) -> Vec<u8> {
        let mut bytes = vec![0_u8; 1 + HANDSHAKE_PACKET_SIZE];
        bytes[0] = RTMP_VERSION;
        BigEndian::write_u32(&mut bytes[1..5], self.my_epoch);
        bytes[9..].copy_from_slice(&self.my_random);
        bytes
    }

    fn current_time(&self) -> u32 {
        // Wraps after ~49 days, which the peer treats as normal timestamp rollover
        self.started_at.elapsed().as_millis() as u32
    }
}
