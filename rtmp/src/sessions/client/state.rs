/// Where the client is in the connect, create stream and play sequence
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ClientState {
    /// Waiting on the server's half of the handshake
    Handshaking,

    /// The `connect` request was sent and we are waiting for the result
    Connecting,

    CreatingStream,

    /// Playback has been requested on the stream and we are still waiting for a response
    PlayRequested { stream_id: u32 },

    /// We are currently playing back a stream from the server
    Playing { stream_id: u32 },

    /// A fatal error or rejected request ended the session
    Closed,
}

impl ClientState {
    /// The stream the server allocated for us, once one exists
    pub fn stream_id(&self) -> Option<u32> {
        match *self {
            ClientState::PlayRequested { stream_id } => Some(stream_id),
            ClientState::Playing { stream_id } => Some(stream_id),
            _ => None,
        }
    }
}
