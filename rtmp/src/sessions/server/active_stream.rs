#[derive(PartialEq, Debug, Clone)]
pub enum StreamState {
    Created,
    Publishing { stream_name: String },
    Playing { stream_name: String },
}

/// A message stream handed out by `createStream`
#[derive(Debug)]
pub struct ActiveStream {
    pub current_state: StreamState,
}

impl ActiveStream {
    pub fn new() -> ActiveStream {
        ActiveStream {
            current_state: StreamState::Created,
        }
    }

    pub fn is_publishing(&self) -> bool {
        match self.current_state {
            StreamState::Publishing { .. } => true,
            _ => false,
        }
    }
}
