use crate::sessions::MediaHandler;

/// Answer from the application when a client asks to publish or play a stream
#[derive(PartialEq, Eq, Debug, Clone, Copy)]
pub enum PolicyOutcome {
    Accepted,

    /// The stream name is already in use, e.g. someone else is publishing on it
    Occupied,

    Failure,
}

/// Application hooks consulted by a `ServerSession`.
///
/// Calls are made synchronously while input is being processed, so an implementation backed by
/// state shared between connections must answer without waiting on another session.
pub trait ServerSessionHandler: MediaHandler {
    fn on_publish(&mut self, app_name: &str, stream_name: &str) -> PolicyOutcome;
    fn on_play(&mut self, app_name: &str, stream_name: &str) -> PolicyOutcome;
}
