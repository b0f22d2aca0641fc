#[derive(PartialEq, Eq, Debug, Clone, Copy)]
pub enum SessionState {
    /// Handshake done or in progress, no `connect` yet
    Started,
    Connected,

    /// A fatal error or rejected request ended the session
    Closed,
}
