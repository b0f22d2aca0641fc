/// Tracks bytes received from the peer so acknowledgements can be sent once enough arrive.
///
/// An acknowledgement is due once more than half of the window has been received since the last
/// one.  It carries the total number of bytes received over the life of the connection, which
/// wraps at 2<sup>32</sup>.
#[derive(Debug, Clone)]
pub struct ReceiveWindow {
    window_size: u32,
    total_received: u32,
    since_last_ack: u64,
}

impl ReceiveWindow {
    pub fn new(window_size: u32) -> ReceiveWindow {
        ReceiveWindow {
            window_size,
            total_received: 0,
            since_last_ack: 0,
        }
    }

    pub fn window_size(&self) -> u32 {
        self.window_size
    }

    /// Replaces the window, usually after the peer announced one with a
    /// `WindowAcknowledgement` message
    pub fn set_window_size(&mut self, window_size: u32) {
        self.window_size = window_size;
    }

    pub fn total_received(&self) -> u32 {
        self.total_received
    }

    pub fn record_received(&mut self, byte_count: usize) {
        self.total_received = self.total_received.wrapping_add(byte_count as u32);
        self.since_last_ack += byte_count as u64;
    }

    /// Returns the sequence number to acknowledge if an acknowledgement is due, and resets the
    /// count towards the next one.
    pub fn take_acknowledgement(&mut self) -> Option<u32> {
        if self.since_last_ack > (self.window_size / 2) as u64 {
            self.since_last_ack = 0;
            Some(self.total_received)
        } else {
            None
        }
    }
}
