/// Configuration options that govern how a RTMP client session should operate
#[derive(Clone, Debug)]
pub struct ClientSessionConfig {
    pub flash_version: String,

    /// Buffer length announced to the server once playback is requested
    pub playback_buffer_length_ms: u32,

    /// Bytes the server may send before we acknowledge them, until the server announces its own
    /// window
    pub window_ack_size: u32,

    /// Hand audio and video to the media handler chunk by chunk instead of as whole frames
    pub deliver_media_fragments: bool,
}

impl ClientSessionConfig {
    /// Creates a new configuration object with default values
    pub fn new() -> ClientSessionConfig {
        ClientSessionConfig {
            flash_version: "LNX 9,0,124,2".to_string(),
            playback_buffer_length_ms: 2_000,
            window_ack_size: 2_500_000,
            deliver_media_fragments: false,
        }
    }
}

impl Default for ClientSessionConfig {
    fn default() -> Self {
        ClientSessionConfig::new()
    }
}
