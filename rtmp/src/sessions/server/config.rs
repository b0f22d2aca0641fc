/// The configuration options that govern how a RTMP server session should operate
#[derive(Clone, Debug)]
pub struct ServerSessionConfig {
    pub fms_version: String,

    /// Outbound chunk size announced to the client once it connects
    pub chunk_size: u32,
    pub peer_bandwidth: u32,

    /// Acknowledgement window sent to the client, also used for our own acknowledgements until
    /// the client announces its own window
    pub window_ack_size: u32,

    /// Hand audio and video to the handler chunk by chunk instead of as whole frames
    pub deliver_media_fragments: bool,
}

impl ServerSessionConfig {
    /// Creates a new server session config with overridable defaults
    pub fn new() -> ServerSessionConfig {
        ServerSessionConfig {
            fms_version: "FMS/3,5,5,2004".to_string(),
            chunk_size: 60000,
            peer_bandwidth: 2_500_000,
            window_ack_size: 2_500_000,
            deliver_media_fragments: false,
        }
    }
}

impl Default for ServerSessionConfig {
    fn default() -> Self {
        ServerSessionConfig::new()
    }
}
