use thiserror::Error;

#[derive(Debug, Error)]
pub enum HandshakeError {
    #[error("Handshake buffered {size} bytes without completing, more than the allowed maximum")]
    HandshakeOverflow { size: usize },

    #[error("Bytes were received after the handshake already completed")]
    HandshakeAlreadyCompleted,

    #[error("Only client handshakes send the first packets")]
    OutboundP0AndP1NotAllowed,

    #[error("The outbound p0 and p1 packets were already generated")]
    OutboundP0AndP1AlreadyGenerated,

    #[error("Client handshake received bytes before the outbound p0 and p1 packets were generated")]
    ClientHandshakeNotStarted,
}
