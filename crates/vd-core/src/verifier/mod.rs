//! Bridge to the external verifier.
//!
//! vd does no cryptography itself: a ready record is serialized into a
//! `VerifierRequest`, exchanged over a `VerifierTransport` and the reply is
//! turned into a `VerificationReport`.

mod message;
mod transport;
mod verdict;

use std::sync::Arc;

use crate::error::{Result, VdError};

pub use message::{
    Outcome, SignedData, VerifierReply, VerifierRequest, VersionReply, VersionRequest,
};
pub use transport::{
    encode_frame, read_frame, write_frame, NativeMessagingProcess, VerifierTransport,
    MAX_FRAME_BYTES,
};
pub use verdict::{classify, render, VerificationReport, Verdict};

#[derive(Clone)]
pub struct VerifierBridge {
    transport: Arc<dyn VerifierTransport>,
}

impl VerifierBridge {
    pub fn new(transport: Arc<dyn VerifierTransport>) -> Self {
        Self { transport }
    }

    /// Sends `request` and decodes the verdict.
    pub async fn verify(&self, request: &VerifierRequest) -> Result<VerificationReport> {
        let message =
            serde_json::to_value(request).map_err(|e| VdError::Verifier(e.to_string()))?;
        tracing::debug!("sending {} to verifier", message);
        let response = self.transport.exchange(message).await?;
        tracing::info!("verifier responded: {}", response);
        let reply: VerifierReply = serde_json::from_value(response.clone())
            .map_err(|_| VdError::Protocol(response.to_string()))?;
        VerificationReport::from_reply(reply, &request.input_file)
    }

    /// Version handshake; errors unless the verifier names its version.
    pub async fn version(&self) -> Result<String> {
        let message = serde_json::to_value(VersionRequest::default())
            .map_err(|e| VdError::Verifier(e.to_string()))?;
        let response = self.transport.exchange(message).await?;
        let reply: VersionReply = serde_json::from_value(response.clone())
            .map_err(|_| VdError::Protocol(response.to_string()))?;
        reply
            .version
            .ok_or_else(|| VdError::Protocol(response.to_string()))
    }
}

impl std::fmt::Debug for VerifierBridge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VerifierBridge").finish_non_exhaustive()
    }
}
