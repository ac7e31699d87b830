//! Native messaging: each message is a u32 length in native byte order
//! followed by that many bytes of UTF-8 JSON.

use async_trait::async_trait;
use serde_json::Value;
use std::process::Stdio;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::process::Command;

use crate::error::{Result, VdError};

/// Largest reply accepted from the verifier.
pub const MAX_FRAME_BYTES: u32 = 1024 * 1024;

/// One request/response exchange with the verifier.
#[async_trait]
pub trait VerifierTransport: Send + Sync {
    async fn exchange(&self, message: Value) -> Result<Value>;
}

/// Length-prefixed frame for `message`.
pub fn encode_frame(message: &Value) -> Result<Vec<u8>> {
    let body = serde_json::to_vec(message).map_err(|e| VdError::Verifier(e.to_string()))?;
    let len = u32::try_from(body.len())
        .map_err(|_| VdError::Verifier(format!("message of {} bytes too large", body.len())))?;
    let mut frame = Vec::with_capacity(4 + body.len());
    frame.extend_from_slice(&len.to_ne_bytes());
    frame.extend_from_slice(&body);
    Ok(frame)
}

pub async fn write_frame<W: AsyncWrite + Unpin>(writer: &mut W, message: &Value) -> Result<()> {
    let frame = encode_frame(message)?;
    writer
        .write_all(&frame)
        .await
        .map_err(|e| VdError::Verifier(format!("write request: {e}")))?;
    writer
        .flush()
        .await
        .map_err(|e| VdError::Verifier(format!("write request: {e}")))
}

pub async fn read_frame<R: AsyncRead + Unpin>(reader: &mut R) -> Result<Value> {
    let mut len = [0u8; 4];
    reader
        .read_exact(&mut len)
        .await
        .map_err(|e| VdError::Verifier(format!("read reply length: {e}")))?;
    let len = u32::from_ne_bytes(len);
    if len > MAX_FRAME_BYTES {
        return Err(VdError::Protocol(format!(
            "reply of {len} bytes exceeds {MAX_FRAME_BYTES}"
        )));
    }
    let mut body = vec![0u8; len as usize];
    reader
        .read_exact(&mut body)
        .await
        .map_err(|e| VdError::Verifier(format!("read reply: {e}")))?;
    serde_json::from_slice(&body).map_err(|e| VdError::Protocol(format!("reply is not JSON: {e}")))
}

/// Verifier run as a child process, one process per message.
#[derive(Debug, Clone)]
pub struct NativeMessagingProcess {
    program: String,
    args: Vec<String>,
}

impl NativeMessagingProcess {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }
}

#[async_trait]
impl VerifierTransport for NativeMessagingProcess {
    async fn exchange(&self, message: Value) -> Result<Value> {
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| VdError::Verifier(format!("spawn {}: {e}", self.program)))?;

        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| VdError::Verifier("verifier stdin unavailable".to_string()))?;
        let mut stdout = child
            .stdout
            .take()
            .ok_or_else(|| VdError::Verifier("verifier stdout unavailable".to_string()))?;

        write_frame(&mut stdin, &message).await?;
        drop(stdin);
        let reply = read_frame(&mut stdout).await?;

        match child.wait().await {
            Ok(status) if !status.success() => {
                tracing::debug!("{} exited with {}", self.program, status);
            }
            Ok(_) => {}
            Err(e) => tracing::debug!("waiting for {}: {}", self.program, e),
        }
        Ok(reply)
    }
}
