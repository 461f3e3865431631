// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Raw TCP print client (JetDirect style, usually port 9100).
//
// Open a socket, write the whole document, close. No protocol negotiation and
// no job feedback; the printer must understand the bytes natively. A failure
// anywhere aborts the copy; there is no partial resend.

use std::time::Duration;

use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tracing::{debug, info, instrument};

use printprobe_core::error::{ProbeError, Result};
use printprobe_core::types::TcpEndpoint;

/// Send document bytes to a raw-socket printer.
///
/// `timeout` bounds the connect and, separately, the write of the full
/// payload.
#[instrument(skip(document_bytes), fields(addr = %endpoint, total = document_bytes.len()))]
pub async fn send_raw(
    endpoint: &TcpEndpoint,
    document_bytes: &[u8],
    timeout: Duration,
) -> Result<()> {
    let addr = (endpoint.host.as_str(), endpoint.port);
    info!("connecting via raw TCP");

    let mut stream = tokio::time::timeout(timeout, TcpStream::connect(addr))
        .await
        .map_err(|_| {
            ProbeError::Transport(format!(
                "raw TCP connection to {} timed out after {}s",
                endpoint,
                timeout.as_secs()
            ))
        })?
        .map_err(|e| ProbeError::Transport(format!("raw TCP connect to {endpoint}: {e}")))?;

    tokio::time::timeout(timeout, async {
        stream.write_all(document_bytes).await?;
        stream.flush().await?;
        stream.shutdown().await
    })
    .await
    .map_err(|_| {
        ProbeError::Transport(format!(
            "raw TCP send to {} timed out after {}s",
            endpoint,
            timeout.as_secs()
        ))
    })?
    .map_err(|e| ProbeError::Transport(format!("raw TCP send to {endpoint}: {e}")))?;

    debug!("raw TCP payload flushed");
    Ok(())
}
