//! Privileged-context host speaking JSON lines
//!
//! Each input line is a `SCAN_TEXT` request and gets exactly one response
//! line. Lines that do not parse are answered with a pass-through response
//! carrying the parse error.

use std::sync::Arc;

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tracing::{debug, info, warn};

use crate::bridge::ScanBackend;
use crate::protocol::{ScanRequest, ScanResponse};

pub async fn run_stdio(backend: Arc<dyn ScanBackend>) -> anyhow::Result<()> {
    info!("scan host listening on stdin");
    let stdin = BufReader::new(tokio::io::stdin());
    let stdout = tokio::io::stdout();
    serve(backend, stdin, stdout).await
}

pub async fn serve<R, W>(backend: Arc<dyn ScanBackend>, mut reader: R, mut writer: W) -> anyhow::Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut buf = Vec::new();

    loop {
        buf.clear();
        if reader.read_until(b'\n', &mut buf).await? == 0 {
            break;
        }

        let request = String::from_utf8(std::mem::take(&mut buf))
            .map_err(|e| e.to_string())
            .and_then(|line| {
                if line.trim().is_empty() {
                    Ok(None)
                } else {
                    serde_json::from_str::<ScanRequest>(&line)
                        .map(Some)
                        .map_err(|e| e.to_string())
                }
            });

        let response = match request {
            Ok(None) => continue,
            Ok(Some(ScanRequest::ScanText { text })) => {
                debug!(chars = text.chars().count(), "scan request");
                backend.scan_text(&text).await
            }
            Err(e) => {
                warn!("Malformed request: {}", e);
                ScanResponse::fail_open("", format!("Parse error: {}", e))
            }
        };

        let output = serde_json::to_string(&response)?;
        writer.write_all(output.as_bytes()).await?;
        writer.write_all(b"\n").await?;
        writer.flush().await?;
    }

    Ok(())
}
