//! Raw and decoded packet dumps for debugging
//!
//! Writes go through tokio's file API so turning dumps on cannot add
//! blocking syscalls to the receive path it is observing.

use std::path::Path;

pub(crate) async fn write_raw(dir: &Path, sequence: u16, data: &[u8]) {
    if let Err(e) = tokio::fs::write(dir.join(format!("raw_{sequence}")), data).await {
        tracing::warn!(sequence, "raw dump failed: {e}");
    }
}

pub(crate) async fn write_pcm(dir: &Path, sequence: u16, data: &[u8]) {
    if let Err(e) = tokio::fs::write(dir.join(format!("pcm_{sequence}")), data).await {
        tracing::warn!(sequence, "pcm dump failed: {e}");
    }
}
