//! Archive decoding for artifact payloads
//!
//! Archive artifacts arrive as gzip-compressed tar streams. Decoding yields the data of
//! every entry concatenated in archive order, without entry names or separators.

mod tgz;

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests;

pub use tgz::decode_tgz;

use crate::error::DecodeError;
use tokio::task::spawn_blocking;
use tracing::debug;

/// Decode a `.tgz` payload without blocking the async runtime
///
/// # Example
/// ```no_run
/// # async fn example(body: Vec<u8>) -> Result<(), jobwatch::error::DecodeError> {
/// let text = jobwatch::extraction::decode_archive(body).await?;
/// println!("{}", text);
/// # Ok(())
/// # }
/// ```
pub async fn decode_archive(bytes: Vec<u8>) -> Result<String, DecodeError> {
    let compressed_len = bytes.len();

    let text = spawn_blocking(move || decode_tgz(&bytes))
        .await
        .map_err(|e| DecodeError::TaskFailed(format!("decode task panicked: {}", e)))??;

    debug!(
        compressed_len,
        decoded_len = text.len(),
        "decoded archive payload"
    );
    Ok(text)
}
