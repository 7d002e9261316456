//! Client configuration and tuning knobs.

use std::time::Duration;

use chunk_vault::state::MAX_CHUNK_BYTES;

use crate::error::{Result, VaultClientError};

/// Tuning for upload and retrieval. Defaults match the dispatch cadence the
/// broadcast endpoint tolerates; chunk size must stay within the program's
/// hard cap.
#[derive(Debug, Clone)]
pub struct VaultConfig {
    /// Chunk size in bytes, `1..=900`.
    pub chunk_size: usize,
    /// Chunks per group in the batched-parallel strategy.
    pub batch_size: usize,
    /// Delay between submissions inside one batch, preserving relative order.
    pub batch_stagger: Duration,
    /// Delay between submissions in the sequential strategy.
    pub sequential_delay: Duration,
    /// Status-poll interval for the confirmation tracker.
    pub confirm_interval: Duration,
    /// Wall-clock budget per confirmation pass.
    pub confirm_timeout: Duration,
    /// Total dispatch rounds: the initial round plus bounded retries.
    pub dispatch_rounds: u32,
    /// Metadata re-fetch attempts on the read path.
    pub metadata_retries: u32,
    /// Backoff between metadata re-fetches.
    pub metadata_retry_delay: Duration,
}

impl VaultConfig {
    pub fn new(chunk_size: usize) -> Result<Self> {
        if chunk_size == 0 || chunk_size > MAX_CHUNK_BYTES {
            return Err(VaultClientError::InvalidInput(format!(
                "chunk size {chunk_size} outside 1..={MAX_CHUNK_BYTES}"
            )));
        }
        Ok(Self {
            chunk_size,
            ..Self::default()
        })
    }
}

impl Default for VaultConfig {
    fn default() -> Self {
        Self {
            chunk_size: 675,
            batch_size: 5,
            batch_stagger: Duration::from_millis(50),
            sequential_delay: Duration::from_millis(200),
            confirm_interval: Duration::from_millis(700),
            confirm_timeout: Duration::from_secs(30),
            dispatch_rounds: 3,
            metadata_retries: 5,
            metadata_retry_delay: Duration::from_secs(2),
        }
    }
}
