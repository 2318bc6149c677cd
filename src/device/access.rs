// Memory access abstraction
// Everything above this seam works the same against a live radio or a
// captured memory image, which is what makes format-level testing possible
// without hardware.

use crate::memmap::{DeviceMemoryMap, ImageError};
use crate::proto::chunker::StreamError;
use crate::proto::sentence::SentenceError;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DeviceError {
    #[error("Stream error: {0}")]
    Stream(#[from] StreamError),

    #[error("Sentence error: {0}")]
    Sentence(#[from] SentenceError),

    #[error("Timeout after {0:?}")]
    Timeout(Duration),

    #[error("Unexpected response: expected {expected}, got {got}")]
    UnexpectedResponse { expected: String, got: String },

    #[error("Checksum mismatch in {0}")]
    ChecksumMismatch(String),

    #[error("Malformed payload: {0}")]
    BadPayload(String),

    #[error("Image error: {0}")]
    Image(#[from] ImageError),

    #[error("Operation not supported by this backend: {0}")]
    Unsupported(&'static str),
}

pub type Result<T> = std::result::Result<T, DeviceError>;

/// Progress callback: (bytes_done, bytes_total)
pub type ProgressFn = Arc<dyn Fn(usize, usize) + Send + Sync>;

/// Default composite timeout for readiness waits
pub const READY_TIMEOUT: Duration = Duration::from_millis(1000);

/// Chunked access to device configuration memory
pub trait DeviceAccess {
    /// The memory map of the model behind this backend
    fn memory_map(&self) -> &'static DeviceMemoryMap;

    /// Read `len` bytes starting at `addr`
    async fn read_memory(
        &mut self,
        addr: u16,
        len: usize,
        progress: Option<&ProgressFn>,
    ) -> Result<Vec<u8>>;

    /// Write bytes starting at `addr`
    async fn write_memory(
        &mut self,
        addr: u16,
        bytes: &[u8],
        progress: Option<&ProgressFn>,
    ) -> Result<()>;

    /// Block until the device reports idle, or time out
    async fn wait_ready(&mut self, timeout: Duration) -> Result<()>;

    /// Stream the GPS log out of the device
    async fn read_gps_log(&mut self, progress: Option<&ProgressFn>) -> Result<Vec<u8>>;
}
