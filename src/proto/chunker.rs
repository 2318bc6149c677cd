// Line/length-oriented reader over a chunked byte source
// The transport delivers arbitrarily sized chunks; callers want exact
// lengths or whole lines.

use std::collections::VecDeque;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StreamError {
    /// The underlying stream ended while a caller was waiting for data
    #[error("Stream is done")]
    Done,

    #[error("Transport error: {0}")]
    Transport(String),
}

pub type Result<T> = std::result::Result<T, StreamError>;

/// A source of raw byte chunks (serial port, mock transport, ...)
pub trait ByteSource {
    /// Deliver the next chunk, or None once the stream has ended
    async fn recv_chunk(&mut self) -> Result<Option<Vec<u8>>>;
}

/// A bidirectional chunked transport
pub trait Transport: ByteSource {
    /// Send raw bytes down the channel
    async fn send(&mut self, bytes: &[u8]) -> Result<()>;
}

/// Buffers an incoming chunk stream and serves exact-length or line reads
///
/// Unconsumed bytes from a delivered chunk stay buffered for the next call.
pub struct LineReader<S: ByteSource> {
    source: S,
    buffer: VecDeque<u8>,
    done: bool,
}

impl<S: ByteSource> LineReader<S> {
    pub fn new(source: S) -> Self {
        Self {
            source,
            buffer: VecDeque::new(),
            done: false,
        }
    }

    /// Read exactly `n` bytes, pulling chunks as needed
    pub async fn read_exact(&mut self, n: usize) -> Result<Vec<u8>> {
        while self.buffer.len() < n {
            self.pull().await?;
        }
        Ok(self.buffer.drain(..n).collect())
    }

    /// Read up to and including the next newline
    pub async fn read_line(&mut self) -> Result<String> {
        loop {
            if let Some(pos) = self.buffer.iter().position(|&b| b == b'\n') {
                let line: Vec<u8> = self.buffer.drain(..=pos).collect();
                return Ok(String::from_utf8_lossy(&line).into_owned());
            }
            self.pull().await?;
        }
    }

    /// Number of bytes currently buffered
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    /// Access the underlying source, e.g. to send on a bidirectional transport
    pub fn source_mut(&mut self) -> &mut S {
        &mut self.source
    }

    async fn pull(&mut self) -> Result<()> {
        if self.done {
            return Err(StreamError::Done);
        }
        match self.source.recv_chunk().await? {
            Some(chunk) => {
                self.buffer.extend(chunk);
                Ok(())
            }
            None => {
                self.done = true;
                Err(StreamError::Done)
            }
        }
    }
}
