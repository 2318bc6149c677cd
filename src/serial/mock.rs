// Mock transport for testing without hardware

use crate::proto::chunker::{ByteSource, StreamError, Transport};
use crate::proto::sentence::Sentence;
use std::collections::VecDeque;

/// Mock transport fed with scripted radio responses
///
/// Reads pop scripted chunks in order; writes accumulate in a log the test
/// can inspect. An exhausted script reads as end-of-stream.
#[derive(Default)]
pub struct MockTransport {
    /// Chunks to be delivered to the reader, in order
    read_script: VecDeque<Vec<u8>>,

    /// Everything written by the code under test
    write_log: Vec<u8>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue one raw chunk for delivery
    pub fn push_chunk(&mut self, data: &[u8]) {
        self.read_script.push_back(data.to_vec());
    }

    /// Queue a whole sentence as one chunk
    pub fn push_sentence(&mut self, sentence: &Sentence) {
        self.push_chunk(sentence.encode().as_bytes());
    }

    /// Everything the code under test has written so far
    pub fn written(&self) -> &[u8] {
        &self.write_log
    }

    /// The write log split into CR/LF-terminated lines
    pub fn written_lines(&self) -> Vec<String> {
        String::from_utf8_lossy(&self.write_log)
            .split_inclusive("\r\n")
            .map(|s| s.to_string())
            .collect()
    }

    /// Check whether a byte pattern was written
    pub fn was_written(&self, expected: &[u8]) -> bool {
        self.write_log
            .windows(expected.len())
            .any(|window| window == expected)
    }
}

impl ByteSource for MockTransport {
    async fn recv_chunk(&mut self) -> Result<Option<Vec<u8>>, StreamError> {
        Ok(self.read_script.pop_front())
    }
}

impl Transport for MockTransport {
    async fn send(&mut self, bytes: &[u8]) -> Result<(), StreamError> {
        self.write_log.extend_from_slice(bytes);
        Ok(())
    }
}
