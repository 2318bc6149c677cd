// Batch reader/writer: coalesce many named address ranges into one
// sequential transfer with a single aggregate progress callback.

use super::access::{DeviceAccess, ProgressFn, Result};
use std::collections::HashMap;
use std::sync::Arc;

/// Key identifying one named region of device memory
pub type RangeId = String;

/// Accumulates read requests, then transfers them in insertion order
#[derive(Default)]
pub struct BatchReader {
    requests: Vec<(RangeId, u16, usize)>,
}

impl BatchReader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a read of `len` bytes at `addr` under `id`
    pub fn request(&mut self, id: impl Into<RangeId>, addr: u16, len: usize) {
        self.requests.push((id.into(), addr, len));
    }

    /// Drop all pending requests; results already returned are unaffected
    pub fn reset(&mut self) {
        self.requests.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.requests.is_empty()
    }

    /// Execute all pending reads sequentially
    ///
    /// Progress reports fraction-of-total-bytes across all ranges. Ranges
    /// never requested are absent from the result, not empty.
    pub async fn run<A: DeviceAccess>(
        &mut self,
        device: &mut A,
        progress: Option<ProgressFn>,
    ) -> Result<HashMap<RangeId, Vec<u8>>> {
        let total: usize = self.requests.iter().map(|(_, _, len)| len).sum();
        let mut results = HashMap::new();
        let mut done = 0usize;

        for (id, addr, len) in self.requests.drain(..) {
            tracing::debug!("batch read {:?}: {:#06X}+{}", id, addr, len);
            let sub = progress.as_ref().map(|cb| {
                let cb = Arc::clone(cb);
                let base = done;
                Arc::new(move |chunk_done: usize, _chunk_total: usize| {
                    cb(base + chunk_done, total)
                }) as ProgressFn
            });
            let bytes = device.read_memory(addr, len, sub.as_ref()).await?;
            done += len;
            results.insert(id, bytes);
        }
        Ok(results)
    }
}

/// Accumulates write requests, then transfers them in insertion order
#[derive(Default)]
pub struct BatchWriter {
    requests: Vec<(RangeId, u16, Vec<u8>)>,
}

impl BatchWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a write of `bytes` at `addr` under `id`
    pub fn request(&mut self, id: impl Into<RangeId>, addr: u16, bytes: Vec<u8>) {
        self.requests.push((id.into(), addr, bytes));
    }

    /// Drop all pending requests
    pub fn reset(&mut self) {
        self.requests.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.requests.is_empty()
    }

    /// Total bytes queued
    pub fn pending_bytes(&self) -> usize {
        self.requests.iter().map(|(_, _, b)| b.len()).sum()
    }

    /// Execute all pending writes sequentially
    pub async fn run<A: DeviceAccess>(
        &mut self,
        device: &mut A,
        progress: Option<ProgressFn>,
    ) -> Result<()> {
        let total = self.pending_bytes();
        let mut done = 0usize;

        for (id, addr, bytes) in self.requests.drain(..) {
            tracing::debug!("batch write {:?}: {:#06X}+{}", id, addr, bytes.len());
            let sub = progress.as_ref().map(|cb| {
                let cb = Arc::clone(cb);
                let base = done;
                Arc::new(move |chunk_done: usize, _chunk_total: usize| {
                    cb(base + chunk_done, total)
                }) as ProgressFn
            });
            let len = bytes.len();
            device.write_memory(addr, &bytes, sub.as_ref()).await?;
            done += len;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::access::{DeviceAccess, DeviceError, ProgressFn};
    use crate::memmap::{memory_map_for, DeviceMemoryMap, DeviceModel};
    use std::sync::Mutex;
    use std::time::Duration;

    /// Minimal backend over a plain byte vector
    struct VecBackend {
        data: Vec<u8>,
    }

    impl DeviceAccess for VecBackend {
        fn memory_map(&self) -> &'static DeviceMemoryMap {
            memory_map_for(DeviceModel::Hx870)
        }

        async fn read_memory(
            &mut self,
            addr: u16,
            len: usize,
            progress: Option<&ProgressFn>,
        ) -> std::result::Result<Vec<u8>, DeviceError> {
            if let Some(cb) = progress {
                cb(len, len);
            }
            Ok(self.data[addr as usize..addr as usize + len].to_vec())
        }

        async fn write_memory(
            &mut self,
            addr: u16,
            bytes: &[u8],
            progress: Option<&ProgressFn>,
        ) -> std::result::Result<(), DeviceError> {
            self.data[addr as usize..addr as usize + bytes.len()].copy_from_slice(bytes);
            if let Some(cb) = progress {
                cb(bytes.len(), bytes.len());
            }
            Ok(())
        }

        async fn wait_ready(&mut self, _t: Duration) -> std::result::Result<(), DeviceError> {
            Ok(())
        }

        async fn read_gps_log(
            &mut self,
            _p: Option<&ProgressFn>,
        ) -> std::result::Result<Vec<u8>, DeviceError> {
            Ok(Vec::new())
        }
    }

    #[tokio::test]
    async fn test_reader_returns_exact_ranges() {
        let mut backend = VecBackend {
            data: (0u8..10).collect(),
        };
        let mut reader = BatchReader::new();
        reader.request("a", 2, 2);
        reader.request("b", 5, 2);

        let results = reader.run(&mut backend, None).await.unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results["a"], vec![2, 3]);
        assert_eq!(results["b"], vec![5, 6]);
        // Unrequested ids are absent, not empty
        assert!(!results.contains_key("c"));
    }

    #[tokio::test]
    async fn test_reader_aggregate_progress() {
        let mut backend = VecBackend {
            data: vec![0; 64],
        };
        let mut reader = BatchReader::new();
        reader.request("x", 0, 16);
        reader.request("y", 16, 48);

        let seen: Arc<Mutex<Vec<(usize, usize)>>> = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let cb: ProgressFn = Arc::new(move |done, total| {
            sink.lock().unwrap().push((done, total));
        });

        reader.run(&mut backend, Some(cb)).await.unwrap();
        let seen = seen.lock().unwrap();
        // Fractions are of the grand total, not per range
        assert_eq!(*seen, vec![(16, 64), (64, 64)]);
    }

    #[tokio::test]
    async fn test_reset_clears_pending() {
        let mut backend = VecBackend {
            data: vec![0; 16],
        };
        let mut reader = BatchReader::new();
        reader.request("a", 0, 4);
        reader.reset();
        assert!(reader.is_empty());

        let results = reader.run(&mut backend, None).await.unwrap();
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn test_writer_visits_in_insertion_order() {
        let mut backend = VecBackend {
            data: vec![0; 8],
        };
        let mut writer = BatchWriter::new();
        // Overlapping ranges: later insertion wins
        writer.request("first", 0, vec![1, 1, 1, 1]);
        writer.request("second", 2, vec![9, 9]);

        writer.run(&mut backend, None).await.unwrap();
        assert_eq!(backend.data[..6], [1, 1, 9, 9, 0, 0]);
    }
}
