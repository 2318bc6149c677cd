// Live CP-mode device backend
// One command per chunk, each answered by a fixed two-message sequence.
// Any unexpected response type is fatal to the operation.

use super::access::{DeviceAccess, DeviceError, ProgressFn, Result, READY_TIMEOUT};
use crate::memmap::DeviceMemoryMap;
use crate::proto::chunker::{LineReader, Transport};
use crate::proto::sentence::Sentence;
use std::time::Duration;
use tokio::time::timeout;

/// Delay between readiness polls
const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Status code the radio reports when idle
const STATUS_IDLE: &str = "00";

/// A radio reached over the CP-mode serial protocol
pub struct LiveDevice<T: Transport> {
    reader: LineReader<T>,
    map: &'static DeviceMemoryMap,
}

impl<T: Transport> LiveDevice<T> {
    pub fn new(transport: T, map: &'static DeviceMemoryMap) -> Self {
        Self {
            reader: LineReader::new(transport),
            map,
        }
    }

    async fn send(&mut self, sentence: &Sentence) -> Result<()> {
        let wire = sentence.encode();
        tracing::trace!("-> {}", wire.trim_end());
        self.reader.source_mut().send(wire.as_bytes()).await?;
        Ok(())
    }

    async fn recv(&mut self) -> Result<Sentence> {
        let line = self.reader.read_line().await?;
        tracing::trace!("<- {}", line.trim_end());
        Ok(Sentence::parse(&line)?)
    }

    /// Receive one sentence and fail unless it has the expected type
    async fn expect(&mut self, stype: &str) -> Result<Sentence> {
        let sentence = self.recv().await?;
        if sentence.stype != stype {
            return Err(DeviceError::UnexpectedResponse {
                expected: stype.to_string(),
                got: sentence.stype,
            });
        }
        Ok(sentence)
    }

    /// Query the firmware version (#CVRRQ -> #CVRDQ)
    pub async fn firmware_version(&mut self) -> Result<String> {
        self.send(&Sentence::command("CVRRQ", &[])).await?;
        let reply = self.expect("CVRDQ").await?;
        let version = reply
            .args
            .first()
            .cloned()
            .ok_or_else(|| DeviceError::BadPayload("CVRDQ without version".into()))?;
        self.send(&Sentence::command("CMDOK", &[])).await?;
        Ok(version)
    }

    async fn read_chunk(&mut self, addr: u16, len: usize) -> Result<Vec<u8>> {
        let addr_arg = format!("{:04X}", addr);
        let len_arg = format!("{:02X}", len);
        self.send(&Sentence::command("CCMRD", &[&addr_arg, &len_arg]))
            .await?;

        self.expect("CMDOK").await?;
        let data = self.expect("CCMDT").await?;
        // The framing layer reports mismatches; this layer enforces them
        if !data.checksum_ok() {
            return Err(DeviceError::ChecksumMismatch(format!(
                "CCMDT at {:04X}",
                addr
            )));
        }
        if data.args.len() != 3 || data.args[0] != addr_arg || data.args[1] != len_arg {
            return Err(DeviceError::BadPayload(format!(
                "CCMDT echo mismatch at {:04X}: {:?}",
                addr, data.args
            )));
        }

        let bytes = hex_to_bytes(&data.args[2])?;
        if bytes.len() != len {
            return Err(DeviceError::BadPayload(format!(
                "CCMDT carried {} bytes, expected {}",
                bytes.len(),
                len
            )));
        }

        self.send(&Sentence::command("CMDOK", &[])).await?;
        Ok(bytes)
    }

    async fn write_chunk(&mut self, addr: u16, bytes: &[u8]) -> Result<()> {
        let addr_arg = format!("{:04X}", addr);
        let len_arg = format!("{:02X}", bytes.len());
        let data_arg = bytes_to_hex(bytes);
        self.send(&Sentence::command(
            "CCMWR",
            &[&addr_arg, &len_arg, &data_arg],
        ))
        .await?;

        self.expect("CMDOK").await?;
        self.expect("CMDSM").await?;
        Ok(())
    }

    /// One readiness poll round-trip: #CMDSY -> #CSTDQ code, acked with #CMDOK
    async fn poll_status(&mut self) -> Result<String> {
        self.send(&Sentence::command("CMDSY", &[])).await?;
        let status = self.expect("CSTDQ").await?;
        let code = status
            .args
            .first()
            .cloned()
            .ok_or_else(|| DeviceError::BadPayload("CSTDQ without status code".into()))?;
        self.send(&Sentence::command("CMDOK", &[])).await?;
        Ok(code)
    }
}

impl<T: Transport> DeviceAccess for LiveDevice<T> {
    fn memory_map(&self) -> &'static DeviceMemoryMap {
        self.map
    }

    async fn read_memory(
        &mut self,
        addr: u16,
        len: usize,
        progress: Option<&ProgressFn>,
    ) -> Result<Vec<u8>> {
        self.wait_ready(READY_TIMEOUT).await?;

        let chunk_size = self.map.chunk_size;
        let mut data = Vec::with_capacity(len);
        for offset in (0..len).step_by(chunk_size) {
            let size = chunk_size.min(len - offset);
            let chunk = self.read_chunk(addr + offset as u16, size).await?;
            data.extend_from_slice(&chunk);
            if let Some(cb) = progress {
                cb(data.len(), len);
            }
        }
        Ok(data)
    }

    async fn write_memory(
        &mut self,
        addr: u16,
        bytes: &[u8],
        progress: Option<&ProgressFn>,
    ) -> Result<()> {
        self.wait_ready(READY_TIMEOUT).await?;

        let chunk_size = self.map.chunk_size;
        for offset in (0..bytes.len()).step_by(chunk_size) {
            let end = (offset + chunk_size).min(bytes.len());
            self.write_chunk(addr + offset as u16, &bytes[offset..end])
                .await?;
            if let Some(cb) = progress {
                cb(end, bytes.len());
            }
        }
        Ok(())
    }

    async fn wait_ready(&mut self, limit: Duration) -> Result<()> {
        timeout(limit, async {
            loop {
                if self.poll_status().await? == STATUS_IDLE {
                    return Ok(());
                }
                tokio::time::sleep(POLL_INTERVAL).await;
            }
        })
        .await
        .map_err(|_| DeviceError::Timeout(limit))?
    }

    async fn read_gps_log(&mut self, progress: Option<&ProgressFn>) -> Result<Vec<u8>> {
        self.send(&Sentence::nmea("PMTK622", &["1"])).await?;

        let header = self.expect("PMTKLOX").await?;
        if header.args.first().map(String::as_str) != Some("0") {
            return Err(DeviceError::BadPayload(format!(
                "PMTKLOX header: {:?}",
                header.args
            )));
        }
        let total_lines: usize = header
            .args
            .get(1)
            .and_then(|s| s.parse().ok())
            .ok_or_else(|| DeviceError::BadPayload("PMTKLOX header without count".into()))?;

        let mut log = Vec::new();
        loop {
            let sentence = self.expect("PMTKLOX").await?;
            match sentence.args.first().map(String::as_str) {
                Some("1") => {
                    if sentence.args.len() < 2 {
                        return Err(DeviceError::BadPayload("PMTKLOX data without index".into()));
                    }
                    for word in &sentence.args[2..] {
                        log.extend_from_slice(&hex_to_bytes(word)?);
                    }
                    if let Some(cb) = progress {
                        let line: usize =
                            sentence.args[1].parse().map_err(|_| {
                                DeviceError::BadPayload("PMTKLOX line index".into())
                            })?;
                        cb(line + 1, total_lines);
                    }
                }
                Some("2") => break,
                _ => {
                    return Err(DeviceError::BadPayload(format!(
                        "PMTKLOX record: {:?}",
                        sentence.args
                    )))
                }
            }
        }

        // Acknowledge end of transfer
        self.send(&Sentence::nmea("PMTK001", &["622", "3"])).await?;
        Ok(log)
    }
}

fn bytes_to_hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02X}", b)).collect()
}

fn hex_to_bytes(hex: &str) -> Result<Vec<u8>> {
    if hex.len() % 2 != 0 {
        return Err(DeviceError::BadPayload(format!(
            "Odd-length hex payload: {:?}",
            hex
        )));
    }
    (0..hex.len())
        .step_by(2)
        .map(|i| {
            u8::from_str_radix(&hex[i..i + 2], 16)
                .map_err(|_| DeviceError::BadPayload(format!("Bad hex payload: {:?}", hex)))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memmap::{memory_map_for, DeviceModel};
    use crate::serial::MockTransport;

    fn idle_handshake(mock: &mut MockTransport) {
        mock.push_sentence(&Sentence::command("CSTDQ", &["00"]));
    }

    #[tokio::test]
    async fn test_read_memory_two_chunks() {
        let mut mock = MockTransport::new();
        idle_handshake(&mut mock);

        let chunk_a = bytes_to_hex(&[0xAA; 32]);
        let chunk_b = bytes_to_hex(&[0xBB; 8]);
        mock.push_sentence(&Sentence::command("CMDOK", &[]));
        mock.push_sentence(&Sentence::command("CCMDT", &["D700", "20", &chunk_a]));
        mock.push_sentence(&Sentence::command("CMDOK", &[]));
        mock.push_sentence(&Sentence::command("CCMDT", &["D720", "08", &chunk_b]));

        let map = memory_map_for(DeviceModel::Hx890);
        let mut dev = LiveDevice::new(mock, map);
        let data = dev.read_memory(0xD700, 40, None).await.unwrap();

        assert_eq!(data.len(), 40);
        assert_eq!(&data[..32], &[0xAA; 32]);
        assert_eq!(&data[32..], &[0xBB; 8]);

        let mock = dev.reader.source_mut();
        assert!(mock.was_written(b"#CMDSY\r\n"));
        assert!(mock.was_written(b"#CCMRD\tD700\t20"));
        assert!(mock.was_written(b"#CCMRD\tD720\t08"));
    }

    #[tokio::test]
    async fn test_read_rejects_corrupt_checksum() {
        let mut mock = MockTransport::new();
        idle_handshake(&mut mock);
        mock.push_sentence(&Sentence::command("CMDOK", &[]));
        // Valid shape, deliberately wrong checksum
        mock.push_chunk(b"#CCMDT\tD700\t01\tAA\t00\r\n");

        let map = memory_map_for(DeviceModel::Hx890);
        let mut dev = LiveDevice::new(mock, map);
        let err = dev.read_memory(0xD700, 1, None).await.unwrap_err();
        assert!(matches!(err, DeviceError::ChecksumMismatch(_)));
    }

    #[tokio::test]
    async fn test_unexpected_response_is_fatal() {
        let mut mock = MockTransport::new();
        idle_handshake(&mut mock);
        mock.push_sentence(&Sentence::command("CMDER", &[]));

        let map = memory_map_for(DeviceModel::Hx890);
        let mut dev = LiveDevice::new(mock, map);
        let err = dev.read_memory(0x0000, 1, None).await.unwrap_err();
        assert!(matches!(err, DeviceError::UnexpectedResponse { .. }));
    }

    #[tokio::test]
    async fn test_write_memory_sequence() {
        let mut mock = MockTransport::new();
        idle_handshake(&mut mock);
        mock.push_sentence(&Sentence::command("CMDOK", &[]));
        mock.push_sentence(&Sentence::command("CMDSM", &[]));

        let map = memory_map_for(DeviceModel::Hx870);
        let mut dev = LiveDevice::new(mock, map);
        dev.write_memory(0x0040, &[0x01, 0x02], None).await.unwrap();

        let mock = dev.reader.source_mut();
        assert!(mock.was_written(b"#CCMWR\t0040\t02\t0102"));
    }

    #[tokio::test]
    async fn test_wait_ready_polls_until_idle() {
        let mut mock = MockTransport::new();
        mock.push_sentence(&Sentence::command("CSTDQ", &["01"]));
        mock.push_sentence(&Sentence::command("CSTDQ", &["00"]));

        let map = memory_map_for(DeviceModel::Hx870);
        let mut dev = LiveDevice::new(mock, map);
        dev.wait_ready(Duration::from_secs(1)).await.unwrap();

        // One ack per poll
        let lines = dev.reader.source_mut().written_lines();
        assert_eq!(
            lines
                .iter()
                .filter(|l| l.starts_with("#CMDOK"))
                .count(),
            2
        );
    }

    #[tokio::test]
    async fn test_wait_ready_times_out() {
        // Script ends while the device still reports busy
        let mut mock = MockTransport::new();
        mock.push_sentence(&Sentence::command("CSTDQ", &["01"]));

        let map = memory_map_for(DeviceModel::Hx870);
        let mut dev = LiveDevice::new(mock, map);
        let err = dev.wait_ready(Duration::from_millis(100)).await.unwrap_err();
        assert!(matches!(
            err,
            DeviceError::Timeout(_) | DeviceError::Stream(_)
        ));
    }

    #[tokio::test]
    async fn test_gps_log_read() {
        let mut mock = MockTransport::new();
        mock.push_sentence(&Sentence::nmea("PMTKLOX", &["0", "2"]));
        mock.push_sentence(&Sentence::nmea("PMTKLOX", &["1", "0", "01020304", "AABBCCDD"]));
        mock.push_sentence(&Sentence::nmea("PMTKLOX", &["1", "1", "DEADBEEF"]));
        mock.push_sentence(&Sentence::nmea("PMTKLOX", &["2"]));

        let map = memory_map_for(DeviceModel::Hx870);
        let mut dev = LiveDevice::new(mock, map);
        let log = dev.read_gps_log(None).await.unwrap();
        assert_eq!(
            log,
            vec![0x01, 0x02, 0x03, 0x04, 0xAA, 0xBB, 0xCC, 0xDD, 0xDE, 0xAD, 0xBE, 0xEF]
        );

        let mock = dev.reader.source_mut();
        assert!(mock.was_written(b"$PMTK622,1*29\r\n"));
        assert!(mock.was_written(b"$PMTK001,622,3*36\r\n"));
    }

    #[tokio::test]
    async fn test_firmware_version() {
        let mut mock = MockTransport::new();
        mock.push_sentence(&Sentence::command("CVRDQ", &["02.03"]));

        let map = memory_map_for(DeviceModel::Hx890);
        let mut dev = LiveDevice::new(mock, map);
        assert_eq!(dev.firmware_version().await.unwrap(), "02.03");
    }

    #[test]
    fn test_hex_helpers() {
        assert_eq!(bytes_to_hex(&[0x0F, 0xA0]), "0FA0");
        assert_eq!(hex_to_bytes("0FA0").unwrap(), vec![0x0F, 0xA0]);
        assert!(hex_to_bytes("0F0").is_err());
        assert!(hex_to_bytes("ZZ").is_err());
    }
}
