const LINE_DELIMITER: u8 = b'\n';

/// Bytes received from the transport that have not yet been resolved into
/// frames.
///
/// Data is kept as raw bytes so that a multi-byte character split across two
/// reads is reassembled before decoding. After [`drain_lines`](Self::drain_lines)
/// the buffer never contains a line delimiter.
#[derive(Debug, Default)]
pub struct PendingBuffer {
    bytes: Vec<u8>,
    /// Prefix of `bytes` already searched and known to hold no delimiter.
    scanned: usize,
}

impl PendingBuffer {
    pub fn new() -> Self {
        Self {
            bytes: Vec::with_capacity(1024),
            scanned: 0,
        }
    }

    pub fn push(&mut self, chunk: &[u8]) {
        self.bytes.extend_from_slice(chunk);
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Removes every newline-terminated line, in order, leaving the trailing
    /// unterminated fragment in place. Delimiters (and a preceding `\r`) are
    /// stripped.
    pub fn drain_lines(&mut self) -> Vec<String> {
        let mut lines = Vec::new();
        let mut start = 0;
        let mut search_from = self.scanned;

        while let Some(offset) = self.bytes[search_from..]
            .iter()
            .position(|byte| *byte == LINE_DELIMITER)
        {
            let end = search_from + offset;
            let line = &self.bytes[start..end];
            let line = line.strip_suffix(b"\r").unwrap_or(line);
            lines.push(String::from_utf8_lossy(line).into_owned());
            start = end + 1;
            search_from = start;
        }

        self.bytes.drain(..start);
        self.scanned = self.bytes.len();
        lines
    }

    /// Removes and returns all text that can be decoded so far. An incomplete
    /// UTF-8 sequence at the end stays buffered until the rest arrives.
    pub fn take_text(&mut self) -> String {
        let complete = self.bytes.len() - incomplete_utf8_tail(&self.bytes);
        let text = String::from_utf8_lossy(&self.bytes[..complete]).into_owned();
        self.bytes.drain(..complete);
        self.scanned = self.scanned.saturating_sub(complete);
        text
    }

    /// Empties the buffer, returning whatever was left.
    pub fn take_remainder(&mut self) -> String {
        let text = String::from_utf8_lossy(&self.bytes).into_owned();
        self.bytes.clear();
        self.scanned = 0;
        text
    }
}

/// Length of a truncated multi-byte sequence at the end of `bytes`, or 0.
fn incomplete_utf8_tail(bytes: &[u8]) -> usize {
    for back in 1..=bytes.len().min(4) {
        let byte = bytes[bytes.len() - back];
        if byte & 0b1100_0000 == 0b1000_0000 {
            continue;
        }
        let width = match byte {
            0xC0..=0xDF => 2,
            0xE0..=0xEF => 3,
            0xF0..=0xF7 => 4,
            _ => 1,
        };
        return if width > back { back } else { 0 };
    }
    0
}
