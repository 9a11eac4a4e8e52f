// SPDX-License-Identifier: MIT

//! Content-Length framed JSON-RPC codec.
//!
//! Wire format: `Content-Length: <bytes>\r\n\r\n<payload>`. The decoder is
//! a pure byte-buffer state machine so it can be driven by whatever reads
//! the stream; encoding is a single allocation. Lengths are byte counts,
//! never character counts.

/// Incremental decoder for framed messages.
///
/// Feed raw bytes with [`FrameDecoder::extend`], then drain complete
/// payloads with [`FrameDecoder::next_frame`] until it returns `None`.
/// A header block without `Content-Length` is skipped; an incomplete
/// header or body leaves the buffer untouched until more bytes arrive.
#[derive(Debug, Default)]
pub struct FrameDecoder {
    buf: Vec<u8>,
}

const DELIMITER: &[u8] = b"\r\n\r\n";

impl FrameDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn extend(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    /// Discard everything buffered. Used when a session is torn down.
    pub fn clear(&mut self) {
        self.buf.clear();
    }

    pub fn next_frame(&mut self) -> Option<Vec<u8>> {
        loop {
            let header_end = find_delimiter(&self.buf)?;
            let header = &self.buf[..header_end];

            let Some(length) = content_length(header) else {
                // Header block with no Content-Length: skip past it and
                // keep scanning.
                self.buf.drain(..header_end + DELIMITER.len());
                continue;
            };

            let body_start = header_end + DELIMITER.len();
            if self.buf.len() < body_start + length {
                return None;
            }

            let body = self.buf[body_start..body_start + length].to_vec();
            self.buf.drain(..body_start + length);
            return Some(body);
        }
    }
}

fn find_delimiter(buf: &[u8]) -> Option<usize> {
    buf.windows(DELIMITER.len()).position(|w| w == DELIMITER)
}

/// Parse `Content-Length: N` out of a header block, case-insensitively.
fn content_length(header: &[u8]) -> Option<usize> {
    let text = std::str::from_utf8(header).ok()?;
    for line in text.split("\r\n") {
        let Some((name, value)) = line.split_once(':') else {
            continue;
        };
        if name.trim().eq_ignore_ascii_case("content-length") {
            return value.trim().parse().ok();
        }
    }
    None
}

/// Frame an outgoing JSON-RPC message.
pub fn encode_frame(message: &serde_json::Value) -> Vec<u8> {
    let payload = message.to_string();
    let mut out = Vec::with_capacity(payload.len() + 32);
    out.extend_from_slice(format!("Content-Length: {}\r\n\r\n", payload.len()).as_bytes());
    out.extend_from_slice(payload.as_bytes());
    out
}

#[cfg(test)]
#[path = "transport_tests.rs"]
mod tests;
