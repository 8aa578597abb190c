use serde_json::Value;

/// Incremental parser for SSE text streams.
///
/// Bytes are fed in arbitrary chunks; a JSON record is emitted only once its
/// segment has been terminated by a blank line. Multi-byte UTF-8 sequences and
/// `\r\n` pairs split across chunks decode the same as when fed whole.
#[derive(Debug, Default)]
pub struct SseDecoder {
    buffer: String,
    undecoded: Vec<u8>,
}

impl SseDecoder {
    /// Feed arbitrary bytes into the decoder and drain complete records.
    pub fn feed(&mut self, bytes: &[u8]) -> Vec<Value> {
        self.push_utf8(bytes);
        if self.buffer.contains('\r') {
            self.buffer = self.buffer.replace("\r\n", "\n");
        }

        let mut records = Vec::new();
        while let Some(split) = self.buffer.find("\n\n") {
            let segment = self.buffer[..split].to_string();
            self.buffer.drain(0..split + 2);

            let Some(payload) = extract_data_payload(&segment) else {
                continue;
            };
            if payload == "[DONE]" {
                continue;
            }

            match serde_json::from_str::<Value>(&payload) {
                Ok(value) => records.push(value),
                Err(error) => {
                    tracing::warn!(%error, payload = %payload, "skipping malformed SSE data");
                }
            }
        }

        records
    }

    /// Parse a complete SSE payload string in one shot.
    pub fn parse_frames(input: &str) -> Vec<Value> {
        let mut decoder = Self::default();
        decoder.feed(input.as_bytes())
    }

    pub fn is_empty_buffer(&self) -> bool {
        self.buffer.trim().is_empty() && self.undecoded.is_empty()
    }

    fn push_utf8(&mut self, bytes: &[u8]) {
        self.undecoded.extend_from_slice(bytes);

        loop {
            match std::str::from_utf8(&self.undecoded) {
                Ok(text) => {
                    self.buffer.push_str(text);
                    self.undecoded.clear();
                    return;
                }
                Err(error) => {
                    let valid = error.valid_up_to();
                    self.buffer
                        .push_str(std::str::from_utf8(&self.undecoded[..valid]).unwrap_or_default());
                    match error.error_len() {
                        Some(invalid) => {
                            self.buffer.push(char::REPLACEMENT_CHARACTER);
                            self.undecoded.drain(..valid + invalid);
                        }
                        // Incomplete sequence at the end: wait for the next chunk.
                        None => {
                            self.undecoded.drain(..valid);
                            return;
                        }
                    }
                }
            }
        }
    }
}

fn extract_data_payload(segment: &str) -> Option<String> {
    let data_lines: Vec<&str> = segment
        .lines()
        .filter_map(|line| line.strip_prefix("data:"))
        .map(|value| value.trim())
        .filter(|value| !value.is_empty())
        .collect();

    if data_lines.is_empty() {
        None
    } else {
        Some(data_lines.join("\n"))
    }
}
