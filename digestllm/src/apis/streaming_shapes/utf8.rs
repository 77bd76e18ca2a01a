use std::char::REPLACEMENT_CHARACTER;

/// Incremental UTF-8 decoder for chunked response bodies.
///
/// Network reads do not respect character boundaries, so a multi-byte
/// character may arrive split over two chunks. Complete characters are
/// returned immediately; an incomplete trailing sequence is held back and
/// prefixed to the next chunk.
#[derive(Debug, Default)]
pub struct Utf8StreamDecoder {
    pending: Vec<u8>,
}

impl Utf8StreamDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode a chunk, returning all characters that are now complete.
    ///
    /// Invalid sequences are replaced with U+FFFD rather than failing the
    /// stream.
    pub fn decode(&mut self, bytes: &[u8]) -> String {
        let mut input = std::mem::take(&mut self.pending);
        input.extend_from_slice(bytes);

        let mut decoded = String::with_capacity(input.len());
        let mut rest: &[u8] = &input;

        loop {
            match std::str::from_utf8(rest) {
                Ok(valid) => {
                    decoded.push_str(valid);
                    break;
                }
                Err(err) => {
                    let valid_up_to = err.valid_up_to();
                    if let Ok(valid) = std::str::from_utf8(&rest[..valid_up_to]) {
                        decoded.push_str(valid);
                    }
                    match err.error_len() {
                        Some(invalid_len) => {
                            decoded.push(REPLACEMENT_CHARACTER);
                            rest = &rest[valid_up_to + invalid_len..];
                        }
                        None => {
                            // truncated sequence at the end of the chunk
                            self.pending = rest[valid_up_to..].to_vec();
                            break;
                        }
                    }
                }
            }
        }

        decoded
    }

    /// Flush at end of input. A sequence still incomplete when the body
    /// closes can never be completed and decodes to a single U+FFFD.
    pub fn finish(&mut self) -> String {
        if self.pending.is_empty() {
            return String::new();
        }
        self.pending.clear();
        REPLACEMENT_CHARACTER.to_string()
    }

    /// Number of bytes held back waiting for the rest of a character.
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }
}
