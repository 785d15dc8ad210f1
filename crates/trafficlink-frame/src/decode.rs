/// Incremental, lossy UTF-8 decoder for byte chunks.
///
/// Serial reads split wherever the driver returns, which can land inside a
/// multi-byte character. An incomplete sequence at the end of a chunk is held
/// back and completed by the next chunk; invalid sequences decode to U+FFFD.
#[derive(Debug, Default, Clone)]
pub struct Utf8ChunkDecoder {
    carry: Vec<u8>,
}

impl Utf8ChunkDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode `bytes`, returning all text that is complete so far.
    pub fn decode(&mut self, bytes: &[u8]) -> String {
        self.carry.extend_from_slice(bytes);

        let mut out = String::with_capacity(self.carry.len());
        let mut input: &[u8] = &self.carry;
        loop {
            match std::str::from_utf8(input) {
                Ok(text) => {
                    out.push_str(text);
                    input = &[];
                    break;
                }
                Err(err) => {
                    let valid = err.valid_up_to();
                    out.push_str(&String::from_utf8_lossy(&input[..valid]));
                    match err.error_len() {
                        Some(bad) => {
                            out.push(char::REPLACEMENT_CHARACTER);
                            input = &input[valid + bad..];
                        }
                        None => {
                            input = &input[valid..];
                            break;
                        }
                    }
                }
            }
        }

        let tail = input.to_vec();
        self.carry = tail;
        out
    }

    /// End of stream: a held incomplete sequence becomes U+FFFD.
    pub fn finish(&mut self) -> String {
        if self.carry.is_empty() {
            return String::new();
        }
        self.carry.clear();
        char::REPLACEMENT_CHARACTER.to_string()
    }

    /// Bytes held back waiting for the rest of a character.
    pub fn held(&self) -> usize {
        self.carry.len()
    }
}
