use std::str;

const REPLACEMENT: char = '\u{FFFD}';

/// An incremental UTF-8 decoder.
///
/// Bytes can be fed in arbitrary pieces. A multi-byte sequence cut by a
/// chunk boundary is held back until the rest of it arrives, invalid
/// sequences are replaced with U+FFFD.
#[derive(Debug, Default)]
pub struct Utf8Decoder {
    pending: Vec<u8>,
}

impl Utf8Decoder {
    /// Decodes `bytes` and appends the text to `out`.
    pub fn decode(&mut self, bytes: &[u8], out: &mut String) {
        self.pending.extend_from_slice(bytes);

        let mut consumed = 0;
        while consumed < self.pending.len() {
            let rest = &self.pending[consumed..];
            match str::from_utf8(rest) {
                Ok(text) => {
                    out.push_str(text);
                    consumed = self.pending.len();
                }
                Err(err) => {
                    let (valid, _) = rest.split_at(err.valid_up_to());
                    if let Ok(text) = str::from_utf8(valid) {
                        out.push_str(text);
                    }
                    match err.error_len() {
                        Some(len) => {
                            out.push(REPLACEMENT);
                            consumed += err.valid_up_to() + len;
                        }
                        None => {
                            // Incomplete sequence at the end, wait for more.
                            consumed += err.valid_up_to();
                            break;
                        }
                    }
                }
            }
        }
        self.pending.drain(..consumed);
    }

    /// Flushes the decoder at the end of input.
    ///
    /// A dangling incomplete sequence is emitted as U+FFFD.
    pub fn finish(&mut self, out: &mut String) {
        if !self.pending.is_empty() {
            self.pending.clear();
            out.push(REPLACEMENT);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode_all(pieces: &[&[u8]]) -> String {
        let mut decoder = Utf8Decoder::default();
        let mut out = String::new();
        for piece in pieces {
            decoder.decode(piece, &mut out);
        }
        decoder.finish(&mut out);
        out
    }

    #[test]
    fn test_split_multi_byte() {
        let text = "héllo, 世界 🦀";
        let bytes = text.as_bytes();
        // Cut at every position, including inside each character.
        for at in 0..=bytes.len() {
            let (head, tail) = bytes.split_at(at);
            assert_eq!(decode_all(&[head, tail]), text);
        }
        let single_bytes: Vec<&[u8]> = bytes.chunks(1).collect();
        assert_eq!(decode_all(&single_bytes), text);
    }

    #[test]
    fn test_invalid_bytes() {
        assert_eq!(decode_all(&[b"a\xFFb"]), "a\u{FFFD}b");
        assert_eq!(decode_all(&[b"ok", b"\xE4\xB8"]), "ok\u{FFFD}");
    }
}
