//! Incremental UTF-8 decoding of streamed chunks.
//!
//! Chunk boundaries do not line up with character boundaries. The assembler
//! holds back the bytes of a character that is split across two chunks and
//! prepends them to the next one, so a split character is never emitted as
//! replacement characters.

/// Upper bound on the bytes of one UTF-8 encoded character.
const MAX_CHAR_LEN: usize = 4;

/// Stateful decoder turning a sequence of byte chunks into text increments.
///
/// One assembler serves exactly one streaming cycle; create a new one for
/// every cycle so no state leaks between them.
#[derive(Debug, Default)]
pub struct ChunkAssembler {
    /// Trailing bytes of an incomplete character from the previous chunk.
    pending: Vec<u8>,
    /// Total bytes consumed, for logging.
    bytes_seen: usize,
}

impl ChunkAssembler {
    /// Create an assembler with empty decoder state.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode one chunk and return the text it completes.
    ///
    /// Bytes that start a character which is not finished by the end of the
    /// chunk are kept back. Bytes that can never form valid UTF-8 decode to
    /// U+FFFD, one per invalid sequence.
    pub fn decode(&mut self, chunk: &[u8]) -> String {
        self.bytes_seen += chunk.len();

        let mut input = std::mem::take(&mut self.pending);
        input.extend_from_slice(chunk);

        let mut out = String::with_capacity(input.len());
        let mut rest = input.as_slice();

        loop {
            match std::str::from_utf8(rest) {
                Ok(valid) => {
                    out.push_str(valid);
                    break;
                }
                Err(err) => {
                    let (valid, after) = rest.split_at(err.valid_up_to());
                    // `valid_up_to` guarantees this prefix is well formed.
                    out.push_str(&String::from_utf8_lossy(valid));

                    if let Some(invalid_len) = err.error_len() {
                        out.push(char::REPLACEMENT_CHARACTER);
                        rest = &after[invalid_len..];
                    } else {
                        // Incomplete character at the end of input.
                        debug_assert!(after.len() < MAX_CHAR_LEN);
                        self.pending.extend_from_slice(after);
                        break;
                    }
                }
            }
        }

        out
    }

    /// Flush the decoder at end of stream.
    ///
    /// A character still incomplete when the stream ends can never be
    /// completed, so it becomes a single U+FFFD.
    pub fn finish(&mut self) -> Option<String> {
        if self.pending.is_empty() {
            None
        } else {
            self.pending.clear();
            Some(char::REPLACEMENT_CHARACTER.to_string())
        }
    }

    /// Whether bytes of an incomplete character are being held back.
    #[must_use]
    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }

    /// Total bytes fed through [`decode`](Self::decode).
    #[must_use]
    pub const fn bytes_seen(&self) -> usize {
        self.bytes_seen
    }
}
