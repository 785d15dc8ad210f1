use tracing::trace;

/// Splits a stream of text chunks into newline-terminated lines.
///
/// Each call to [`feed`](Self::feed) returns the lines completed by that
/// chunk, in arrival order; the trailing fragment after the last `\n` stays
/// pending until a later chunk completes it or [`flush`](Self::flush) drains
/// it at end of stream. Returned lines do not include the `\n`; a `\r` before
/// it is kept and left to the consumer (the decoder trims whitespace).
#[derive(Debug, Default, Clone)]
pub struct LineFramer {
    pending: String,
    /// Set by [`discard`](Self::discard); input is dropped up to and
    /// including the next `\n`.
    skipping: bool,
}

impl LineFramer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `chunk` and return every line it completes.
    pub fn feed(&mut self, chunk: &str) -> Vec<String> {
        let mut chunk_rest = chunk;
        if self.skipping {
            match chunk_rest.find('\n') {
                Some(idx) => {
                    self.skipping = false;
                    chunk_rest = &chunk_rest[idx + 1..];
                }
                None => {
                    trace!(chunk_len = chunk.len(), "skipping rest of discarded line");
                    return Vec::new();
                }
            }
        }
        self.pending.push_str(chunk_rest);

        let mut lines = Vec::new();
        let mut start = 0usize;
        for (idx, _) in self.pending.match_indices('\n') {
            lines.push(self.pending[start..idx].to_string());
            start = idx + 1;
        }
        if start > 0 {
            self.pending.drain(..start);
        }

        trace!(
            chunk_len = chunk.len(),
            lines = lines.len(),
            pending = self.pending.len(),
            "fed chunk"
        );
        lines
    }

    /// Take whatever is still pending. Used once the stream has ended.
    pub fn flush(&mut self) -> String {
        std::mem::take(&mut self.pending)
    }

    /// The fragment waiting for its newline.
    pub fn pending(&self) -> &str {
        &self.pending
    }

    /// Drop the pending fragment and the rest of its line.
    ///
    /// Text fed afterwards is thrown away up to and including the next
    /// `\n`, so the tail of a dropped line never surfaces as a line of
    /// its own.
    pub fn discard(&mut self) {
        self.pending.clear();
        self.skipping = true;
    }

    /// Whether input is being dropped until the next newline.
    pub fn is_skipping(&self) -> bool {
        self.skipping
    }
}
