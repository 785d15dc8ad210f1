use std::collections::VecDeque;

use bytes::{BufMut, BytesMut};
use tokio_util::codec::{Decoder, Encoder};
use tracing::warn;

use crate::config::DEFAULT_MAX_LINE_LEN;
use crate::decode::Utf8ChunkDecoder;
use crate::error::FrameError;
use crate::framer::LineFramer;

/// `tokio_util` codec with the same framing as [`LineReader`](crate::LineReader)
/// and [`LineWriter`](crate::LineWriter).
///
/// Decoded items are lines without their `\n`. An oversized partial line is
/// dropped with a warning rather than failing the stream, since a decoder
/// error ends a `FramedRead`.
#[derive(Debug)]
pub struct LineCodec {
    decoder: Utf8ChunkDecoder,
    framer: LineFramer,
    ready: VecDeque<String>,
    max_line_len: usize,
}

impl LineCodec {
    pub fn new() -> Self {
        Self::with_max_line_len(DEFAULT_MAX_LINE_LEN)
    }

    pub fn with_max_line_len(max_line_len: usize) -> Self {
        Self {
            decoder: Utf8ChunkDecoder::new(),
            framer: LineFramer::new(),
            ready: VecDeque::new(),
            max_line_len,
        }
    }
}

impl Default for LineCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder for LineCodec {
    type Item = String;
    type Error = FrameError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<String>, FrameError> {
        if let Some(line) = self.ready.pop_front() {
            return Ok(Some(line));
        }
        if src.is_empty() {
            return Ok(None);
        }

        let chunk = src.split();
        let text = self.decoder.decode(&chunk);
        self.ready.extend(self.framer.feed(&text));

        let pending = self.framer.pending().len();
        if pending > self.max_line_len {
            warn!(
                len = pending,
                max = self.max_line_len,
                "dropping oversized partial line"
            );
            self.framer.discard();
        }

        Ok(self.ready.pop_front())
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<String>, FrameError> {
        if let Some(line) = self.decode(src)? {
            return Ok(Some(line));
        }
        let tail = self.decoder.finish();
        self.framer.feed(&tail);
        let remainder = self.framer.flush();
        if remainder.is_empty() {
            Ok(None)
        } else {
            Ok(Some(remainder))
        }
    }
}

impl Encoder<&str> for LineCodec {
    type Error = FrameError;

    fn encode(&mut self, line: &str, dst: &mut BytesMut) -> Result<(), FrameError> {
        let body = line.strip_suffix('\n').unwrap_or(line);
        if body.len() > self.max_line_len {
            return Err(FrameError::LineTooLong {
                len: body.len(),
                max: self.max_line_len,
            });
        }
        dst.reserve(body.len() + 1);
        dst.put_slice(body.as_bytes());
        dst.put_u8(b'\n');
        Ok(())
    }
}

impl Encoder<String> for LineCodec {
    type Error = FrameError;

    fn encode(&mut self, line: String, dst: &mut BytesMut) -> Result<(), FrameError> {
        Encoder::<&str>::encode(self, line.as_str(), dst)
    }
}
