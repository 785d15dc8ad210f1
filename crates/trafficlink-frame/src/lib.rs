//! Newline-delimited text framing for the traffic-light device link.
//!
//! The device and host exchange one ASCII message per line. This crate turns
//! an arbitrary sequence of byte chunks into complete lines and back:
//! - [`LineFramer`] splits decoded text on `\n` and keeps the trailing fragment
//! - [`Utf8ChunkDecoder`] decodes bytes without tearing multi-byte characters
//! - [`LineReader`] / [`LineWriter`] drive both over any `Read` / `Write`
//!
//! With the `async` feature, [`LineCodec`] offers the same framing as a
//! `tokio_util` codec.

#[cfg(feature = "async")]
pub mod codec;
pub mod config;
pub mod decode;
pub mod error;
pub mod framer;
pub mod reader;
pub mod writer;

#[cfg(feature = "async")]
pub use codec::LineCodec;
pub use config::{LineConfig, DEFAULT_MAX_LINE_LEN};
pub use decode::Utf8ChunkDecoder;
pub use error::{FrameError, Result};
pub use framer::LineFramer;
pub use reader::LineReader;
pub use writer::LineWriter;
