// src/exec/line_reader.rs

//! Line splitting over an async byte stream.

use std::io;

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};

/// Yields the lines of a byte stream one call at a time.
///
/// - Lines are split on `\n`; the terminator (and a `\r` right before it) is
///   stripped.
/// - Trailing bytes without a terminator still come out as a final line.
/// - Bytes are decoded as lossy UTF-8, so engine output in a legacy code page
///   never kills the relay.
///
/// Unlike `tokio::io::Lines` this never fails on invalid UTF-8.
#[derive(Debug)]
pub struct LineReader<R> {
    inner: BufReader<R>,
    buf: Vec<u8>,
}

impl<R: AsyncRead + Unpin> LineReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            inner: BufReader::new(reader),
            buf: Vec::new(),
        }
    }

    /// Read the next line; `Ok(None)` once the stream is drained.
    ///
    /// Cancel safe: bytes consumed by a dropped call stay buffered and are
    /// returned by the next one.
    pub async fn next_line(&mut self) -> io::Result<Option<String>> {
        let n = self.inner.read_until(b'\n', &mut self.buf).await?;
        if n == 0 && self.buf.is_empty() {
            return Ok(None);
        }

        let mut line = std::mem::take(&mut self.buf);
        if line.last() == Some(&b'\n') {
            line.pop();
            if line.last() == Some(&b'\r') {
                line.pop();
            }
        }

        Ok(Some(String::from_utf8_lossy(&line).into_owned()))
    }
}
