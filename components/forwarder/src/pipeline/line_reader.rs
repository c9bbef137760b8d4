//! Newline framing for the network sink.
//!
//! The fan-out side hands each sink raw stdin chunks with arbitrary
//! boundaries. `LineReader` stitches them back into `\n`-terminated lines.
//! A trailing fragment with no newline at end-of-stream is dropped, never
//! returned.

// External crates
use bytes::Bytes;
use std::io;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::sync::mpsc;
use tokio_stream::{StreamExt, wrappers::ReceiverStream};
use tokio_util::io::StreamReader;

const LINE_DELIMITER: u8 = b'\n';

/// Adapt a chunk channel into a byte reader. Closing the sender is EOF.
pub fn channel_reader(rx: mpsc::Receiver<Bytes>) -> impl AsyncRead + Send + Unpin {
    StreamReader::new(ReceiverStream::new(rx).map(Ok::<_, io::Error>))
}

#[derive(Debug)]
pub struct LineReader<R> {
    reader: BufReader<R>,
    dropped_partial: usize,
}

impl<R> LineReader<R>
where
    R: AsyncRead + Unpin,
{
    pub fn new(reader: R) -> Self {
        Self {
            reader: BufReader::new(reader),
            dropped_partial: 0,
        }
    }

    /// Next complete line, newline included. `None` at end-of-stream.
    pub async fn next_line(&mut self) -> io::Result<Option<Vec<u8>>> {
        let mut line = Vec::new();
        let n = self.reader.read_until(LINE_DELIMITER, &mut line).await?;

        if n == 0 {
            return Ok(None);
        }

        if line.last() != Some(&LINE_DELIMITER) {
            // read_until only stops short of the delimiter at EOF
            self.dropped_partial += line.len();
            tracing::debug!(
                dropped_bytes = line.len(),
                "Dropping unterminated trailing line at end of input"
            );
            return Ok(None);
        }

        Ok(Some(line))
    }

    /// Read and throw away everything left, returning the byte count.
    pub async fn discard_rest(&mut self) -> io::Result<u64> {
        tokio::io::copy_buf(&mut self.reader, &mut tokio::io::sink()).await
    }

    /// Bytes of the unterminated trailing line, if one was seen.
    pub fn dropped_partial(&self) -> usize {
        self.dropped_partial
    }
}
