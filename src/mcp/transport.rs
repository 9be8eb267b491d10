//! Newline-delimited JSON transport.
//!
//! Each message is one line of UTF-8 JSON. Reading and writing are split so
//! the writer can live on its own task while the server keeps reading.

use serde::Serialize;
use tokio::io::{
    self, AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader, Stdin, Stdout,
};

/// Reads one message per line.
pub struct LineReader<R> {
    reader: R,
    buf: String,
}

impl<R: AsyncBufRead + Unpin> LineReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            buf: String::new(),
        }
    }

    /// Next line without its terminator, or `None` at end of input.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying read fails or the line is not UTF-8.
    pub async fn read_line(&mut self) -> std::io::Result<Option<String>> {
        self.buf.clear();
        if self.reader.read_line(&mut self.buf).await? == 0 {
            return Ok(None);
        }
        Ok(Some(self.buf.trim_end_matches(['\r', '\n']).to_string()))
    }
}

/// Writes one message per line, flushing after each.
pub struct LineWriter<W> {
    writer: W,
}

impl<W: AsyncWrite + Unpin> LineWriter<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    /// Serialize `message` and write it as a single line.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or the write fails.
    pub async fn write_message<T: Serialize>(&mut self, message: &T) -> std::io::Result<()> {
        let mut line = serde_json::to_vec(message).map_err(std::io::Error::other)?;
        line.push(b'\n');
        self.writer.write_all(&line).await?;
        self.writer.flush().await
    }
}

/// Reader and writer bound to the process's stdin and stdout.
pub type StdioTransport = (LineReader<BufReader<Stdin>>, LineWriter<Stdout>);

/// Open the stdio transport. Logs must go to stderr while this is in use.
#[must_use]
pub fn stdio() -> StdioTransport {
    (
        LineReader::new(BufReader::new(io::stdin())),
        LineWriter::new(io::stdout()),
    )
}
