//! Line-delimited transports for the MCP server.
//!
//! Both transports share the same framing:
//!
//! - Messages are UTF-8 encoded JSON-RPC
//! - Messages are delimited by newlines
//! - Messages must not contain embedded newlines
//!
//! [`LineTransport`] implements the framing over any async reader/writer
//! pair. The stdio transport binds it to stdin/stdout (stderr stays free for
//! logging); the TCP transport binds it to the two halves of a socket.

use std::io;

use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;

use crate::mcp::protocol::JsonRpcResponse;

/// A newline-framed message transport.
pub struct LineTransport<R, W> {
    /// Buffered reader for incoming lines.
    reader: BufReader<R>,
    /// Sink for outgoing lines.
    writer: W,
}

/// Transport bound to the process's standard streams.
pub type StdioTransport = LineTransport<tokio::io::Stdin, tokio::io::Stdout>;

/// Transport bound to one accepted TCP connection.
pub type TcpTransport = LineTransport<OwnedReadHalf, OwnedWriteHalf>;

impl StdioTransport {
    /// Creates a transport on stdin/stdout.
    #[must_use]
    pub fn stdio() -> Self {
        Self::new(tokio::io::stdin(), tokio::io::stdout())
    }
}

impl TcpTransport {
    /// Creates a transport on an accepted connection.
    #[must_use]
    pub fn tcp(stream: TcpStream) -> Self {
        let (reader, writer) = stream.into_split();
        Self::new(reader, writer)
    }
}

impl<R, W> LineTransport<R, W>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    /// Creates a transport over `reader` and `writer`.
    pub fn new(reader: R, writer: W) -> Self {
        Self {
            reader: BufReader::new(reader),
            writer,
        }
    }

    /// Reads the next line, without its terminator.
    ///
    /// The line is returned as raw bytes; decoding is left to the caller so
    /// that invalid UTF-8 can be answered instead of ending the session.
    /// Returns `None` at end of input.
    ///
    /// # Errors
    ///
    /// Returns an error if reading fails.
    pub async fn read_line(&mut self) -> io::Result<Option<Vec<u8>>> {
        let mut line = Vec::new();
        let bytes_read = self.reader.read_until(b'\n', &mut line).await?;

        if bytes_read == 0 {
            return Ok(None);
        }

        if line.ends_with(b"\n") {
            line.pop();
            if line.ends_with(b"\r") {
                line.pop();
            }
        }

        Ok(Some(line))
    }

    /// Writes a JSON-RPC response, newline terminated and flushed.
    ///
    /// # Errors
    ///
    /// Returns an error if serialisation or writing fails.
    pub async fn write_response(&mut self, response: &JsonRpcResponse) -> io::Result<()> {
        let json = serde_json::to_string(response)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;

        self.write_raw(&json).await
    }

    /// Writes a raw JSON string with newline termination.
    async fn write_raw(&mut self, json: &str) -> io::Result<()> {
        // Framing: messages must not contain embedded newlines
        debug_assert!(
            !json.contains('\n'),
            "JSON message must not contain embedded newlines"
        );

        self.writer.write_all(json.as_bytes()).await?;
        self.writer.write_all(b"\n").await?;
        self.writer.flush().await?;

        Ok(())
    }

    /// Consumes the transport, returning the writer.
    pub fn into_writer(self) -> W {
        self.writer
    }
}
