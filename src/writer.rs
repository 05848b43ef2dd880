//! The non-blocking HTTP writer contract (spec §6, §4.6) and its concrete
//! realization over a real `tokio::net::TcpStream`.
//!
//! The spec's `tryEnd`/`getWriteOffset`/`onWritable`/`write`/`cork`/
//! `onAborted` contract (uWebSockets.js's writer) maps directly onto
//! `TcpStream::try_write` / `TcpStream::writable().await` /
//! `TcpStream::poll_peek`, which is genuine non-blocking backpressure and
//! disconnect detection rather than a simulation of either — see
//! SPEC_FULL.md §4.6.R.

use std::io;

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;

/// Capabilities THE CORE needs from the embedding HTTP server (spec §6).
#[async_trait]
pub trait HttpWriter: Send {
    fn write_status(&mut self, code: u16, reason: &str);
    fn write_header(&mut self, name: &str, value: &str);

    /// Batches header writes; no partial header emission is observable
    /// externally (spec glossary: "cork").
    async fn cork_flush(&mut self) -> io::Result<()>;

    /// Known-total path (spec §4.6.A). Returns `(ok, done)`: `ok` is false
    /// when the chunk (or its remainder) could not be fully accepted this
    /// call — the caller must pause and await `writable()` before retrying
    /// with the unconsumed suffix; `done` is true once `total` bytes have
    /// been accepted.
    fn try_end(&mut self, chunk: &[u8], total: u64) -> io::Result<(bool, bool)>;

    /// Unknown-total path (spec §4.6.B), used behind a streaming compressor.
    fn write_chunk(&mut self, chunk: &[u8]) -> io::Result<bool>;

    /// Cumulative bytes accepted into the kernel send buffer so far — the
    /// `lastOffset` bookkeeping in spec §9's Design Notes is this value,
    /// snapshotted by the pump before each `try_end`/`write_chunk` call.
    fn get_write_offset(&self) -> u64;

    /// Resolves when the socket has send-buffer space again (spec's
    /// `onWritable`, mapped to a future per Design Notes §9).
    async fn writable(&self) -> io::Result<()>;

    /// Finalizes the response. Idempotent from the caller's perspective —
    /// the dispatcher never calls it twice for one request.
    async fn end(&mut self) -> io::Result<()>;

    /// Non-blocking probe for a client disconnect (spec's `onAborted`).
    /// Checked by the stream pump between chunks so a closed connection
    /// doesn't keep a long transfer running. Test doubles that never see a
    /// real socket can rely on the default (never aborted).
    fn poll_aborted(&mut self) -> bool {
        false
    }
}

/// Concrete `HttpWriter` over a raw `TcpStream`, grounded on the teacher's
/// `send_precompiled_response` (`write_all` + `flush`) for the cork path,
/// extended with `try_write`/`writable` for the body pump.
pub struct TcpWriter<'a> {
    stream: &'a mut TcpStream,
    header_buf: Vec<u8>,
    status_written: bool,
    write_offset: u64,
}

impl<'a> TcpWriter<'a> {
    pub fn new(stream: &'a mut TcpStream) -> Self {
        Self {
            stream,
            header_buf: Vec::with_capacity(256),
            status_written: false,
            write_offset: 0,
        }
    }
}

#[async_trait]
impl<'a> HttpWriter for TcpWriter<'a> {
    fn write_status(&mut self, code: u16, reason: &str) {
        self.header_buf
            .extend_from_slice(format!("HTTP/1.1 {code} {reason}\r\n").as_bytes());
        self.status_written = true;
    }

    fn write_header(&mut self, name: &str, value: &str) {
        self.header_buf
            .extend_from_slice(format!("{name}: {value}\r\n").as_bytes());
    }

    async fn cork_flush(&mut self) -> io::Result<()> {
        if !self.status_written {
            self.write_status(200, "OK");
        }
        self.header_buf.extend_from_slice(b"\r\n");
        let buf = std::mem::take(&mut self.header_buf);
        self.stream.write_all(&buf).await?;
        Ok(())
    }

    fn try_end(&mut self, chunk: &[u8], total: u64) -> io::Result<(bool, bool)> {
        match self.stream.try_write(chunk) {
            Ok(n) => {
                self.write_offset += n as u64;
                let done = self.write_offset >= total;
                Ok((n == chunk.len(), done))
            }
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => Ok((false, false)),
            Err(e) => Err(e),
        }
    }

    fn write_chunk(&mut self, chunk: &[u8]) -> io::Result<bool> {
        match self.stream.try_write(chunk) {
            Ok(n) => {
                self.write_offset += n as u64;
                Ok(n == chunk.len())
            }
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => Ok(false),
            Err(e) => Err(e),
        }
    }

    fn get_write_offset(&self) -> u64 {
        self.write_offset
    }

    async fn writable(&self) -> io::Result<()> {
        self.stream.writable().await
    }

    async fn end(&mut self) -> io::Result<()> {
        self.stream.flush().await
    }

    /// Peeks (`MSG_PEEK`, via `poll_peek`) the read side without consuming
    /// any bytes — pipelined request data must stay in the socket buffer
    /// for the next read. `Ok(0)` is a clean EOF (peer closed); a read
    /// error is treated the same as a disconnect (e.g. `ECONNRESET`).
    fn poll_aborted(&mut self) -> bool {
        let mut probe = [0u8; 1];
        let mut read_buf = tokio::io::ReadBuf::new(&mut probe);
        let waker = futures::task::noop_waker();
        let mut cx = std::task::Context::from_waker(&waker);
        match self.stream.poll_peek(&mut cx, &mut read_buf) {
            std::task::Poll::Ready(Ok(0)) => true,
            std::task::Poll::Ready(Ok(_)) => false,
            std::task::Poll::Ready(Err(_)) => true,
            std::task::Poll::Pending => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::{TcpListener, TcpStream};

    async fn connected_pair() -> (TcpStream, TcpStream) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let client = TcpStream::connect(addr).await.unwrap();
        let (server, _) = listener.accept().await.unwrap();
        (server, client)
    }

    #[tokio::test]
    async fn cork_flush_writes_headers_then_blank_line() {
        let (mut server, mut client) = connected_pair().await;
        {
            let mut writer = TcpWriter::new(&mut server);
            writer.write_status(200, "OK");
            writer.write_header("Content-Length", "5");
            writer.cork_flush().await.unwrap();
        }
        use tokio::io::AsyncReadExt;
        let mut buf = vec![0u8; 256];
        let n = client.read(&mut buf).await.unwrap();
        let text = String::from_utf8_lossy(&buf[..n]);
        assert!(text.starts_with("HTTP/1.1 200 OK\r\n"));
        assert!(text.contains("Content-Length: 5\r\n"));
        assert!(text.ends_with("\r\n\r\n"));
    }

    #[tokio::test]
    async fn try_end_reports_done_once_total_reached() {
        let (mut server, mut client) = connected_pair().await;
        let mut writer = TcpWriter::new(&mut server);
        let (ok, done) = writer.try_end(b"hello", 5).unwrap();
        assert!(ok);
        assert!(done);
        assert_eq!(writer.get_write_offset(), 5);

        use tokio::io::AsyncReadExt;
        let mut buf = [0u8; 5];
        client.read_exact(&mut buf).await.unwrap();
        assert_eq!(&buf, b"hello");
    }

    #[tokio::test]
    async fn poll_aborted_is_false_while_connection_is_open() {
        let (mut server, _client) = connected_pair().await;
        let mut writer = TcpWriter::new(&mut server);
        assert!(!writer.poll_aborted());
    }

    #[tokio::test]
    async fn poll_aborted_is_true_once_peer_closes() {
        let (mut server, client) = connected_pair().await;
        drop(client);
        let mut writer = TcpWriter::new(&mut server);
        // Closing is asynchronous from the peer's perspective; poll until
        // the FIN has actually arrived rather than racing it.
        let mut aborted = false;
        for _ in 0..50 {
            if writer.poll_aborted() {
                aborted = true;
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
        assert!(aborted);
    }

    #[tokio::test]
    async fn poll_aborted_does_not_consume_pipelined_bytes() {
        let (mut server, mut client) = connected_pair().await;
        client.write_all(b"next request bytes").await.unwrap();
        client.flush().await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        {
            let mut writer = TcpWriter::new(&mut server);
            // Data is pending, not EOF — must not be reported as aborted.
            assert!(!writer.poll_aborted());
        }
        // Peek must not have consumed it — still readable afterward.
        use tokio::io::AsyncReadExt;
        let mut buf = vec![0u8; "next request bytes".len()];
        server.read_exact(&mut buf).await.unwrap();
        assert_eq!(&buf, b"next request bytes");
    }
}
