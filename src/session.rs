use crate::analyzer::FaceAnalyzer;
use crate::error::Result;
use crate::handler::RequestHandler;
use crate::protocol::{Request, Response};
use std::io::{Read, Write};
use std::net::{SocketAddr, TcpStream};

const READ_CHUNK_SIZE: usize = 4096;

/// One connected client. The session owns its socket and a private byte
/// buffer; requests are newline-delimited JSON and every complete line is
/// answered with exactly one newline-terminated JSON response, in order.
pub struct Session<A> {
    stream: TcpStream,
    peer: SocketAddr,
    buffer: Vec<u8>,
    handler: RequestHandler<A>,
}

impl<A: FaceAnalyzer> Session<A> {
    pub fn new(stream: TcpStream, peer: SocketAddr, handler: RequestHandler<A>) -> Self {
        Session {
            stream,
            peer,
            buffer: Vec::new(),
            handler,
        }
    }

    /// Serve the connection until the peer closes it or transport fails.
    /// Malformed lines and failed requests are answered on the same
    /// connection; only an I/O failure ends the session early.
    pub fn run(mut self) -> Result<()> {
        let mut chunk = [0u8; READ_CHUNK_SIZE];
        loop {
            let n = self.stream.read(&mut chunk)?;
            if n == 0 {
                tracing::info!("Client {} disconnected", self.peer);
                return Ok(());
            }
            self.buffer.extend_from_slice(&chunk[..n]);

            // Frame on raw bytes so a request split across reads, even mid
            // UTF-8 sequence, reassembles intact. A trailing partial line
            // stays buffered for the next read.
            while let Some(pos) = self.buffer.iter().position(|&b| b == b'\n') {
                let mut line: Vec<u8> = self.buffer.drain(..=pos).collect();
                line.pop();
                let response = self.process_line(&line);
                self.send(&response)?;
            }
        }
    }

    fn process_line(&self, line: &[u8]) -> Response {
        let request: Request = match serde_json::from_slice(line) {
            Ok(request) => request,
            Err(e) => return Response::error(format!("Invalid JSON: {}", e)),
        };

        tracing::debug!("Request from {}: action={:?}", self.peer, request.action);
        match self.handler.handle(&request) {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!("Request from {} failed: {}", self.peer, e);
                Response::error(format!("Processing error: {}", e))
            }
        }
    }

    fn send(&mut self, response: &Response) -> Result<()> {
        let mut line = serde_json::to_string(response)?;
        line.push('\n');
        self.stream.write_all(line.as_bytes())?;
        self.stream.flush()?;
        Ok(())
    }
}
