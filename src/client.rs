use crate::error::{FaceServiceError, Result};
use crate::protocol::{Request, Response};
use std::io::{BufRead, BufReader, Write};
use std::net::{TcpStream, ToSocketAddrs};
use std::time::Duration;

/// Blocking client for the face service. The connection persists across
/// calls; each call sends one request line and reads one response line.
pub struct FaceClient {
    stream: TcpStream,
    reader: BufReader<TcpStream>,
}

impl FaceClient {
    pub fn connect(addr: impl ToSocketAddrs) -> Result<Self> {
        let stream = TcpStream::connect(addr)?;
        stream.set_read_timeout(Some(Duration::from_secs(120)))?;
        stream.set_write_timeout(Some(Duration::from_secs(10)))?;
        let reader = BufReader::new(stream.try_clone()?);
        Ok(FaceClient { stream, reader })
    }

    pub fn check_face(&mut self, image_b64: impl Into<String>) -> Result<Response> {
        self.round_trip(&Request::check_face(image_b64))
    }

    pub fn compare_faces(
        &mut self,
        image_b64: impl Into<String>,
        db_image_path: impl Into<String>,
    ) -> Result<Response> {
        self.round_trip(&Request::compare_faces(image_b64, db_image_path))
    }

    pub fn round_trip(&mut self, request: &Request) -> Result<Response> {
        let mut line = serde_json::to_string(request)?;
        line.push('\n');
        self.stream.write_all(line.as_bytes())?;
        self.stream.flush()?;

        let mut response_line = String::new();
        let n = self.reader.read_line(&mut response_line)?;
        if n == 0 {
            return Err(FaceServiceError::Other(anyhow::anyhow!(
                "Connection closed before a response arrived"
            )));
        }
        Ok(serde_json::from_str(&response_line)?)
    }
}
