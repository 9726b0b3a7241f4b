use crate::analyzer::FaceAnalyzer;
use crate::error::{FaceServiceError, Result};
use crate::handler::RequestHandler;
use crate::session::Session;
use std::net::{SocketAddr, TcpListener, ToSocketAddrs};
use std::sync::Arc;
use std::thread;

pub struct Server<A> {
    listener: TcpListener,
    handler: RequestHandler<A>,
}

impl<A: FaceAnalyzer + 'static> Server<A> {
    pub fn bind(addr: impl ToSocketAddrs, analyzer: Arc<A>, tolerance: f32) -> Result<Self> {
        let listener = TcpListener::bind(addr)?;
        Ok(Server {
            listener,
            handler: RequestHandler::new(analyzer, tolerance),
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Accept connections forever, one thread per client, no cap. Sessions
    /// fail independently; the listener only logs and moves on.
    pub fn run(self) -> Result<()> {
        tracing::info!("Listening on {}", self.listener.local_addr()?);

        for stream in self.listener.incoming() {
            match stream {
                Ok(stream) => {
                    let peer = match stream.peer_addr() {
                        Ok(peer) => peer,
                        Err(e) => {
                            tracing::error!("Connection error: {}", e);
                            continue;
                        }
                    };
                    tracing::info!("Client {} connected", peer);

                    let session = Session::new(stream, peer, self.handler.clone());
                    thread::spawn(move || match session.run() {
                        Ok(()) => {}
                        Err(FaceServiceError::Io(ref e))
                            if e.kind() == std::io::ErrorKind::ConnectionReset =>
                        {
                            // Forcible client close is business as usual
                            tracing::info!("Client {} reset the connection", peer);
                        }
                        Err(e) => tracing::error!("Session with {} failed: {}", peer, e),
                    });
                }
                Err(e) => {
                    tracing::error!("Connection error: {}", e);
                }
            }
        }

        Ok(())
    }
}
