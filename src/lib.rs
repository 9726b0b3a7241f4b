// Core modules
pub mod analyzer;
pub mod client;
pub mod config;
pub mod detector;
pub mod error;
pub mod handler;
pub mod preprocess;
pub mod protocol;
pub mod recognizer;
pub mod server;
pub mod session;

// Re-export commonly used types
pub use analyzer::{face_distance, Encoding, FaceAnalyzer, OnnxFaceAnalyzer};
pub use client::FaceClient;
pub use config::Config;
pub use error::{FaceServiceError, Result};
pub use protocol::{Request, Response, Status};
pub use server::Server;
