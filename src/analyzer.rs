use crate::config::Config;
use crate::detector::FaceDetector;
use crate::error::Result;
use crate::recognizer::FaceRecognizer;
use image::RgbImage;

pub type Encoding = Vec<f32>;

/// Euclidean distance between two face encodings. Encodings of different
/// lengths come from different models and never match.
pub fn face_distance(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return f32::INFINITY;
    }
    a.iter()
        .zip(b)
        .map(|(x, y)| (x - y) * (x - y))
        .sum::<f32>()
        .sqrt()
}

/// Face analysis backend. One instance is shared across all session
/// threads, so implementations must be usable through `&self`.
pub trait FaceAnalyzer: Send + Sync {
    /// One encoding per face found in the image, in detection order.
    fn encode_faces(&self, image: &RgbImage) -> Result<Vec<Encoding>>;

    /// Whether two encodings are within `tolerance` distance of each other.
    fn faces_match(&self, known: &Encoding, unknown: &Encoding, tolerance: f32) -> bool {
        face_distance(known, unknown) <= tolerance
    }
}

/// ONNX Runtime backed analyzer: a detection model finds face boxes and an
/// embedding model turns each box into an encoding.
pub struct OnnxFaceAnalyzer {
    detector: FaceDetector,
    recognizer: FaceRecognizer,
}

impl OnnxFaceAnalyzer {
    pub fn new(config: &Config) -> Result<Self> {
        Ok(OnnxFaceAnalyzer {
            detector: FaceDetector::new(config)?,
            recognizer: FaceRecognizer::new(config)?,
        })
    }
}

impl FaceAnalyzer for OnnxFaceAnalyzer {
    fn encode_faces(&self, image: &RgbImage) -> Result<Vec<Encoding>> {
        let faces = self.detector.detect(image)?;
        faces
            .iter()
            .map(|face| self.recognizer.encode(image, face))
            .collect()
    }
}
