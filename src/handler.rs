use crate::analyzer::FaceAnalyzer;
use crate::error::Result;
use crate::preprocess;
use crate::protocol::{Request, Response, Status, ACTION_CHECK_FACE, ACTION_COMPARE_FACES};
use std::sync::Arc;

pub struct RequestHandler<A> {
    analyzer: Arc<A>,
    tolerance: f32,
}

impl<A> Clone for RequestHandler<A> {
    fn clone(&self) -> Self {
        RequestHandler {
            analyzer: Arc::clone(&self.analyzer),
            tolerance: self.tolerance,
        }
    }
}

impl<A: FaceAnalyzer> RequestHandler<A> {
    pub fn new(analyzer: Arc<A>, tolerance: f32) -> Self {
        RequestHandler { analyzer, tolerance }
    }

    /// Decide one request. Domain outcomes (bad input, no face, no match)
    /// come back as `Ok` responses; only unexpected failures surface as
    /// `Err`, which the session layer reports as a processing error.
    pub fn handle(&self, request: &Request) -> Result<Response> {
        // Producers send empty strings for fields they do not use, so an
        // empty field means the same as an absent one.
        let image_b64 = match request.client_image_data.as_deref() {
            Some(data) if !data.is_empty() => data,
            _ => return Ok(Response::error("No client image data provided.")),
        };

        match request.action.as_deref() {
            Some(ACTION_CHECK_FACE) => self.check_face(image_b64),
            // An absent action means a comparison; anything else, including
            // an empty string, is unknown.
            Some(ACTION_COMPARE_FACES) | None => {
                self.compare_faces(image_b64, request.db_image_path.as_deref())
            }
            Some(other) => Ok(Response::error(format!("Unknown action: {}", other))),
        }
    }

    fn check_face(&self, image_b64: &str) -> Result<Response> {
        let bytes = preprocess::decode_base64(image_b64)?;
        let image = match preprocess::prepare_image(&bytes) {
            Ok(image) => image,
            Err(_) => return Ok(Response::error("Could not decode client image.")),
        };

        let encodings = self.analyzer.encode_faces(&image)?;
        let response = match encodings.len() {
            0 => Response::new(Status::NoFaceFound, "No face was found in the provided image."),
            1 => Response::new(Status::FaceFound, "A single face was successfully found."),
            n => Response::new(
                Status::MultipleFacesFound,
                format!(
                    "Multiple faces ({}) were found. Please provide an image with only one face.",
                    n
                ),
            ),
        };
        Ok(response)
    }

    fn compare_faces(&self, image_b64: &str, db_image_path: Option<&str>) -> Result<Response> {
        let db_path = match db_image_path {
            Some(path) if !path.is_empty() => path,
            _ => return Ok(Response::error("No database image path provided for comparison.")),
        };

        let bytes = preprocess::decode_base64(image_b64)?;
        let client_image = match preprocess::prepare_image(&bytes) {
            Ok(image) => image,
            Err(_) => return Ok(Response::error("Could not decode client image.")),
        };

        // When several faces are present the first one stands in for the
        // client; comparison does not insist on a single face the way
        // check_face does.
        let client_encodings = self.analyzer.encode_faces(&client_image)?;
        let client_encoding = match client_encodings.first() {
            Some(encoding) => encoding,
            None => return Ok(Response::error("No face found in the client image.")),
        };

        let db_bytes = match std::fs::read(db_path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(Response::error(format!("Database image not found at {}", db_path)));
            }
            Err(e) => {
                return Ok(Response::error(format!(
                    "Could not load database image from {}: {}",
                    db_path, e
                )));
            }
        };
        let db_image = match preprocess::prepare_image(&db_bytes) {
            Ok(image) => image,
            Err(_) => return Ok(Response::error("Could not decode database image.")),
        };

        let db_encodings = self.analyzer.encode_faces(&db_image)?;
        let db_encoding = match db_encodings.first() {
            Some(encoding) => encoding,
            None => return Ok(Response::error("No face found in the database image.")),
        };

        let response = if self.analyzer.faces_match(db_encoding, client_encoding, self.tolerance) {
            Response::new(Status::Recognized, "Face recognized!")
        } else {
            Response::new(Status::Unrecognized, "Face not recognized.")
        };
        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::Encoding;
    use crate::error::FaceServiceError;
    use base64::Engine;
    use base64::engine::general_purpose::STANDARD as BASE64;
    use image::RgbImage;
    use std::collections::HashMap;
    use std::io::Write;

    /// Test analyzer that maps image width to a fixed set of encodings.
    struct StubAnalyzer {
        by_width: HashMap<u32, Vec<Encoding>>,
    }

    impl StubAnalyzer {
        fn new(entries: &[(u32, Vec<Encoding>)]) -> Self {
            StubAnalyzer { by_width: entries.iter().cloned().collect() }
        }
    }

    impl FaceAnalyzer for StubAnalyzer {
        fn encode_faces(&self, image: &RgbImage) -> Result<Vec<Encoding>> {
            Ok(self.by_width.get(&image.width()).cloned().unwrap_or_default())
        }
    }

    fn handler(entries: &[(u32, Vec<Encoding>)]) -> RequestHandler<StubAnalyzer> {
        RequestHandler::new(Arc::new(StubAnalyzer::new(entries)), 0.5)
    }

    // Keep test widths at or below 640 so preprocessing does not rescale
    // them away from the stub's keys.
    fn png_bytes(width: u32) -> Vec<u8> {
        let img = RgbImage::from_pixel(width, 50, image::Rgb([90, 120, 150]));
        let mut bytes = Vec::new();
        image::DynamicImage::ImageRgb8(img)
            .write_to(&mut std::io::Cursor::new(&mut bytes), image::ImageOutputFormat::Png)
            .unwrap();
        bytes
    }

    fn png_b64(width: u32) -> String {
        BASE64.encode(png_bytes(width))
    }

    fn encoding(fill: f32) -> Encoding {
        vec![fill; 128]
    }

    #[test]
    fn test_missing_image_data() {
        let handler = handler(&[]);
        for request in [
            Request { action: None, client_image_data: None, db_image_path: None },
            Request {
                action: Some("check_face".into()),
                client_image_data: Some("".into()),
                db_image_path: None,
            },
        ] {
            let response = handler.handle(&request).unwrap();
            assert_eq!(response.status, Status::Error);
            assert_eq!(response.message, "No client image data provided.");
        }
    }

    #[test]
    fn test_missing_image_data_wins_over_unknown_action() {
        let handler = handler(&[]);
        let request = Request {
            action: Some("enroll".into()),
            client_image_data: None,
            db_image_path: None,
        };
        let response = handler.handle(&request).unwrap();
        assert_eq!(response.message, "No client image data provided.");
    }

    #[test]
    fn test_unknown_action() {
        let handler = handler(&[(200, vec![encoding(0.0)])]);
        let request = Request {
            action: Some("enroll".into()),
            client_image_data: Some(png_b64(200)),
            db_image_path: None,
        };
        let response = handler.handle(&request).unwrap();
        assert_eq!(response.status, Status::Error);
        assert_eq!(response.message, "Unknown action: enroll");
    }

    #[test]
    fn test_empty_action_is_unknown_not_default() {
        let handler = handler(&[(200, vec![encoding(0.0)])]);
        let request = Request {
            action: Some("".into()),
            client_image_data: Some(png_b64(200)),
            db_image_path: None,
        };
        let response = handler.handle(&request).unwrap();
        assert_eq!(response.message, "Unknown action: ");
    }

    #[test]
    fn test_invalid_base64_is_a_handler_error() {
        let handler = handler(&[]);
        let request = Request::check_face("@@not-base64@@");
        let err = handler.handle(&request).unwrap_err();
        assert!(matches!(err, FaceServiceError::Base64(_)));
    }

    #[test]
    fn test_check_face_undecodable_image() {
        let handler = handler(&[]);
        let request = Request::check_face(BASE64.encode(b"not an image"));
        let response = handler.handle(&request).unwrap();
        assert_eq!(response.status, Status::Error);
        assert_eq!(response.message, "Could not decode client image.");
    }

    #[test]
    fn test_check_face_counts() {
        let handler = handler(&[
            (100, vec![]),
            (200, vec![encoding(0.1)]),
            (300, vec![encoding(0.1), encoding(0.2), encoding(0.3)]),
        ]);

        let response = handler.handle(&Request::check_face(png_b64(100))).unwrap();
        assert_eq!(response.status, Status::NoFaceFound);
        assert_eq!(response.message, "No face was found in the provided image.");

        let response = handler.handle(&Request::check_face(png_b64(200))).unwrap();
        assert_eq!(response.status, Status::FaceFound);
        assert_eq!(response.message, "A single face was successfully found.");

        let response = handler.handle(&Request::check_face(png_b64(300))).unwrap();
        assert_eq!(response.status, Status::MultipleFacesFound);
        assert_eq!(
            response.message,
            "Multiple faces (3) were found. Please provide an image with only one face."
        );
    }

    #[test]
    fn test_compare_requires_db_path() {
        let handler = handler(&[(200, vec![encoding(0.0)])]);
        for db_image_path in [None, Some(String::new())] {
            let request = Request {
                action: Some("compare_faces".into()),
                client_image_data: Some(png_b64(200)),
                db_image_path,
            };
            let response = handler.handle(&request).unwrap();
            assert_eq!(response.status, Status::Error);
            assert_eq!(response.message, "No database image path provided for comparison.");
        }
    }

    #[test]
    fn test_absent_action_defaults_to_compare() {
        let handler = handler(&[(200, vec![encoding(0.0)])]);
        let request = Request {
            action: None,
            client_image_data: Some(png_b64(200)),
            db_image_path: None,
        };
        let response = handler.handle(&request).unwrap();
        // A compare-path response proves the default routing
        assert_eq!(response.message, "No database image path provided for comparison.");
    }

    #[test]
    fn test_compare_no_face_in_client_image() {
        let handler = handler(&[(100, vec![])]);
        let request = Request::compare_faces(png_b64(100), "/tmp/db.png");
        let response = handler.handle(&request).unwrap();
        assert_eq!(response.status, Status::Error);
        assert_eq!(response.message, "No face found in the client image.");
    }

    #[test]
    fn test_compare_db_image_missing() {
        let handler = handler(&[(200, vec![encoding(0.0)])]);
        let request = Request::compare_faces(png_b64(200), "/definitely/missing/db.png");
        let response = handler.handle(&request).unwrap();
        assert_eq!(response.status, Status::Error);
        assert_eq!(response.message, "Database image not found at /definitely/missing/db.png");
    }

    #[test]
    fn test_compare_db_path_unreadable() {
        let dir = tempfile::tempdir().unwrap();
        let handler = handler(&[(200, vec![encoding(0.0)])]);
        let request =
            Request::compare_faces(png_b64(200), dir.path().to_string_lossy().to_string());
        let response = handler.handle(&request).unwrap();
        assert_eq!(response.status, Status::Error);
        assert!(
            response.message.starts_with("Could not load database image from"),
            "unexpected message: {}",
            response.message
        );
    }

    #[test]
    fn test_compare_db_image_undecodable() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"garbage bytes").unwrap();

        let handler = handler(&[(200, vec![encoding(0.0)])]);
        let request =
            Request::compare_faces(png_b64(200), file.path().to_string_lossy().to_string());
        let response = handler.handle(&request).unwrap();
        assert_eq!(response.status, Status::Error);
        assert_eq!(response.message, "Could not decode database image.");
    }

    #[test]
    fn test_compare_no_face_in_db_image() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(&png_bytes(100)).unwrap();

        let handler = handler(&[(100, vec![]), (200, vec![encoding(0.0)])]);
        let request =
            Request::compare_faces(png_b64(200), file.path().to_string_lossy().to_string());
        let response = handler.handle(&request).unwrap();
        assert_eq!(response.status, Status::Error);
        assert_eq!(response.message, "No face found in the database image.");
    }

    #[test]
    fn test_compare_recognized() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(&png_bytes(300)).unwrap();

        // distance 0.0, well inside the 0.5 tolerance
        let handler = handler(&[(200, vec![encoding(0.1)]), (300, vec![encoding(0.1)])]);
        let request =
            Request::compare_faces(png_b64(200), file.path().to_string_lossy().to_string());
        let response = handler.handle(&request).unwrap();
        assert_eq!(response.status, Status::Recognized);
        assert_eq!(response.message, "Face recognized!");
    }

    #[test]
    fn test_compare_unrecognized() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(&png_bytes(300)).unwrap();

        // distance sqrt(128 * 0.2^2) ~ 2.26, far outside tolerance
        let handler = handler(&[(200, vec![encoding(0.0)]), (300, vec![encoding(0.2)])]);
        let request =
            Request::compare_faces(png_b64(200), file.path().to_string_lossy().to_string());
        let response = handler.handle(&request).unwrap();
        assert_eq!(response.status, Status::Unrecognized);
        assert_eq!(response.message, "Face not recognized.");
    }

    #[test]
    fn test_compare_uses_first_of_multiple_client_faces() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(&png_bytes(300)).unwrap();

        // First client encoding matches, second does not; no multi-face error
        let handler = handler(&[
            (200, vec![encoding(0.1), encoding(0.9)]),
            (300, vec![encoding(0.1)]),
        ]);
        let request =
            Request::compare_faces(png_b64(200), file.path().to_string_lossy().to_string());
        let response = handler.handle(&request).unwrap();
        assert_eq!(response.status, Status::Recognized);
    }
}
