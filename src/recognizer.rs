use crate::analyzer::Encoding;
use crate::config::{Config, RecognizerConfig};
use crate::detector::FaceBox;
use crate::error::{FaceServiceError, Result};
use ort::{Environment, Session, SessionBuilder, Value, GraphOptimizationLevel};
use std::sync::Arc;
use image::{RgbImage, imageops::FilterType};
use ndarray::{Array4, CowArray};

pub struct FaceRecognizer {
    session: Session,
    _environment: Arc<Environment>,
    config: RecognizerConfig,
}

impl FaceRecognizer {
    pub fn new(config: &Config) -> Result<Self> {
        let environment = Arc::new(
            Environment::builder()
                .with_name("face_recognizer")
                .build()
                .map_err(|e| FaceServiceError::Model(format!("Failed to create environment: {}", e)))?
        );

        let model_path = &config.models.recognizer_path;
        if !model_path.exists() {
            return Err(FaceServiceError::Model(
                format!("Recognizer model not found at: {:?}", model_path)
            ));
        }

        let session = SessionBuilder::new(&environment)?
            .with_optimization_level(GraphOptimizationLevel::Level3)?
            .with_model_from_file(model_path)?;

        Ok(Self {
            session,
            _environment: environment,
            config: config.recognizer.clone(),
        })
    }

    /// Encode one detected face. The box is in image coordinates; the crop
    /// is resized to the model input and the output vector L2-normalized so
    /// encodings compare by plain Euclidean distance.
    pub fn encode(&self, image: &RgbImage, face: &FaceBox) -> Result<Encoding> {
        let face_img = crop_region(image, face);

        let size = self.config.input_size;
        let resized = image::imageops::resize(&face_img, size, size, FilterType::Triangle);

        let input_array = self.image_to_tensor(&resized);
        let cow_array = CowArray::from(input_array.into_dyn());
        let input_tensor = Value::from_array(self.session.allocator(), &cow_array)?;
        let outputs = self.session.run(vec![input_tensor])?;

        let mut encoding = outputs
            .first()
            .ok_or_else(|| FaceServiceError::Model("Recognizer produced no output".to_string()))?
            .try_extract::<f32>()?
            .view()
            .to_owned()
            .into_raw_vec();
        l2_normalize(&mut encoding);
        Ok(encoding)
    }

    fn image_to_tensor(&self, img: &RgbImage) -> Array4<f32> {
        let size = self.config.input_size as usize;
        let norm = self.config.normalization_value;
        let mut array = Array4::<f32>::zeros((1, 3, size, size));

        for (x, y, pixel) in img.enumerate_pixels() {
            let (x, y) = (x as usize, y as usize);
            for c in 0..3 {
                array[[0, c, y, x]] = (pixel[c] as f32 - norm) / norm;
            }
        }

        array
    }
}

/// Cut the face box out of the image, clamped to the image bounds so a box
/// nudged past the edge by coordinate scaling still yields a valid crop.
fn crop_region(image: &RgbImage, face: &FaceBox) -> RgbImage {
    let x = (face.x1.max(0.0) as u32).min(image.width().saturating_sub(1));
    let y = (face.y1.max(0.0) as u32).min(image.height().saturating_sub(1));
    let width = (face.x2.min(image.width() as f32) - x as f32).max(1.0) as u32;
    let height = (face.y2.min(image.height() as f32) - y as f32).max(1.0) as u32;

    image::imageops::crop_imm(image, x, y, width, height).to_image()
}

fn l2_normalize(values: &mut [f32]) {
    let norm = values.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm > 0.0 {
        for v in values.iter_mut() {
            *v /= norm;
        }
    }
}
