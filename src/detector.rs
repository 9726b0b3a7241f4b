use crate::config::{Config, DetectorConfig};
use crate::error::{FaceServiceError, Result};
use ort::{Environment, Session, SessionBuilder, Value, GraphOptimizationLevel};
use std::sync::Arc;
use image::{RgbImage, imageops::FilterType};
use ndarray::{Array4, CowArray};

// Boxes smaller than this in model input space are detector noise.
const MIN_FACE_SIZE: f32 = 10.0;

// Raw predictions below this are padding slots, not candidates.
const CANDIDATE_FLOOR: f32 = 0.001;

#[derive(Debug, Clone)]
pub struct FaceBox {
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
    pub confidence: f32,
}

pub struct FaceDetector {
    session: Session,
    _environment: Arc<Environment>,
    config: DetectorConfig,
}

impl FaceDetector {
    pub fn new(config: &Config) -> Result<Self> {
        let environment = Arc::new(
            Environment::builder()
                .with_name("face_detector")
                .build()
                .map_err(|e| FaceServiceError::Model(format!("Failed to create environment: {}", e)))?
        );

        let model_path = &config.models.detector_path;
        if !model_path.exists() {
            return Err(FaceServiceError::Model(
                format!("Detector model not found at: {:?}", model_path)
            ));
        }

        let session = SessionBuilder::new(&environment)?
            .with_optimization_level(GraphOptimizationLevel::Level3)?
            .with_model_from_file(model_path)?;

        Ok(Self {
            session,
            _environment: environment,
            config: config.detector.clone(),
        })
    }

    /// Find every face in the image. Boxes come back in original image
    /// coordinates, sorted by descending confidence, one per face; callers
    /// rely on the count, so nothing is truncated.
    pub fn detect(&self, image: &RgbImage) -> Result<Vec<FaceBox>> {
        let orig_width = image.width() as f32;
        let orig_height = image.height() as f32;
        let input_width = self.config.input_width;
        let input_height = self.config.input_height;

        let resized;
        let input = if image.width() == input_width && image.height() == input_height {
            image
        } else {
            resized = image::imageops::resize(image, input_width, input_height, FilterType::Triangle);
            &resized
        };

        let img_array = self.image_to_tensor(input);
        let cow_array = CowArray::from(img_array.into_dyn());
        let input_tensor = Value::from_array(self.session.allocator(), &cow_array)?;
        let outputs = self.session.run(vec![input_tensor])?;

        let output = outputs
            .first()
            .ok_or_else(|| FaceServiceError::Model("Detector produced no output".to_string()))?
            .try_extract::<f32>()?
            .view()
            .to_owned();
        let shape = output.shape().to_vec();
        let data = output.into_raw_vec();

        let mut faces = decode_predictions(&data, &shape, input_width as f32, input_height as f32);

        // Suppress duplicates before thresholding so a cluster of weak
        // overlapping boxes cannot outvote one strong one.
        faces = non_max_suppression(faces, self.config.iou_threshold);
        faces.retain(|face| face.confidence >= self.config.confidence_threshold);
        faces.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));

        // Back to original image coordinates
        let scale_x = orig_width / input_width as f32;
        let scale_y = orig_height / input_height as f32;
        for face in &mut faces {
            face.x1 *= scale_x;
            face.x2 *= scale_x;
            face.y1 *= scale_y;
            face.y2 *= scale_y;
        }

        Ok(faces)
    }

    fn image_to_tensor(&self, img: &RgbImage) -> Array4<f32> {
        let width = img.width() as usize;
        let height = img.height() as usize;
        let mean = self.config.normalization_mean;
        let std = self.config.normalization_std;
        let mut array = Array4::<f32>::zeros((1, 3, height, width));

        for (x, y, pixel) in img.enumerate_pixels() {
            let (x, y) = (x as usize, y as usize);
            for c in 0..3 {
                array[[0, c, y, x]] = (pixel[c] as f32 - mean) / std;
            }
        }

        array
    }
}

/// Decode raw model output into candidate boxes in model input space.
///
/// Accepts the two layouts face detection heads ship with: `[1, N, 5]`
/// (prediction-major) and `[1, 5, N]` (attribute-major), where each
/// prediction is `[x_center, y_center, width, height, confidence]`.
/// Coordinates may be pixel-space or normalized to `0..=1`.
fn decode_predictions(data: &[f32], shape: &[usize], input_width: f32, input_height: f32) -> Vec<FaceBox> {
    let (rows, cols) = match *shape {
        [_, rows, cols] => (rows, cols),
        [rows, cols] => (rows, cols),
        _ => {
            tracing::warn!("Unexpected detector output shape: {:?}", shape);
            return Vec::new();
        }
    };

    // Attribute-major outputs put the short attribute axis first and the
    // long prediction axis second; anchor grids are always much longer
    // than the handful of per-box attributes.
    let (count, attrs, transposed) = if rows <= 8 && cols > 8 {
        (cols, rows, true)
    } else {
        (rows, cols, false)
    };
    if attrs < 4 || data.len() < count * attrs {
        tracing::warn!("Detector output too small: shape {:?}, {} values", shape, data.len());
        return Vec::new();
    }

    let at = |i: usize, attr: usize| -> f32 {
        if transposed {
            data[attr * count + i]
        } else {
            data[i * attrs + attr]
        }
    };

    let mut faces = Vec::new();
    for i in 0..count {
        let confidence = if attrs > 4 { at(i, 4) } else { 0.0 };
        if confidence <= CANDIDATE_FLOOR {
            continue;
        }

        let (mut x_center, mut y_center, mut width, mut height) =
            (at(i, 0), at(i, 1), at(i, 2), at(i, 3));

        // Normalized outputs need scaling into input pixel space
        if x_center <= 1.0 && y_center <= 1.0 && width <= 1.0 && height <= 1.0 {
            x_center *= input_width;
            width *= input_width;
            y_center *= input_height;
            height *= input_height;
        }

        let x1 = (x_center - width / 2.0).max(0.0);
        let y1 = (y_center - height / 2.0).max(0.0);
        let x2 = (x_center + width / 2.0).min(input_width);
        let y2 = (y_center + height / 2.0).min(input_height);

        if x2 - x1 >= MIN_FACE_SIZE && y2 - y1 >= MIN_FACE_SIZE {
            faces.push(FaceBox { x1, y1, x2, y2, confidence });
        }
    }

    faces
}

/// Greedy non-maximum suppression: keep the most confident box, drop
/// everything overlapping it past `iou_threshold`, repeat.
fn non_max_suppression(mut boxes: Vec<FaceBox>, iou_threshold: f32) -> Vec<FaceBox> {
    boxes.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));

    let mut keep: Vec<FaceBox> = Vec::new();
    for candidate in boxes {
        if keep.iter().all(|kept| iou(kept, &candidate) < iou_threshold) {
            keep.push(candidate);
        }
    }
    keep
}

fn iou(a: &FaceBox, b: &FaceBox) -> f32 {
    let x1 = a.x1.max(b.x1);
    let y1 = a.y1.max(b.y1);
    let x2 = a.x2.min(b.x2);
    let y2 = a.y2.min(b.y2);

    let intersection = (x2 - x1).max(0.0) * (y2 - y1).max(0.0);
    let area_a = (a.x2 - a.x1) * (a.y2 - a.y1);
    let area_b = (b.x2 - b.x1) * (b.y2 - b.y1);
    let union = area_a + area_b - intersection;

    if union > 0.0 {
        intersection / union
    } else {
        0.0
    }
}
