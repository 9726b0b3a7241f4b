use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use crate::error::{FaceServiceError, Result};

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub models: ModelConfig,
    #[serde(default)]
    pub detector: DetectorConfig,
    #[serde(default)]
    pub recognizer: RecognizerConfig,
    #[serde(default)]
    pub matching: MatchingConfig,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig { host: default_host(), port: default_port() }
    }
}

impl ServerConfig {
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn default_host() -> String { "127.0.0.1".to_string() }
fn default_port() -> u16 { 5000 }

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ModelConfig {
    #[serde(default = "default_detector_path")]
    pub detector_path: PathBuf,
    #[serde(default = "default_recognizer_path")]
    pub recognizer_path: PathBuf,
}

impl Default for ModelConfig {
    fn default() -> Self {
        ModelConfig {
            detector_path: default_detector_path(),
            recognizer_path: default_recognizer_path(),
        }
    }
}

fn default_detector_path() -> PathBuf { PathBuf::from("models/face_detector.onnx") }
fn default_recognizer_path() -> PathBuf { PathBuf::from("models/face_recognizer.onnx") }

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct DetectorConfig {
    #[serde(default = "default_input_dim")]
    pub input_width: u32,
    #[serde(default = "default_input_dim")]
    pub input_height: u32,
    #[serde(default = "default_confidence_threshold")]
    pub confidence_threshold: f32,
    #[serde(default = "default_iou_threshold")]
    pub iou_threshold: f32,
    #[serde(default = "default_normalization_mean")]
    pub normalization_mean: f32,
    #[serde(default = "default_normalization_std")]
    pub normalization_std: f32,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        DetectorConfig {
            input_width: default_input_dim(),
            input_height: default_input_dim(),
            confidence_threshold: default_confidence_threshold(),
            iou_threshold: default_iou_threshold(),
            normalization_mean: default_normalization_mean(),
            normalization_std: default_normalization_std(),
        }
    }
}

fn default_input_dim() -> u32 { 640 }
fn default_confidence_threshold() -> f32 { 0.5 }
fn default_iou_threshold() -> f32 { 0.45 }
fn default_normalization_mean() -> f32 { 0.0 }
fn default_normalization_std() -> f32 { 255.0 }

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct RecognizerConfig {
    #[serde(default = "default_recognizer_input")]
    pub input_size: u32,
    #[serde(default = "default_normalization_value")]
    pub normalization_value: f32,
}

impl Default for RecognizerConfig {
    fn default() -> Self {
        RecognizerConfig {
            input_size: default_recognizer_input(),
            normalization_value: default_normalization_value(),
        }
    }
}

fn default_recognizer_input() -> u32 { 112 }
fn default_normalization_value() -> f32 { 127.5 }

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct MatchingConfig {
    /// Maximum encoding distance still considered the same face.
    #[serde(default = "default_tolerance")]
    pub tolerance: f32,
}

impl Default for MatchingConfig {
    fn default() -> Self {
        MatchingConfig { tolerance: default_tolerance() }
    }
}

fn default_tolerance() -> f32 { 0.5 }

impl Config {
    pub fn load_from_path(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(FaceServiceError::Other(anyhow::anyhow!(
                "Config file not found: {}", path.display()
            )));
        }

        tracing::info!("Loading config from: {}", path.display());
        let contents = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)
            .map_err(|e| FaceServiceError::Other(anyhow::anyhow!("Config parse error: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.detector.input_width == 0 || self.detector.input_width > 4096 {
            return Err(FaceServiceError::Other(anyhow::anyhow!(
                "Detector input width must be between 1 and 4096, got {}",
                self.detector.input_width
            )));
        }
        if self.detector.input_height == 0 || self.detector.input_height > 4096 {
            return Err(FaceServiceError::Other(anyhow::anyhow!(
                "Detector input height must be between 1 and 4096, got {}",
                self.detector.input_height
            )));
        }
        if self.detector.confidence_threshold < 0.0 || self.detector.confidence_threshold > 1.0 {
            return Err(FaceServiceError::Other(anyhow::anyhow!(
                "Detection confidence threshold must be between 0.0 and 1.0, got {}",
                self.detector.confidence_threshold
            )));
        }
        if self.detector.iou_threshold < 0.0 || self.detector.iou_threshold > 1.0 {
            return Err(FaceServiceError::Other(anyhow::anyhow!(
                "Detector IoU threshold must be between 0.0 and 1.0, got {}",
                self.detector.iou_threshold
            )));
        }
        if self.detector.normalization_std == 0.0 {
            return Err(FaceServiceError::Other(anyhow::anyhow!(
                "Detector normalization std must be nonzero"
            )));
        }
        if self.recognizer.input_size == 0 || self.recognizer.input_size > 1024 {
            return Err(FaceServiceError::Other(anyhow::anyhow!(
                "Recognizer input size must be between 1 and 1024, got {}",
                self.recognizer.input_size
            )));
        }
        if self.matching.tolerance <= 0.0 || self.matching.tolerance > 2.0 {
            return Err(FaceServiceError::Other(anyhow::anyhow!(
                "Match tolerance must be between 0.0 and 2.0, got {}",
                self.matching.tolerance
            )));
        }

        Ok(())
    }
}
