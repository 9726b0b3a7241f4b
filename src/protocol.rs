use serde::{Serialize, Deserialize};

// Action names on the wire. Unrecognized values are echoed back in an
// error response, so the action field stays a plain string rather than
// an enum that would reject them at parse time.
pub const ACTION_CHECK_FACE: &str = "check_face";
pub const ACTION_COMPARE_FACES: &str = "compare_faces";

// Default service address
pub const DEFAULT_ADDR: &str = "127.0.0.1:5000";

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Request {
    pub action: Option<String>,
    pub client_image_data: Option<String>,
    pub db_image_path: Option<String>,
}

impl Request {
    pub fn check_face(image_b64: impl Into<String>) -> Self {
        Request {
            action: Some(ACTION_CHECK_FACE.to_string()),
            client_image_data: Some(image_b64.into()),
            db_image_path: None,
        }
    }

    pub fn compare_faces(image_b64: impl Into<String>, db_image_path: impl Into<String>) -> Self {
        Request {
            action: Some(ACTION_COMPARE_FACES.to_string()),
            client_image_data: Some(image_b64.into()),
            db_image_path: Some(db_image_path.into()),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    Error,
    NoFaceFound,
    MultipleFacesFound,
    FaceFound,
    Recognized,
    Unrecognized,
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Status::Error => "error",
            Status::NoFaceFound => "no_face_found",
            Status::MultipleFacesFound => "multiple_faces_found",
            Status::FaceFound => "face_found",
            Status::Recognized => "recognized",
            Status::Unrecognized => "unrecognized",
        };
        f.write_str(name)
    }
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Response {
    pub status: Status,
    pub message: String,
}

impl Response {
    pub fn new(status: Status, message: impl Into<String>) -> Self {
        Response { status, message: message.into() }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Response::new(Status::Error, message)
    }
}
