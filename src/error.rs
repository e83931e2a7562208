use thiserror::Error;

/// Stable error categories reported for a failed cycle or a failed start.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    DeviceUnavailable,
    EncodeError,
    NetworkError,
    BackendError,
    DecodeError,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::DeviceUnavailable => "device_unavailable",
            ErrorKind::EncodeError => "encode_error",
            ErrorKind::NetworkError => "network_error",
            ErrorKind::BackendError => "backend_error",
            ErrorKind::DecodeError => "decode_error",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
pub enum UploadError {
    #[error("failed to encode frame: {0}")]
    Encode(String),
    #[error("request failed: {0}")]
    Network(#[from] reqwest::Error),
    #[error("backend returned status {status}: {body}")]
    Backend { status: u16, body: String },
    #[error("failed to decode response: {0}")]
    Decode(#[from] serde_json::Error),
}

impl UploadError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            UploadError::Encode(_) => ErrorKind::EncodeError,
            UploadError::Network(_) => ErrorKind::NetworkError,
            UploadError::Backend { .. } => ErrorKind::BackendError,
            UploadError::Decode(_) => ErrorKind::DecodeError,
        }
    }
}

impl From<image::ImageError> for UploadError {
    fn from(err: image::ImageError) -> Self {
        UploadError::Encode(err.to_string())
    }
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("capture device unavailable: {0}")]
    DeviceUnavailable(String),
    #[error("session already started")]
    AlreadyStarted,
    #[error("session has been stopped")]
    Stopped,
}

impl SessionError {
    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            SessionError::DeviceUnavailable(_) => Some(ErrorKind::DeviceUnavailable),
            _ => None,
        }
    }
}
