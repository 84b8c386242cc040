use thiserror::Error;

/// Errors raised while acquiring or driving a live microphone stream.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CaptureError {
    #[error("permission denied")]
    PermissionDenied,

    #[error("device not found")]
    DeviceNotFound,

    #[error("device busy")]
    DeviceBusy,

    #[error("capture unavailable: {0}")]
    CaptureUnavailable(String),

    #[error("invalid state: {0}")]
    InvalidState(String),
}

impl CaptureError {
    /// Text shown next to the control that triggered the failure.
    pub fn user_message(&self) -> String {
        match self {
            Self::PermissionDenied => {
                "Microphone access denied. Please enable microphone permissions in your settings.".into()
            }
            Self::DeviceNotFound => {
                "No microphone found. Please connect a microphone and try again.".into()
            }
            Self::DeviceBusy => "Microphone is already in use by another application.".into(),
            Self::CaptureUnavailable(reason) => reason.clone(),
            Self::InvalidState(reason) => reason.clone(),
        }
    }
}

/// Errors raised by the local recording store.
///
/// Every store operation is a single transaction, so a failed call never
/// leaves a partially written record behind.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("storage unavailable: {0}")]
    StorageUnavailable(String),

    #[error("transaction failed: {0}")]
    TransactionFailed(String),

    #[error("recording {0} not found")]
    NotFound(i64),

    #[error("recording {0} failed checksum verification")]
    Corrupted(i64),
}

/// Failure of an operation spanning the recorder and the store.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TakeError {
    #[error(transparent)]
    Capture(#[from] CaptureError),

    #[error(transparent)]
    Store(#[from] StoreError),
}
