//! Mapping of backend failure text onto [`CaptureError`].
//!
//! Host APIs report permission and exclusivity problems only as
//! backend-specific strings.

use soundcheck_core::models::error::CaptureError;

pub fn classify_backend_message(message: &str) -> CaptureError {
    let lower = message.to_lowercase();
    if lower.contains("permission") || lower.contains("denied") || lower.contains("not authorized") {
        CaptureError::PermissionDenied
    } else if lower.contains("busy") || lower.contains("in use") || lower.contains("exclusive") {
        CaptureError::DeviceBusy
    } else if lower.contains("no such device") || lower.contains("not found") || lower.contains("unplugged") {
        CaptureError::DeviceNotFound
    } else {
        CaptureError::CaptureUnavailable(message.to_string())
    }
}

#[cfg(feature = "cpal")]
pub(crate) fn from_build_error(e: cpal::BuildStreamError) -> CaptureError {
    match e {
        cpal::BuildStreamError::DeviceNotAvailable => CaptureError::DeviceNotFound,
        cpal::BuildStreamError::BackendSpecific { err } => classify_backend_message(&err.description),
        other => CaptureError::CaptureUnavailable(format!("failed to build input stream: {}", other)),
    }
}

#[cfg(feature = "cpal")]
pub(crate) fn from_config_error(e: cpal::DefaultStreamConfigError) -> CaptureError {
    match e {
        cpal::DefaultStreamConfigError::DeviceNotAvailable => CaptureError::DeviceNotFound,
        cpal::DefaultStreamConfigError::BackendSpecific { err } => classify_backend_message(&err.description),
        other => CaptureError::CaptureUnavailable(format!("no usable input config: {}", other)),
    }
}

#[cfg(feature = "cpal")]
pub(crate) fn from_play_error(e: cpal::PlayStreamError) -> CaptureError {
    match e {
        cpal::PlayStreamError::DeviceNotAvailable => CaptureError::DeviceNotFound,
        cpal::PlayStreamError::BackendSpecific { err } => classify_backend_message(&err.description),
        #[allow(unreachable_patterns)]
        other => CaptureError::CaptureUnavailable(format!("failed to start input stream: {}", other)),
    }
}
