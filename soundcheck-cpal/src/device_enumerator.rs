//! Input device enumeration through the default cpal host.
//!
//! cpal exposes no stable device identifier, so the device name doubles as
//! the id.

use cpal::traits::{DeviceTrait, HostTrait};
use cpal::{Device, Host};

use soundcheck_core::models::audio_models::AudioDevice;
use soundcheck_core::models::error::CaptureError;

use crate::error_map::classify_backend_message;

fn input_devices(host: &Host) -> Result<impl Iterator<Item = Device>, CaptureError> {
    host.input_devices()
        .map_err(|e| classify_backend_message(&e.to_string()))
}

/// List input devices of `host`. Devices whose name cannot be read are
/// skipped.
pub fn list_input_devices(host: &Host) -> Result<Vec<AudioDevice>, CaptureError> {
    let devices = input_devices(host)?
        .filter_map(|device| match device.name() {
            Ok(name) => Some(AudioDevice::input(name.clone(), name)),
            Err(e) => {
                log::debug!("Skipping input device without a name: {}", e);
                None
            }
        })
        .collect();
    Ok(devices)
}

/// Ids of the input devices on the default host.
pub fn input_device_ids() -> Result<Vec<String>, CaptureError> {
    let host = cpal::default_host();
    Ok(list_input_devices(&host)?.into_iter().map(|d| d.id).collect())
}

/// Resolve `id` to a device, or the default input when `id` is `None`.
pub fn find_input_device(host: &Host, id: Option<&str>) -> Result<Device, CaptureError> {
    match id {
        None => host.default_input_device().ok_or(CaptureError::DeviceNotFound),
        Some(id) => input_devices(host)?
            .find(|device| device.name().map(|name| name == id).unwrap_or(false))
            .ok_or(CaptureError::DeviceNotFound),
    }
}
