pub mod confirm;
pub mod encoder;
pub mod media_devices;
pub mod recorder_delegate;
