pub mod controller;
pub mod recorder;
