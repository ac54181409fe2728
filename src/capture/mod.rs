pub mod camera;
pub mod commands;
pub mod controller;
pub mod error;
pub mod platform;
pub mod session;
pub mod types;

pub use controller::ScannerController;
pub use platform::PlatformCamera;
pub use types::{CaptureConfig, CaptureEvent, SessionStatus};
