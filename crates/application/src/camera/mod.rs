//! Video camera driver variant

mod control;
mod driver;
mod output;

pub use control::{CameraControl, merge_command};
pub use driver::{CONTROL_NAME, CameraDriver, OUTPUT_NAME};
pub use output::{CameraOutput, frame_record};
