use std::time::Duration;

/// The default system camera.
pub const CAMERA_INDEX: u32 = 0;

/// Each detection pass shrinks the image by this factor.
pub const SCALE_FACTOR: f64 = 1.1;
/// A face needs more than this many overlapping raw detections to be kept.
pub const MIN_NEIGHBORS: usize = 4;
/// Relative tolerance used when clustering raw detections.
pub const GROUP_EPS: f64 = 0.2;

/// Fixed output size of the presentation surface; aspect ratio is not kept.
pub const DISPLAY_WIDTH: u32 = 700;
pub const DISPLAY_HEIGHT: u32 = 450;

/// Delay between capture loop ticks.
pub const TICK_INTERVAL: Duration = Duration::from_millis(10);

pub const FACE_LABEL: &str = "Face";
pub const BOX_COLOR: [u8; 3] = [0, 255, 0];
pub const LABEL_COLOR: [u8; 3] = [12, 255, 36];
pub const BOX_THICKNESS: u32 = 2;
/// Gap between the label baseline and the top edge of its box.
pub const LABEL_OFFSET: i32 = 10;
pub const LABEL_PX: f32 = 24.0;

pub const CASCADE_FILE_NAME: &str = "haarcascade_frontalface_default.xml";

/// Install locations of the OpenCV cascade data files.
pub const CASCADE_SEARCH_DIRS: &[&str] = &[
    "/usr/share/opencv4/haarcascades",
    "/usr/local/share/opencv4/haarcascades",
    "/usr/share/opencv/haarcascades",
    "/usr/local/share/opencv/haarcascades",
    "/opt/homebrew/share/opencv4/haarcascades",
];

pub const APP_DIR_NAME: &str = "FaceCam";

pub const STATUS_IDLE: &str = "System Standby";
pub const STATUS_ACTIVE: &str = "Camera Active - Detecting Faces...";
