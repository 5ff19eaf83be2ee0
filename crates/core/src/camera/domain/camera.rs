use crate::shared::frame::Frame;

/// Exclusive ownership of one open capture device.
///
/// The device is released when the handle is dropped, so a released
/// handle can never be read from.
pub trait CameraHandle {
    /// Reads the newest available frame.
    ///
    /// `Ok(None)` means no frame was available this time; callers treat it
    /// the same as a transient error.
    fn read(&mut self) -> Result<Option<Frame>, Box<dyn std::error::Error>>;
}

/// Opens capture devices by index.
pub trait CameraProvider {
    fn open(&self, index: u32) -> Result<Box<dyn CameraHandle>, Box<dyn std::error::Error>>;
}
