use std::path::Path;
use std::sync::Arc;

use ab_glyph::FontRef;
use crossbeam_channel::Receiver;

use crate::annotation::infrastructure::labelled_box_annotator::{label_font, LabelledBoxAnnotator};
use crate::camera::domain::camera::CameraProvider;
use crate::camera::infrastructure::ffmpeg_camera::FfmpegCameraProvider;
use crate::detection::infrastructure::haar_cascade::HaarCascade;
use crate::detection::infrastructure::haar_cascade_detector::{
    DetectionParams, HaarCascadeDetector,
};
use crate::shared::constants::{DISPLAY_HEIGHT, DISPLAY_WIDTH};

use super::capture_session::{CaptureSession, SessionEvent};

/// Loads the detection assets once and wires them into capture sessions.
pub struct SessionFactory {
    detector: HaarCascadeDetector,
    font: FontRef<'static>,
}

impl SessionFactory {
    /// Parses the cascade at `cascade_path` and the embedded label font.
    pub fn new(cascade_path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        Self::with_cascade(HaarCascade::load(cascade_path)?)
    }

    pub fn with_cascade(cascade: HaarCascade) -> Result<Self, Box<dyn std::error::Error>> {
        Ok(Self {
            detector: HaarCascadeDetector::new(Arc::new(cascade), DetectionParams::default())?,
            font: label_font()?,
        })
    }

    /// A session on the system camera.
    pub fn build(&self) -> (CaptureSession, Receiver<SessionEvent>) {
        self.build_with_provider(Box::new(FfmpegCameraProvider))
    }

    pub fn build_with_provider(
        &self,
        provider: Box<dyn CameraProvider>,
    ) -> (CaptureSession, Receiver<SessionEvent>) {
        CaptureSession::new(
            provider,
            Box::new(self.detector.clone()),
            Box::new(LabelledBoxAnnotator::with_font(self.font.clone())),
            DISPLAY_WIDTH,
            DISPLAY_HEIGHT,
        )
    }
}
