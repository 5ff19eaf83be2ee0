use crossbeam_channel::{Receiver, Sender};

use crate::annotation::domain::frame_annotator::FrameAnnotator;
use crate::camera::domain::camera::{CameraHandle, CameraProvider};
use crate::detection::domain::face_detector::FaceDetector;
use crate::shared::constants::{CAMERA_INDEX, STATUS_ACTIVE, STATUS_IDLE};
use crate::shared::display_frame::DisplayFrame;
use crate::shared::frame::Frame;

/// Observable changes the presentation layer reacts to.
#[derive(Debug, Clone)]
pub enum SessionEvent {
    Started,
    StartFailed(String),
    FrameReady(DisplayFrame),
    /// Carries the placeholder image that replaces the last live frame.
    Stopped(DisplayFrame),
}

/// Result of a single tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// The session is idle; no further ticks should be scheduled.
    Halted,
    /// No frame was shown this tick.
    Skipped,
    Rendered,
}

impl TickOutcome {
    pub fn reschedule(self) -> bool {
        !matches!(self, TickOutcome::Halted)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    Idle,
    Active,
}

impl SessionStatus {
    pub fn message(self) -> &'static str {
        match self {
            SessionStatus::Idle => STATUS_IDLE,
            SessionStatus::Active => STATUS_ACTIVE,
        }
    }
}

enum SessionState {
    Idle,
    /// The camera is released when this state is left.
    Active { camera: Box<dyn CameraHandle> },
}

/// Owns the camera lifecycle and the per-tick capture, detect, annotate and
/// convert loop.
pub struct CaptureSession {
    provider: Box<dyn CameraProvider>,
    detector: Box<dyn FaceDetector>,
    annotator: Box<dyn FrameAnnotator>,
    display_width: u32,
    display_height: u32,
    state: SessionState,
    events: Sender<SessionEvent>,
}

impl CaptureSession {
    pub fn new(
        provider: Box<dyn CameraProvider>,
        detector: Box<dyn FaceDetector>,
        annotator: Box<dyn FrameAnnotator>,
        display_width: u32,
        display_height: u32,
    ) -> (Self, Receiver<SessionEvent>) {
        let (tx, rx) = crossbeam_channel::unbounded();
        let session = Self {
            provider,
            detector,
            annotator,
            display_width,
            display_height,
            state: SessionState::Idle,
            events: tx,
        };
        (session, rx)
    }

    pub fn is_active(&self) -> bool {
        matches!(self.state, SessionState::Active { .. })
    }

    pub fn status(&self) -> SessionStatus {
        if self.is_active() {
            SessionStatus::Active
        } else {
            SessionStatus::Idle
        }
    }

    /// Image shown while no camera is running.
    pub fn placeholder(&self) -> DisplayFrame {
        DisplayFrame::placeholder(self.display_width, self.display_height)
    }

    pub fn start(&mut self) {
        if self.is_active() {
            return;
        }

        match self.provider.open(CAMERA_INDEX) {
            Ok(camera) => {
                log::info!("Capture started on camera {CAMERA_INDEX}");
                self.state = SessionState::Active { camera };
                self.emit(SessionEvent::Started);
            }
            Err(e) => {
                log::error!("Could not open camera {CAMERA_INDEX}: {e}");
                self.emit(SessionEvent::StartFailed(e.to_string()));
            }
        }
    }

    pub fn stop(&mut self) {
        if let SessionState::Active { .. } = std::mem::replace(&mut self.state, SessionState::Idle)
        {
            log::info!("Capture stopped");
        }
        self.emit(SessionEvent::Stopped(self.placeholder()));
    }

    pub fn tick(&mut self) -> TickOutcome {
        let SessionState::Active { camera } = &mut self.state else {
            return TickOutcome::Halted;
        };

        let frame = match camera.read() {
            Ok(Some(frame)) => frame,
            Ok(None) => {
                log::debug!("No frame available");
                return TickOutcome::Skipped;
            }
            Err(e) => {
                log::debug!("Frame read failed: {e}");
                return TickOutcome::Skipped;
            }
        };

        match self.process(frame) {
            Ok(display) => {
                self.emit(SessionEvent::FrameReady(display));
                TickOutcome::Rendered
            }
            Err(e) => {
                log::warn!("Dropped frame: {e}");
                TickOutcome::Skipped
            }
        }
    }

    fn process(&mut self, mut frame: Frame) -> Result<DisplayFrame, Box<dyn std::error::Error>> {
        let gray = frame.to_gray();
        let regions = self.detector.detect(&gray)?;
        if !regions.is_empty() {
            log::trace!("Frame {}: {} faces", frame.sequence(), regions.len());
        }
        self.annotator.annotate(&mut frame, &regions)?;
        DisplayFrame::from_frame(&frame, self.display_width, self.display_height)
    }

    fn emit(&self, event: SessionEvent) {
        // The receiver is gone only when the UI has shut down.
        let _ = self.events.send(event);
    }
}
