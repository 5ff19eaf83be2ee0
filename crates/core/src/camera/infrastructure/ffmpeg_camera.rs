use ffmpeg_next::format::Pixel;
use ffmpeg_next::Packet;
use ffmpeg_next::software::scaling::{Context as Scaler, Flags};
use ffmpeg_next::util::frame::video::Video;
use thiserror::Error;

use crate::camera::domain::camera::{CameraHandle, CameraProvider};
use crate::shared::frame::Frame;

#[derive(Error, Debug)]
pub enum CameraError {
    #[error("camera capture is not supported on this platform")]
    Unsupported,
    #[error("ffmpeg was built without the '{0}' input device")]
    BackendMissing(&'static str),
    #[error("failed to open camera {device}: {source}")]
    Open {
        device: String,
        #[source]
        source: ffmpeg_next::Error,
    },
    #[error("camera {0} has no video stream")]
    NoVideoStream(String),
    #[error("failed to read from camera: {0}")]
    Read(#[source] ffmpeg_next::Error),
    #[error("failed to decode camera frame: {0}")]
    Decode(#[source] ffmpeg_next::Error),
}

/// Opens cameras through libavdevice.
#[derive(Debug, Default, Clone, Copy)]
pub struct FfmpegCameraProvider;

impl CameraProvider for FfmpegCameraProvider {
    fn open(&self, index: u32) -> Result<Box<dyn CameraHandle>, Box<dyn std::error::Error>> {
        Ok(Box::new(FfmpegCamera::open(index)?))
    }
}

/// A live capture device decoded to RGB24 at its native resolution.
///
/// Dropping the camera closes the device.
pub struct FfmpegCamera {
    input: ffmpeg_next::format::context::Input,
    decoder: ffmpeg_next::decoder::Video,
    scaler: Scaler,
    stream_index: usize,
    width: u32,
    height: u32,
    device: String,
    sequence: u64,
}

impl FfmpegCamera {
    pub fn open(index: u32) -> Result<Self, CameraError> {
        let (backend, device) = device_locator(index)?;
        let open_error = |source| CameraError::Open {
            device: device.clone(),
            source,
        };

        ffmpeg_next::init().map_err(open_error)?;

        let format = ffmpeg_next::device::input::video()
            .find(|f| f.name().split(',').any(|name| name == backend))
            .ok_or(CameraError::BackendMissing(backend))?;

        let mut options = ffmpeg_next::Dictionary::new();
        if backend == "avfoundation" {
            // avfoundation refuses to open without an explicit rate.
            options.set("framerate", "30");
        }

        let input = ffmpeg_next::format::open_with(&device, &format, options)
            .map_err(open_error)?
            .input();

        let (stream_index, parameters) = {
            let stream = input
                .streams()
                .best(ffmpeg_next::media::Type::Video)
                .ok_or_else(|| CameraError::NoVideoStream(device.clone()))?;
            (stream.index(), stream.parameters())
        };

        let codec_ctx =
            ffmpeg_next::codec::context::Context::from_parameters(parameters).map_err(open_error)?;
        let decoder = codec_ctx.decoder().video().map_err(open_error)?;

        let width = decoder.width();
        let height = decoder.height();
        let scaler = Scaler::get(
            decoder.format(),
            width,
            height,
            Pixel::RGB24,
            width,
            height,
            Flags::BILINEAR,
        )
        .map_err(open_error)?;

        log::info!("Opened camera {device} via {backend} ({width}x{height})");

        Ok(Self {
            input,
            decoder,
            scaler,
            stream_index,
            width,
            height,
            device,
            sequence: 0,
        })
    }

    fn try_receive(&mut self) -> Result<Option<Frame>, CameraError> {
        let mut decoded = Video::empty();
        if self.decoder.receive_frame(&mut decoded).is_err() {
            return Ok(None);
        }

        let mut rgb_frame = Video::empty();
        self.scaler
            .run(&decoded, &mut rgb_frame)
            .map_err(CameraError::Decode)?;

        let pixels = extract_rgb_pixels(&rgb_frame, self.width, self.height);
        let frame = Frame::new(pixels, self.width, self.height, self.sequence);
        self.sequence += 1;
        Ok(Some(frame))
    }
}

impl CameraHandle for FfmpegCamera {
    fn read(&mut self) -> Result<Option<Frame>, Box<dyn std::error::Error>> {
        loop {
            if let Some(frame) = self.try_receive()? {
                return Ok(Some(frame));
            }

            let mut packet = Packet::empty();
            if !packet_read(packet.read(&mut self.input))? {
                return Ok(None);
            }
            if packet.stream() != self.stream_index {
                continue;
            }

            self.decoder
                .send_packet(&packet)
                .map_err(CameraError::Decode)?;
        }
    }
}

impl Drop for FfmpegCamera {
    fn drop(&mut self) {
        log::info!("Released camera {}", self.device);
    }
}

/// Whether a packet arrived. End of stream and a not-yet-ready device are a
/// miss for this tick; anything else is a read failure.
fn packet_read(result: Result<(), ffmpeg_next::Error>) -> Result<bool, CameraError> {
    match result {
        Ok(()) => Ok(true),
        Err(ffmpeg_next::Error::Eof) => Ok(false),
        Err(ffmpeg_next::Error::Other {
            errno: ffmpeg_next::error::EAGAIN,
        }) => Ok(false),
        Err(e) => Err(CameraError::Read(e)),
    }
}

/// Maps a camera index to the libavdevice backend and device URL.
fn device_locator(index: u32) -> Result<(&'static str, String), CameraError> {
    #[cfg(target_os = "linux")]
    {
        Ok(("video4linux2", format!("/dev/video{index}")))
    }
    #[cfg(target_os = "macos")]
    {
        Ok(("avfoundation", index.to_string()))
    }
    #[cfg(not(any(target_os = "linux", target_os = "macos")))]
    {
        let _ = index;
        Err(CameraError::Unsupported)
    }
}

/// Copies the RGB24 plane row by row, dropping ffmpeg's line padding.
fn extract_rgb_pixels(rgb_frame: &Video, width: u32, height: u32) -> Vec<u8> {
    let stride = rgb_frame.stride(0);
    let data = rgb_frame.data(0);
    let row_len = width as usize * Frame::CHANNELS;

    let mut pixels = Vec::with_capacity(row_len * height as usize);
    for row in 0..height as usize {
        let row_start = row * stride;
        pixels.extend_from_slice(&data[row_start..row_start + row_len]);
    }
    pixels
}
