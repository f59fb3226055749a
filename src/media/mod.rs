//! Decoded media and the codec capabilities the conversion relies on.

mod ffmpeg_codec;
pub(crate) mod lottie;

#[cfg(test)]
pub(crate) mod testing;

use crate::prelude::*;
use crate::util::path::Utf8TempDir;
use async_trait::async_trait;
use std::fmt;
use std::time::Duration;

pub(crate) use ffmpeg_codec::FfmpegCodec;

/// Frame rate assumed for the animations that don't report their duration
const FALLBACK_FRAME_RATE: f64 = 30.0;

#[derive(strum::Display, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[strum(serialize_all = "kebab-case")]
pub(crate) enum MediaKind {
    StaticImage,
    /// Lottie animation, `.tgs` in telegram
    VectorAnimation,
    Video,
}

impl MediaKind {
    pub(crate) fn from_file_name(file_name: &str) -> Self {
        let extension = Utf8Path::new(file_name)
            .extension()
            .map(str::to_ascii_lowercase);

        match extension.as_deref() {
            Some("tgs") => Self::VectorAnimation,
            Some("webm" | "mp4" | "gif" | "mov" | "mkv") => Self::Video,
            _ => Self::StaticImage,
        }
    }

    pub(crate) fn is_animated(self) -> bool {
        match self {
            Self::StaticImage => false,
            Self::VectorAnimation | Self::Video => true,
        }
    }
}

/// A single sticker of a source pack
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct SourceItem {
    /// Opaque to the core. Only the [`crate::platform::PackSource`] that
    /// produced the item knows how to fetch it.
    pub(crate) locator: String,
    pub(crate) file_name: String,
    pub(crate) kind: MediaKind,
    pub(crate) frame_rate: Option<f64>,
}

impl SourceItem {
    pub(crate) fn new(locator: impl Into<String>, file_name: impl Into<String>) -> Self {
        let file_name = file_name.into();
        Self {
            locator: locator.into(),
            kind: MediaKind::from_file_name(&file_name),
            file_name,
            frame_rate: None,
        }
    }
}

/// A decoded raster image, already fitted into the sticker bounding box
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Frame {
    pub(crate) path: Utf8PathBuf,
}

/// Decoded frames of one source item together with its playback duration.
#[derive(Debug)]
pub(crate) struct Frames {
    frames: Vec<Frame>,
    duration: Duration,

    /// Holds the decoded files on disk for as long as the frames are alive
    _dir: Option<Utf8TempDir>,
}

impl Frames {
    pub(crate) fn new(frames: Vec<Frame>, duration: Duration, dir: Option<Utf8TempDir>) -> Self {
        Self {
            frames,
            duration,
            _dir: dir,
        }
    }

    /// Derives the duration from the native frame rate when the container
    /// doesn't report one.
    pub(crate) fn with_frame_rate(
        frames: Vec<Frame>,
        frame_rate: Option<f64>,
        dir: Option<Utf8TempDir>,
    ) -> Self {
        let frame_rate = frame_rate
            .filter(|rate| rate.is_finite() && *rate > 0.0)
            .unwrap_or(FALLBACK_FRAME_RATE);

        let duration = Duration::from_secs_f64(frames.len() as f64 / frame_rate);

        Self::new(frames, duration, dir)
    }

    pub(crate) fn as_slice(&self) -> &[Frame] {
        &self.frames
    }

    pub(crate) fn len(&self) -> usize {
        self.frames.len()
    }

    pub(crate) fn first(&self) -> Option<&Frame> {
        self.frames.first()
    }

    pub(crate) fn duration(&self) -> Duration {
        self.duration
    }
}

#[derive(strum::Display, Debug, Clone, Copy, PartialEq, Eq)]
#[strum(serialize_all = "kebab-case")]
pub(crate) enum IconQuality {
    Full,
    /// Palette-quantized, noticeably smaller
    Reduced,
}

#[async_trait]
pub(crate) trait Decoder: fmt::Debug + Send + Sync {
    /// Decodes the item into frames that fit into the sticker bounding box.
    async fn decode(&self, item: &SourceItem, bytes: &[u8]) -> Result<Frames>;
}

#[async_trait]
pub(crate) trait Encoder: fmt::Debug + Send + Sync {
    /// Encodes the frames as a webp image. Animated if there is more than
    /// one frame, in which case they are played at `frame_rate` frames per second.
    async fn encode_webp(&self, frames: &[Frame], quality: u32, frame_rate: f64)
        -> Result<Vec<u8>>;

    /// Encodes the frame as a PNG pack icon.
    async fn encode_icon(&self, frame: &Frame, quality: IconQuality) -> Result<Vec<u8>>;
}
