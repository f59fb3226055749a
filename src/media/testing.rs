use super::{Decoder, Encoder, Frame, Frames, IconQuality, SourceItem};
use crate::ffmpeg::Ffmpeg;
use crate::prelude::*;
use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Records the arguments of every invocation and pretends it produced some bytes
#[derive(Debug, Default)]
pub(crate) struct RecordingFfmpeg {
    args_log: Mutex<Vec<Vec<String>>>,

    /// Number of empty files written when the output is a frame sequence
    frames: usize,
}

impl RecordingFfmpeg {
    pub(crate) fn new() -> Arc<Self> {
        Arc::default()
    }

    pub(crate) fn writing_frames(frames: usize) -> Arc<Self> {
        Arc::new(Self {
            frames,
            ..Default::default()
        })
    }

    pub(crate) fn calls(&self) -> Vec<Vec<String>> {
        self.args_log.lock().unwrap().clone()
    }
}

#[async_trait]
impl Ffmpeg for RecordingFfmpeg {
    async fn run(&self, args: Vec<String>) -> Result<Vec<u8>> {
        let sequence = args
            .last()
            .and_then(|output| output.strip_suffix("%04d.png"))
            .map(ToOwned::to_owned);

        self.args_log.lock().unwrap().push(args);

        if let Some(prefix) = sequence {
            for i in 1..=self.frames {
                fs::write(format!("{prefix}{i:04}.png"), b"").await?;
            }
        }

        Ok(vec![0; 16])
    }

    async fn run_with_output_file(
        &self,
        args: Vec<String>,
        output_file: &Utf8Path,
    ) -> Result<Vec<u8>> {
        let mut args = args;
        args.push(output_file.to_string());
        self.run(args).await
    }

    async fn probe_duration(&self, _input: &Utf8Path) -> Result<Option<Duration>> {
        Ok(Some(Duration::from_secs(3)))
    }
}

type SizeFn = dyn Fn(usize, u32) -> usize + Send + Sync;

/// Codec that fabricates frames and produces zero-filled outputs whose size
/// is computed from the encoding parameters.
pub(crate) struct MockCodec {
    /// Number of frames every animated item decodes into
    pub(crate) animated_frames: usize,
    pub(crate) duration: Duration,

    /// Output size by frame count and quality
    pub(crate) webp_size: Box<SizeFn>,
    pub(crate) icon_size: Box<dyn Fn(IconQuality) -> usize + Send + Sync>,

    /// Locators of the items that fail to decode
    pub(crate) broken: HashSet<String>,

    /// Every icon encoding fails
    pub(crate) broken_icons: bool,

    pub(crate) log: Mutex<MockCodecLog>,
}

#[derive(Debug, Default, Clone)]
pub(crate) struct MockCodecLog {
    /// `(frames, quality, frame_rate)` of every webp encoding
    pub(crate) webp: Vec<(usize, u32, f64)>,
    pub(crate) icons: Vec<IconQuality>,
    pub(crate) decoded: Vec<String>,
}

impl std::fmt::Debug for MockCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockCodec")
            .field("animated_frames", &self.animated_frames)
            .field("broken", &self.broken)
            .finish_non_exhaustive()
    }
}

impl MockCodec {
    pub(crate) fn new(webp_size: impl Fn(usize, u32) -> usize + Send + Sync + 'static) -> Self {
        Self {
            animated_frames: 90,
            duration: Duration::from_secs(3),
            webp_size: Box::new(webp_size),
            icon_size: Box::new(|_| 1024),
            broken: HashSet::new(),
            broken_icons: false,
            log: Default::default(),
        }
    }

    pub(crate) fn log(&self) -> MockCodecLog {
        self.log.lock().unwrap().clone()
    }

    pub(crate) fn frames(count: usize) -> Vec<Frame> {
        (0..count)
            .map(|i| Frame {
                path: format!("frames/{:04}.png", i + 1).into(),
            })
            .collect()
    }
}

#[async_trait]
impl Decoder for MockCodec {
    async fn decode(&self, item: &SourceItem, _bytes: &[u8]) -> Result<Frames> {
        self.log.lock().unwrap().decoded.push(item.locator.clone());

        if self.broken.contains(&item.locator) {
            bail!("Mock decoding failure of `{}`", item.locator);
        }

        if !item.kind.is_animated() {
            return Ok(Frames::new(Self::frames(1), Duration::ZERO, None));
        }

        Ok(Frames::new(
            Self::frames(self.animated_frames),
            self.duration,
            None,
        ))
    }
}

#[async_trait]
impl Encoder for MockCodec {
    async fn encode_webp(
        &self,
        frames: &[Frame],
        quality: u32,
        frame_rate: f64,
    ) -> Result<Vec<u8>> {
        self.log
            .lock()
            .unwrap()
            .webp
            .push((frames.len(), quality, frame_rate));

        Ok(vec![0; (self.webp_size)(frames.len(), quality)])
    }

    async fn encode_icon(&self, _frame: &Frame, quality: IconQuality) -> Result<Vec<u8>> {
        self.log.lock().unwrap().icons.push(quality);

        if self.broken_icons {
            bail!("Mock icon encoding failure");
        }

        Ok(vec![0; (self.icon_size)(quality)])
    }
}
