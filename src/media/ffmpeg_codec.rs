use super::lottie::{self, Lottie, LottieRenderer};
use super::{Decoder, Encoder, Frame, Frames, IconQuality, MediaKind, SourceItem};
use crate::ffmpeg::Ffmpeg;
use crate::prelude::*;
use crate::util::iter;
use crate::util::path::Utf8TempDir;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

/// Both decoded and staged frames are written with this pattern
const FRAME_PATTERN: &str = "%04d.png";

/// Effort that libwebp puts into compression, `6` is the slowest and the best one
const WEBP_COMPRESSION_LEVEL: &str = "6";

#[derive(Debug)]
pub(crate) struct FfmpegCodec {
    ffmpeg: Arc<dyn Ffmpeg>,
    sticker_side: u32,
    icon_side: u32,

    /// Vector animations can't be decoded without it
    lottie: Option<Arc<dyn LottieRenderer>>,
}

impl FfmpegCodec {
    pub(crate) fn new(ffmpeg: Arc<dyn Ffmpeg>, sticker_side: u32, icon_side: u32) -> Self {
        Self {
            ffmpeg,
            sticker_side,
            icon_side,
            lottie: None,
        }
    }

    pub(crate) fn with_lottie(mut self, lottie: Option<Arc<dyn LottieRenderer>>) -> Self {
        self.lottie = lottie;
        self
    }

    /// Fits the image into the square bounding box and pads the rest
    /// with transparent pixels.
    fn fit_filter(&self) -> String {
        let side = self.sticker_side;

        // The scale filter expression is inspired by this answer:
        // https://superuser.com/a/547406
        format!(
            "scale=\
            iw * min({side} / iw\\, {side} / ih):\
            ih * min({side} / iw\\, {side} / ih):\
            flags=lanczos,\
            format=rgba,\
            pad={side}:{side}:-1:-1:color=0x00000000"
        )
    }

    fn decode_args(
        &self,
        kind: MediaKind,
        input: &Utf8Path,
        frames_dir: &Utf8Path,
    ) -> Vec<String> {
        // The native ffmpeg VP9 decoder drops the alpha channel
        let decoder = (input.extension() == Some("webm")).then(|| "libvpx-vp9".to_owned());

        let kind_args: &[&str] = match kind {
            MediaKind::StaticImage => &["-frames:v", "1"],
            MediaKind::VectorAnimation | MediaKind::Video => &["-fps_mode", "passthrough"],
        };

        iter::optional_named_arg("-c:v", decoder)
            .chain(iter::strs(["-y", "-i", input.as_str()]))
            .chain(iter::strs(kind_args))
            .chain(iter::strs(["-an", "-filter:v"]))
            .chain([self.fit_filter(), frames_dir.join(FRAME_PATTERN).into_string()])
            .collect()
    }

    /// Fits the frames rendered from a lottie animation the same way as
    /// the decoded ones.
    fn rendered_args(
        &self,
        frame_rate: f64,
        rendered: &Utf8Path,
        frames_dir: &Utf8Path,
    ) -> Vec<String> {
        let input = rendered.join(FRAME_PATTERN).into_string();
        let frame_rate = frame_rate.to_string();

        iter::strs(["-y", "-framerate", frame_rate.as_str(), "-i", input.as_str()])
            .chain(iter::strs(["-fps_mode", "passthrough", "-an", "-filter:v"]))
            .chain([self.fit_filter(), frames_dir.join(FRAME_PATTERN).into_string()])
            .collect()
    }

    fn webp_args(
        &self,
        frames_dir: &Utf8Path,
        count: usize,
        quality: u32,
        frame_rate: f64,
    ) -> Vec<String> {
        let input = frames_dir.join(FRAME_PATTERN).into_string();
        let quality = quality.to_string();

        if count == 1 {
            return iter::strs(["-y", "-i", input.as_str(), "-c:v", "libwebp"])
                .chain(iter::strs(["-lossless", "0", "-quality", quality.as_str()]))
                .chain(iter::strs(["-compression_level", WEBP_COMPRESSION_LEVEL, "-an"]))
                .collect();
        }

        let frame_rate = frame_rate.to_string();

        iter::strs(["-y", "-framerate", frame_rate.as_str(), "-i", input.as_str()])
            .chain(iter::strs(["-c:v", "libwebp_anim", "-lossless", "0"]))
            .chain(iter::strs(["-quality", quality.as_str()]))
            .chain(iter::strs(["-compression_level", WEBP_COMPRESSION_LEVEL]))
            .chain(iter::strs(["-loop", "0", "-an"]))
            .collect()
    }

    fn icon_args(&self, frame: &Frame, quality: IconQuality) -> Vec<String> {
        let side = self.icon_side;
        let scale = format!("scale={side}:{side}:flags=lanczos");

        let filter = match quality {
            IconQuality::Full => scale,
            IconQuality::Reduced => format!(
                "{scale},split[a][b];[a]palettegen=reserve_transparent=1[p];[b][p]paletteuse"
            ),
        };

        iter::strs(["-y", "-i", frame.path.as_str(), "-filter:v"])
            .chain([filter])
            .chain(iter::strs(["-c:v", "png", "-compression_level", "9"]))
            .collect()
    }

    /// Copies the frames into a fresh directory so that their names form a
    /// contiguous sequence which ffmpeg's image demuxer can read.
    async fn stage_frames(&self, frames: &[Frame]) -> Result<Utf8TempDir> {
        let dir = Utf8TempDir::new("wastick-encode")?;

        for (i, frame) in frames.iter().enumerate() {
            let staged = dir.join(format!("{:04}.png", i + 1));
            if fs::hard_link(&frame.path, &staged).await.is_err() {
                fs::copy(&frame.path, &staged).await?;
            }
        }

        Ok(dir)
    }

    /// Renders the lottie animation into PNG frames and fits them into the
    /// bounding box.
    async fn decode_lottie(&self, item: &SourceItem, bytes: &[u8]) -> Result<Frames> {
        let renderer = self.lottie.clone().with_context(|| {
            format!(
                "Vector animation `{}` can't be decoded, this build has no \
                lottie renderer (enable the `lottie` feature)",
                item.file_name
            )
        })?;

        let animation = Lottie::from_tgs(bytes)
            .with_context(|| format!("Failed to unpack `{}`", item.file_name))?;

        let frame_rate = animation.frame_rate;

        debug!(
            json_bytes = animation.json.len(),
            width = animation.width,
            height = animation.height,
            frame_rate,
            frames = animation.frame_count,
            "Rendering the lottie animation"
        );

        let dir = Utf8TempDir::new("wastick-decode")?;

        let rendered = dir.join("rendered");
        fs::create_dir(&rendered).await?;

        let frames_dir = dir.join("frames");
        fs::create_dir(&frames_dir).await?;

        let output = rendered.clone();
        let count = tokio::task::spawn_blocking(move || {
            lottie::render_to_dir(renderer.as_ref(), &animation, &output)
        })
        .await
        .context("Failed to join the blocking task that renders the animation")?
        .with_context(|| format!("Failed to render `{}`", item.file_name))?;

        debug!(frames = count, "Rendered");

        self.ffmpeg
            .run(self.rendered_args(frame_rate, &rendered, &frames_dir))
            .await
            .with_context(|| format!("Failed to fit the frames of `{}`", item.file_name))?;

        let frames = decoded_frames(item, &frames_dir).await?;

        Ok(Frames::with_frame_rate(frames, Some(frame_rate), Some(dir)))
    }
}

async fn decoded_frames(item: &SourceItem, frames_dir: &Utf8Path) -> Result<Vec<Frame>> {
    let frames = crate::fs::files(frames_dir)
        .await?
        .into_iter()
        .sorted()
        .map(|path| Frame { path })
        .collect_vec();

    ensure!(!frames.is_empty(), "No frames were decoded from `{}`", item.file_name);

    debug!(frames = frames.len(), "Decoded");

    Ok(frames)
}

#[async_trait]
impl Decoder for FfmpegCodec {
    #[instrument(skip_all, fields(file = %item.file_name, kind = %item.kind))]
    async fn decode(&self, item: &SourceItem, bytes: &[u8]) -> Result<Frames> {
        if item.kind == MediaKind::VectorAnimation {
            return self.decode_lottie(item, bytes).await;
        }

        let dir = Utf8TempDir::new("wastick-decode")?;

        let extension = Utf8Path::new(&item.file_name).extension().unwrap_or("bin");
        let input = dir.join(format!("source.{extension}"));
        fs::write(&input, bytes).await?;

        let frames_dir = dir.join("frames");
        fs::create_dir(&frames_dir).await?;

        self.ffmpeg
            .run(self.decode_args(item.kind, &input, &frames_dir))
            .await
            .with_context(|| format!("Failed to decode `{}`", item.file_name))?;

        let frames = decoded_frames(item, &frames_dir).await?;

        if !item.kind.is_animated() {
            return Ok(Frames::new(frames, Duration::ZERO, Some(dir)));
        }

        match self.ffmpeg.probe_duration(&input).await? {
            Some(duration) => Ok(Frames::new(frames, duration, Some(dir))),
            None => Ok(Frames::with_frame_rate(frames, item.frame_rate, Some(dir))),
        }
    }
}

#[async_trait]
impl Encoder for FfmpegCodec {
    async fn encode_webp(
        &self,
        frames: &[Frame],
        quality: u32,
        frame_rate: f64,
    ) -> Result<Vec<u8>> {
        ensure!(!frames.is_empty(), "Can't encode an image without frames");

        let staged = self.stage_frames(frames).await?;
        let args = self.webp_args(staged.path(), frames.len(), quality, frame_rate);

        self.ffmpeg
            .run_with_output_file(args, &staged.join("output.webp"))
            .await
    }

    async fn encode_icon(&self, frame: &Frame, quality: IconQuality) -> Result<Vec<u8>> {
        let dir = Utf8TempDir::new("wastick-icon")?;

        self.ffmpeg
            .run_with_output_file(self.icon_args(frame, quality), &dir.join("icon.png"))
            .await
    }
}
