//! Encoding that fits the output into the byte limits of the platform.
//!
//! Static images only have a quality knob, so we walk it down until the
//! output fits. Animations additionally trade the number of frames for size,
//! see [`animated`] for the search ladder.

mod animated;
mod select;
mod static_policy;

use crate::display;
use crate::limits::Limits;
use crate::media::{Encoder, Frame, Frames, MediaKind};
use crate::prelude::*;
use std::fmt;
use std::sync::Arc;
use std::time::Instant;

/// A point in the search space
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct Attempt {
    pub(crate) frames: usize,
    pub(crate) quality: u32,
}

impl Attempt {
    pub(crate) fn new(frames: usize, quality: u32) -> Self {
        Self { frames, quality }
    }
}

impl fmt::Display for Attempt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Self { frames, quality } = self;
        let frames_noun = if *frames == 1 { "frame" } else { "frames" };
        write!(f, "{frames} {frames_noun} @ Q{quality}")
    }
}

#[derive(Debug, Clone)]
pub(crate) struct Encoded {
    pub(crate) attempt: Attempt,
    pub(crate) frame_rate: f64,
    pub(crate) bytes: Arc<[u8]>,
}

impl Encoded {
    pub(crate) fn len(&self) -> usize {
        self.bytes.len()
    }
}

pub(crate) struct SizeFit {
    encoder: Arc<dyn Encoder>,
    limits: Arc<Limits>,
}

impl SizeFit {
    pub(crate) fn new(encoder: Arc<dyn Encoder>, limits: Arc<Limits>) -> Self {
        Self { encoder, limits }
    }

    /// Maximum size of the artifact the platform accepts for the given kind of media
    pub(crate) fn ceiling(&self, kind: MediaKind) -> usize {
        if kind.is_animated() {
            self.limits.max_animated_bytes
        } else {
            self.limits.max_static_bytes
        }
    }

    /// Picks the search policy by the kind of media. Always returns some
    /// encoding unless the encoder itself fails. The returned encoding
    /// may exceed the [`Self::ceiling`] if nothing smaller could be produced.
    pub(crate) async fn fit(&self, kind: MediaKind, frames: &Frames) -> Result<Encoded> {
        let encoded = if kind.is_animated() {
            self.fit_animated(frames).await?
        } else {
            let frame = frames
                .first()
                .context("There are no frames in the decoded image")?;
            self.fit_static(frame).await?
        };

        let ceiling = self.ceiling(kind);

        if encoded.len() > ceiling {
            warn!(
                "The output of {} exceeds the limit of {} and is likely to be rejected",
                display::bold_human_size(encoded.len()),
                display::bold_human_size(ceiling),
            );
        }

        Ok(encoded)
    }

    async fn encode(
        &self,
        frames: &[Frame],
        attempt: Attempt,
        frame_rate: f64,
        max_bytes: usize,
    ) -> Result<Encoded> {
        let start = Instant::now();

        let bytes = self
            .encoder
            .encode_webp(frames, attempt.quality, frame_rate)
            .await
            .with_context(|| format!("Failed to encode {attempt}"))?;

        let encoded = Encoded {
            attempt,
            frame_rate,
            bytes: bytes.into(),
        };

        let (checkbox, color) = if encoded.len() > max_bytes {
            ('❌', nu_ansi_term::Color::Red)
        } else {
            ('✅', nu_ansi_term::Color::Green)
        };

        let size_display = color.bold().paint(display::human_size(encoded.len()));
        let elapsed = display::elapsed(start);

        info!("{checkbox} {attempt} generated {size_display} in {elapsed}");

        Ok(encoded)
    }
}
