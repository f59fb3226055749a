//! Size search for animations.
//!
//! The output is expected to land in a byte window a bit below the platform
//! limit. We first cut the number of frames because dropped frames only make
//! the animation less smooth, while lower quality degrades every frame.
//! The search goes through a fixed ladder of stages, each of them is a
//! bounded binary search, so the total number of encodings is bounded too:
//!
//! 1. Initial frames (capped) at the default quality
//! 2. Frame count in the upper half of the range at the default quality
//! 3. Quality in the high range at the pivot frame count
//! 4. Frame count in the lower half of the range at the lowest high quality
//! 5. Quality in the low range with a single frame
//! 6. A single frame at the lowest quality, unconditionally

use super::{select, Attempt, Encoded, SizeFit};
use crate::display;
use crate::media::Frames;
use crate::prelude::*;
use std::collections::HashMap;
use std::fmt;
use std::ops::RangeInclusive;
use std::time::Instant;

/// The parameter that the binary search varies, the other one stays fixed
#[derive(Debug, Clone, Copy)]
enum Axis {
    Frames { quality: u32 },
    Quality { frames: usize },
}

impl Axis {
    fn attempt(self, value: u32) -> Attempt {
        match self {
            Self::Frames { quality } => Attempt::new(value as usize, quality),
            Self::Quality { frames } => Attempt::new(frames, value),
        }
    }
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Frames { quality } => write!(f, "frame count @ Q{quality}"),
            Self::Quality { frames } => write!(f, "quality @ {frames} frames"),
        }
    }
}

impl SizeFit {
    pub(crate) async fn fit_animated(&self, frames: &Frames) -> Result<Encoded> {
        let start = Instant::now();

        let window = self.limits.animated_window.clone();

        info!(
            "🚀 Trying to fit {} frames into {}..={}",
            frames.len(),
            display::bold_human_size(*window.start()),
            display::bold_human_size(*window.end()),
        );

        let mut search = AnimatedSearch {
            fit: self,
            frames,
            window,
            cache: HashMap::new(),
            smallest: None,
        };

        let encoded = search.run().await?;

        info!(
            "🎉 Settled on {} at {:.2} fps, which generates {} in {}",
            display::bold(&encoded.attempt),
            encoded.frame_rate,
            display::bold_human_size(encoded.len()),
            display::elapsed(start),
        );

        Ok(encoded)
    }
}

struct AnimatedSearch<'a> {
    fit: &'a SizeFit,
    frames: &'a Frames,
    window: RangeInclusive<usize>,

    /// Every encoding made so far. Stages may probe the same point again.
    cache: HashMap<Attempt, Encoded>,

    /// The smallest encoding made so far, the answer of the last resort
    smallest: Option<Encoded>,
}

impl AnimatedSearch<'_> {
    async fn run(&mut self) -> Result<Encoded> {
        ensure!(self.frames.len() > 0, "Can't encode an animation without frames");

        let limits = &self.fit.limits;

        let top = self.frames.len().min(limits.max_frames.max(1));
        let top = u32::try_from(top).context("Too many frames in the animation")?;
        let pivot = (top / 2).max(1);

        let default_quality = limits.default_quality;
        let high_qualities = limits.high_qualities.clone();
        let low_qualities = limits.low_qualities.clone();

        let initial = self
            .evaluate(Attempt::new(top as usize, default_quality))
            .await?;

        if initial.len() <= *self.window.end() {
            return Ok(initial);
        }

        debug!("Too big, cutting the frames first");

        let stages = [
            (Axis::Frames { quality: default_quality }, pivot..=top),
            (Axis::Quality { frames: pivot as usize }, high_qualities.clone()),
            (Axis::Frames { quality: *high_qualities.start() }, 1..=pivot),
            (Axis::Quality { frames: 1 }, low_qualities.clone()),
        ];

        for (axis, range) in stages {
            if let Some(found) = self.search(axis, range).await? {
                return Ok(found);
            }
        }

        warn!("Nothing fits, falling back to a single frame at the lowest quality");

        let last_resort = self
            .evaluate(Attempt::new(1, *low_qualities.start()))
            .await?;

        if last_resort.len() <= *self.window.end() {
            return Ok(last_resort);
        }

        let smallest = self
            .smallest
            .take()
            .filter(|smallest| smallest.len() < last_resort.len());

        Ok(smallest.unwrap_or(last_resort))
    }

    /// Binary search over the inclusive range. Returns the first encoding
    /// that hits the window, otherwise the biggest one below the window.
    /// Encodings above the window are never returned.
    async fn search(
        &mut self,
        axis: Axis,
        range: RangeInclusive<u32>,
    ) -> Result<Option<Encoded>> {
        let (mut low, mut high) = range.into_inner();

        // Zero frames can't be encoded
        if let Axis::Frames { .. } = axis {
            low = low.max(1);
        }

        debug!(%axis, low, high, "Searching");

        let mut best: Option<Encoded> = None;

        while low <= high {
            let mid = low + (high - low) / 2;

            let encoded = self.evaluate(axis.attempt(mid)).await?;
            let size = encoded.len();

            if self.window.contains(&size) {
                return Ok(Some(encoded));
            }

            if size < *self.window.start() {
                // Later candidates below the window are closer to it
                if best.as_ref().map_or(true, |best| size >= best.len()) {
                    best = Some(encoded);
                }
                low = mid + 1;
            } else {
                let Some(next) = mid.checked_sub(1) else {
                    break;
                };
                high = next;
            }
        }

        Ok(best)
    }

    async fn evaluate(&mut self, attempt: Attempt) -> Result<Encoded> {
        if let Some(cached) = self.cache.get(&attempt) {
            debug!(%attempt, size = %display::human_size(cached.len()), "Using cached output");
            return Ok(cached.clone());
        }

        let frames = select::frames(self.frames.as_slice(), attempt.frames);
        let frame_rate = select::frame_rate(frames.len(), self.frames.duration());

        let encoded = self
            .fit
            .encode(&frames, attempt, frame_rate, *self.window.end())
            .await?;

        let is_smallest = self
            .smallest
            .as_ref()
            .map_or(true, |smallest| encoded.len() < smallest.len());

        if is_smallest {
            self.smallest = Some(encoded.clone());
        }

        self.cache.insert(attempt, encoded.clone());

        Ok(encoded)
    }
}
