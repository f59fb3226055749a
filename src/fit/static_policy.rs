use super::{Attempt, Encoded, SizeFit};
use crate::display;
use crate::media::Frame;
use crate::prelude::*;
use std::slice;

/// A single frame has no playback rate, but the encoder wants one anyway
const STILL_FRAME_RATE: f64 = 1.0;

impl SizeFit {
    /// Walks the configured qualities down and returns the first encoding
    /// that fits into the static limit. Falls back to the lowest quality.
    pub(crate) async fn fit_static(&self, frame: &Frame) -> Result<Encoded> {
        let max_bytes = self.limits.max_static_bytes;
        let mut lowest = None;

        for &quality in &self.limits.static_qualities {
            let attempt = Attempt::new(1, quality);
            let encoded = self
                .encode(slice::from_ref(frame), attempt, STILL_FRAME_RATE, max_bytes)
                .await?;

            if encoded.len() <= max_bytes {
                return Ok(encoded);
            }

            lowest = Some(encoded);
        }

        let lowest = lowest.context("No qualities are configured for static images")?;

        debug!(
            "Even the lowest quality Q{} doesn't fit into {}",
            lowest.attempt.quality,
            display::bold_human_size(max_bytes),
        );

        Ok(lowest)
    }
}
