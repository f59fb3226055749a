use crate::media::Frame;
use std::time::Duration;

/// Used when the animation reports no duration at all
const FALLBACK_FRAME_RATE: f64 = 30.0;

/// Evenly spaced indices spanning `[0, total - 1]`. The first and the last
/// frames are always kept when `count >= 2`.
pub(crate) fn indices(total: usize, count: usize) -> Vec<usize> {
    if total == 0 || count == 0 {
        return vec![];
    }
    if count >= total {
        return (0..total).collect();
    }
    if count == 1 {
        return vec![0];
    }
    (0..count).map(|i| i * (total - 1) / (count - 1)).collect()
}

pub(crate) fn frames(frames: &[Frame], count: usize) -> Vec<Frame> {
    indices(frames.len(), count)
        .into_iter()
        .map(|i| frames[i].clone())
        .collect()
}

/// Frame rate that makes `count` frames play for the whole `duration`
pub(crate) fn frame_rate(count: usize, duration: Duration) -> f64 {
    if duration.is_zero() {
        return FALLBACK_FRAME_RATE;
    }
    count as f64 / duration.as_secs_f64()
}
