use crate::util::byte_size::KIB;
use std::ops::RangeInclusive;
use std::time::Duration;

/// Whatsapp doesn't accept packs with more stickers than this.
pub(crate) const MAX_STICKERS_PER_PACK: usize = 30;

const MAX_STATIC_BYTES: usize = 100 * KIB;
const MAX_ANIMATED_BYTES: usize = 500 * KIB;
const MAX_ICON_BYTES: usize = 50 * KIB;

const STICKER_SIDE: u32 = 512;
const ICON_SIDE: u32 = 96;

/// Average time it takes to convert a whole pack. Used only for wait estimates.
const AVERAGE_JOB_TIME: Duration = Duration::from_secs(150);

/// Constraints of the destination platform and the knobs of the size search.
#[derive(Debug, Clone)]
pub(crate) struct Limits {
    pub(crate) max_stickers_per_pack: usize,

    pub(crate) max_static_bytes: usize,
    pub(crate) max_animated_bytes: usize,
    pub(crate) max_icon_bytes: usize,

    pub(crate) sticker_side: u32,
    pub(crate) icon_side: u32,

    /// The static search tries these qualities in order
    pub(crate) static_qualities: Vec<u32>,

    /// The animated search aims at this size range. Its upper bound stays
    /// below [`Self::max_animated_bytes`] to leave some margin.
    pub(crate) animated_window: RangeInclusive<usize>,
    pub(crate) max_frames: usize,
    pub(crate) default_quality: u32,
    pub(crate) high_qualities: RangeInclusive<u32>,
    pub(crate) low_qualities: RangeInclusive<u32>,

    pub(crate) average_job_time: Duration,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_stickers_per_pack: MAX_STICKERS_PER_PACK,
            max_static_bytes: MAX_STATIC_BYTES,
            max_animated_bytes: MAX_ANIMATED_BYTES,
            max_icon_bytes: MAX_ICON_BYTES,
            sticker_side: STICKER_SIDE,
            icon_side: ICON_SIDE,
            static_qualities: (10..=95).rev().step_by(5).collect(),
            animated_window: 400 * KIB..=450 * KIB,
            max_frames: 60,
            default_quality: 80,
            high_qualities: 40..=80,
            low_qualities: 1..=40,
            average_job_time: AVERAGE_JOB_TIME,
        }
    }
}
