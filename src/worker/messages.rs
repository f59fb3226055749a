//! Texts sent to the requester over the course of a job.

use crate::display;
use crate::platform::{PackSelector, SourcePack};
use crate::queue::{Position, QueueStats};
use std::time::Duration;

pub(crate) fn queued(selector: &PackSelector, position: Position, wait: Duration) -> String {
    format!(
        "✅ Added to conversion queue!\n\n\
        📦 Pack: {selector}\n\
        📍 Position: {position}\n\
        ⏰ Estimated wait: {}\n\n\
        I'll notify you when the conversion starts!",
        display::wait_time(wait),
    )
}

pub(crate) fn already_queued(position: Position, wait: Duration) -> String {
    format!(
        "⏳ You're already in the queue!\n\n\
        Position: {position}\n\
        Estimated wait: {}",
        display::wait_time(wait),
    )
}

pub(crate) fn queue_position(position: Position, stats: &QueueStats, wait: Duration) -> String {
    format!(
        "📊 Queue Status\n\n\
        Your position: {position}\n\
        Total in queue: {}\n\
        Estimated wait: {}",
        stats.total(),
        display::wait_time(wait),
    )
}

pub(crate) fn not_in_queue(stats: &QueueStats) -> String {
    let processing = if stats.is_processing() { "Yes" } else { "No" };
    format!(
        "📊 Queue Status\n\n\
        You're not currently in the queue.\n\
        Total users waiting: {}\n\
        Currently processing: {processing}",
        stats.waiting,
    )
}

pub(crate) fn started(selector: &PackSelector) -> String {
    format!(
        "🚀 Starting conversion for pack: {selector}\n\n\
        Please wait while I download and convert the stickers..."
    )
}

pub(crate) fn not_found(selector: &PackSelector) -> String {
    format!(
        "❌ Failed to find sticker pack: {selector}\n\n\
        Please make sure the pack name is correct and the pack is public."
    )
}

pub(crate) fn details(pack: &SourcePack, bundles: usize) -> String {
    format!(
        "📊 Pack Details:\n\
        • Name: {}\n\
        • Total stickers: {}\n\
        • Will create {bundles} .wastickers file(s)\n\n\
        🔄 Converting stickers...",
        pack.title,
        pack.items.len(),
    )
}

pub(crate) fn bundle_caption(part: usize, parts: usize, size: u64) -> String {
    format!("📦 Part {part}/{parts} - {}", display::human_size(size))
}

pub(crate) fn completed(bundles: usize) -> String {
    format!(
        "✅ Conversion completed successfully!\n\n\
        📁 Generated {bundles} file(s)\n\n\
        📱 To import to WhatsApp:\n\
        1. Download a 'Sticker Maker' app\n\
        2. Import the .wastickers file(s)\n\
        3. Add to WhatsApp following the app's instructions\n\n\
        🎉 Enjoy your stickers!"
    )
}

pub(crate) fn conversion_failed(selector: &PackSelector) -> String {
    format!(
        "❌ Failed to convert sticker pack: {selector}\n\n\
        This might be due to:\n\
        • Pack contains unsupported formats\n\
        • Network issues\n\
        • Pack is private or restricted\n\n\
        Please try again later."
    )
}

pub(crate) const UNEXPECTED_ERROR: &str =
    "❌ An error occurred during conversion.\n\nPlease try again later.";
