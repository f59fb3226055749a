use nu_ansi_term::{Color, Style};
use std::fmt;
use std::time::{Duration, Instant};

pub(crate) fn human_size(bytes: impl humansize::ToF64 + humansize::Unsigned) -> String {
    humansize::format_size(bytes, humansize::BINARY)
}

pub(crate) fn bold(value: &dyn fmt::Display) -> String {
    Style::new().bold().paint(value.to_string()).to_string()
}

pub(crate) fn bold_human_size(bytes: usize) -> String {
    bold(&human_size(bytes))
}

pub(crate) fn path(path: &dyn fmt::Display) -> String {
    Color::Magenta.bold().paint(path.to_string()).to_string()
}

pub(crate) fn elapsed(start: Instant) -> String {
    bold(&format_args!("{:.2?}", start.elapsed()))
}

/// Human-readable wait estimate, e.g. `5 minutes` or `1.3 hours`.
pub(crate) fn wait_time(wait: Duration) -> String {
    let minutes = wait.as_secs_f64() / 60.0;

    if minutes < 1.0 {
        return "Less than 1 minute".to_owned();
    }
    if minutes < 60.0 {
        return format!("{} minutes", minutes as u64);
    }
    format!("{:.1} hours", minutes / 60.0)
}
