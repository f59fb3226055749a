mod cmd;
mod display;
mod ffmpeg;
mod fit;
mod fs;
mod library;
mod limits;
mod media;
mod pack;
mod platform;
mod queue;
mod util;
mod worker;

mod prelude {
    pub(crate) use crate::util::error::ResultExt as _;
    pub(crate) use anyhow::{bail, ensure, Context as _};
    pub(crate) use camino::{Utf8Path, Utf8PathBuf};
    pub(crate) use fs_err::tokio as fs;
    pub(crate) use itertools::Itertools as _;
    pub(crate) use tracing::{debug, error, info, info_span, instrument, warn, Instrument as _};

    pub(crate) type Result<T = (), E = anyhow::Error> = std::result::Result<T, E>;
}

use clap::Parser;
use cmd::Cmd;

/// A tool that converts telegram sticker packs into whatsapp `.wastickers` packs
#[derive(Parser, Debug)]
#[command(version)]
enum Args {
    Pack(cmd::Pack),
    Sticker(cmd::Sticker),
}

pub async fn run() -> anyhow::Result<()> {
    match Args::parse() {
        Args::Pack(cmd) => cmd.run().await,
        Args::Sticker(cmd) => cmd.run().await,
    }
}
