use crate::display;
use crate::ffmpeg::FfmpegProcess;
use crate::fit::SizeFit;
use crate::limits::Limits;
use crate::media::{lottie, Decoder, FfmpegCodec, SourceItem};
use crate::prelude::*;
use async_trait::async_trait;
use clap::Parser;
use std::sync::Arc;

/// Convert a single image, video or `.tgs` animation into a whatsapp sticker
///
/// The output is a 512x512 `.webp` image. Animated inputs produce an animated
/// sticker with as many frames as fit into the size limit.
#[derive(Parser, Debug)]
pub struct Sticker {
    /// Path to the input media file
    input: Utf8PathBuf,

    /// Path to the output. By default, the output will be put next to
    /// the input with the `.webp` extension.
    output: Option<Utf8PathBuf>,

    /// Overwrite the output file if it exists without asking for a confirmation
    #[clap(long)]
    overwrite: bool,
}

#[async_trait]
impl crate::cmd::Cmd for Sticker {
    async fn run(self) -> Result {
        let output = self
            .output
            .clone()
            .unwrap_or_else(|| self.input.with_extension("webp"));

        ensure!(
            output != self.input,
            "The output path must differ from the input path `{output}`"
        );

        crate::fs::validate_output_files_overwriting(self.overwrite, [output.clone()]).await?;

        self.convert(&output)
            .instrument(info_span!("sticker", input = %self.input))
            .await
    }
}

impl Sticker {
    async fn convert(&self, output: &Utf8Path) -> Result {
        let file_name = self
            .input
            .file_name()
            .with_context(|| format!("Input must have a file name, but got `{}`", self.input))?;

        let item = SourceItem::new(self.input.as_str(), file_name);
        let bytes = fs::read(&self.input).await?;

        let limits = Arc::new(Limits::default());

        let codec = FfmpegCodec::new(Arc::new(FfmpegProcess), limits.sticker_side, limits.icon_side)
            .with_lottie(lottie::renderer());
        let codec = Arc::new(codec);

        let frames = codec.decode(&item, &bytes).await?;
        let encoded = SizeFit::new(codec, limits).fit(item.kind, &frames).await?;

        fs::write(output, &*encoded.bytes).await?;

        info!("🔥 Saved output at {}", display::path(&output));

        Ok(())
    }
}
