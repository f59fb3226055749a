use super::{sanitize_name, Archiver, OutputBundle, ZipArchiver};
use crate::display;
use crate::fit::{Encoded, SizeFit};
use crate::limits::Limits;
use crate::media::{Decoder, Encoder, Frames, IconQuality, SourceItem};
use crate::platform::PackSource;
use crate::prelude::*;
use crate::util::path::Utf8TempDir;
use buildstructor::buildstructor;
use std::sync::Arc;
use std::time::Instant;

const ICON_FILE: &str = "icon.png";
const AUTHOR_FILE: &str = "author.txt";
const TITLE_FILE: &str = "title.txt";

pub(crate) const BUNDLE_EXTENSION: &str = "wastickers";

pub(crate) struct PackAssembler {
    source: Arc<dyn PackSource>,
    decoder: Arc<dyn Decoder>,
    encoder: Arc<dyn Encoder>,
    archiver: Arc<dyn Archiver>,
    fit: SizeFit,
    limits: Arc<Limits>,
}

#[buildstructor]
impl PackAssembler {
    #[builder]
    pub(crate) fn new(
        source: Arc<dyn PackSource>,
        decoder: Arc<dyn Decoder>,
        encoder: Arc<dyn Encoder>,
        archiver: Option<Arc<dyn Archiver>>,
        limits: Option<Arc<Limits>>,
    ) -> Self {
        let limits = limits.unwrap_or_default();

        Self {
            fit: SizeFit::new(encoder.clone(), limits.clone()),
            source,
            decoder,
            encoder,
            archiver: archiver.unwrap_or_else(|| Arc::new(ZipArchiver)),
            limits,
        }
    }
}

impl PackAssembler {
    pub(crate) fn limits(&self) -> &Limits {
        &self.limits
    }

    /// Converts the items and packs them into a single bundle. Items that
    /// fail to convert are skipped. Returns `None` if none of them survived.
    #[instrument(name = "bundle", skip_all, fields(title = %title))]
    pub(crate) async fn build(
        &self,
        items: &[SourceItem],
        title: &str,
        author: &str,
    ) -> Result<Option<OutputBundle>> {
        let max = self.limits.max_stickers_per_pack;
        ensure!(
            items.len() <= max,
            "A bundle can't hold {} stickers, the maximum is {max}",
            items.len(),
        );

        let start = Instant::now();
        let layout = Utf8TempDir::new("wastick-layout")?;

        let mut icon = None;
        let mut sticker_count = 0;

        for (i, item) in items.iter().enumerate() {
            let Some((frames, encoded)) = self.convert(i + 1, item).await else {
                continue;
            };

            // The icon is made of the first survivor it can be encoded from.
            // The stickers are still delivered if none of them works.
            if icon.is_none() {
                icon = self.icon(&frames).await.warn_err("Creating the pack icon");
            }

            sticker_count += 1;

            let file = layout.join(format!("{sticker_count:02}.webp"));
            fs::write(file, &*encoded.bytes).await?;
        }

        if sticker_count == 0 {
            warn!("None of the {} stickers could be converted", items.len());
            return Ok(None);
        }

        match icon {
            Some(icon) => fs::write(layout.join(ICON_FILE), icon).await?,
            None => warn!("The bundle has no icon, whatsapp may refuse to import it"),
        }
        fs::write(layout.join(AUTHOR_FILE), author).await?;
        fs::write(layout.join(TITLE_FILE), title).await?;

        let dir = Utf8TempDir::new("wastick-bundle")?;
        let path = dir.join(format!("{}.{BUNDLE_EXTENSION}", sanitize_name(title)));

        self.archiver
            .archive(layout.path(), &path)
            .await
            .context("Failed to archive the bundle")?;

        let size = fs::metadata(&path).await?.len();

        info!(
            "📦 Packed {sticker_count} of {} stickers into {} ({}) in {}",
            items.len(),
            display::path(&path),
            display::bold(&display::human_size(size)),
            display::elapsed(start),
        );

        Ok(Some(OutputBundle {
            path,
            title: title.to_owned(),
            author: author.to_owned(),
            sticker_count,
            size,
            _dir: dir,
        }))
    }

    #[instrument(name = "item", skip_all, fields(n = position, file = %item.file_name))]
    async fn convert(&self, position: usize, item: &SourceItem) -> Option<(Frames, Encoded)> {
        self.try_convert(item)
            .await
            .warn_err("Converting the sticker")
    }

    async fn try_convert(&self, item: &SourceItem) -> Result<(Frames, Encoded)> {
        let bytes = self
            .source
            .fetch_item(item)
            .await
            .context("Failed to download the sticker")?;

        let frames = self.decoder.decode(item, &bytes).await?;
        let encoded = self.fit.fit(item.kind, &frames).await?;

        Ok((frames, encoded))
    }

    /// Retries with a reduced palette once if the icon is too big
    async fn icon(&self, frames: &Frames) -> Result<Vec<u8>> {
        let frame = frames
            .first()
            .context("BUG: decoder returned no frames for the icon")?;

        let max_bytes = self.limits.max_icon_bytes;

        let icon = self.encoder.encode_icon(frame, IconQuality::Full).await?;
        if icon.len() <= max_bytes {
            return Ok(icon);
        }

        debug!(
            "Icon of {} exceeds {}, reducing the palette",
            display::bold_human_size(icon.len()),
            display::bold_human_size(max_bytes),
        );

        let icon = self.encoder.encode_icon(frame, IconQuality::Reduced).await?;

        if icon.len() > max_bytes {
            warn!(
                "Icon of {} still exceeds {} and is likely to be rejected",
                display::bold_human_size(icon.len()),
                display::bold_human_size(max_bytes),
            );
        }

        Ok(icon)
    }
}
