use crate::ffmpeg::{Ffmpeg, FfmpegProcess};
use crate::library::{DirectoryMessenger, LibrarySource};
use crate::limits::{Limits, MAX_STICKERS_PER_PACK};
use crate::media::{lottie, Decoder, Encoder, FfmpegCodec};
use crate::pack::PackAssembler;
use crate::platform::{ChatId, Destination, MessageId, PackSelector, PackSource, Requester, UserId};
use crate::prelude::*;
use crate::queue::{JobQueue, JobStatus};
use crate::worker::{Service, Worker};
use async_trait::async_trait;
use clap::Parser;
use std::sync::Arc;

/// Convert telegram sticker packs into whatsapp `.wastickers` files
///
/// The packs are read from the library directory, where every pack is a
/// subdirectory named by the pack's short name. An optional `title.txt`
/// file in it overrides the pack's title, the rest of the files are the
/// stickers ordered by their names.
///
/// Packs with more stickers than whatsapp allows are split into several
/// `.wastickers` files. The packs are converted one at a time in the order
/// they were specified.
#[derive(Parser, Debug)]
pub struct Pack {
    /// Links to the sticker packs like `https://t.me/addstickers/<name>`
    /// or just their short names
    #[clap(required_unless_present = "sticker")]
    packs: Vec<String>,

    /// Path to a sticker file relative to the library. The pack that
    /// contains the sticker is converted. Can be specified multiple times.
    #[clap(long)]
    sticker: Vec<String>,

    /// Directory with the sticker packs
    #[clap(long, default_value = ".")]
    library: Utf8PathBuf,

    /// Directory where the `.wastickers` files will be saved
    #[clap(long, default_value = ".")]
    output: Utf8PathBuf,

    /// The author written into the generated packs
    #[clap(long, default_value = "wastick")]
    author: String,

    /// Max number of stickers in a single `.wastickers` file
    #[clap(long, default_value_t = MAX_STICKERS_PER_PACK)]
    max_stickers: usize,
}

#[async_trait]
impl crate::cmd::Cmd for Pack {
    async fn run(self) -> Result {
        ensure!(
            (1..=MAX_STICKERS_PER_PACK).contains(&self.max_stickers),
            "Max stickers per pack must be in range 1..={MAX_STICKERS_PER_PACK}, but got {}",
            self.max_stickers,
        );

        let by_reference = self
            .sticker
            .iter()
            .map(|sticker| PackSelector::OpaqueReference(sticker.clone()));

        let selectors: Vec<_> = self
            .packs
            .iter()
            .map(|pack| PackSelector::parse(pack))
            .chain(by_reference.map(Ok))
            .try_collect()?;

        let limits = Arc::new(Limits {
            max_stickers_per_pack: self.max_stickers,
            ..Limits::default()
        });

        let service = self.service(limits);

        for (i, selector) in selectors.into_iter().enumerate() {
            let id = i64::try_from(i + 1)?;

            let requester = Requester {
                id: UserId(id),
                display_name: self.author.clone(),
            };

            // Every pack is a separate request in its own chat
            let destination = Destination {
                chat: ChatId(id),
                reply_to: Some(MessageId(id)),
            };

            service.submit(requester, destination, selector).await;

            debug!("{}", service.status(UserId(id)));
        }

        service.drain().await;

        let finished = service.finished();
        let failed = finished
            .iter()
            .filter(|job| job.status == JobStatus::Failed)
            .map(|job| &job.selector)
            .collect_vec();

        ensure!(
            failed.is_empty(),
            "Failed to convert {} of {} packs: {}",
            failed.len(),
            finished.len(),
            failed.iter().format(", "),
        );

        Ok(())
    }
}

impl Pack {
    fn service(&self, limits: Arc<Limits>) -> Service {
        let ffmpeg: Arc<dyn Ffmpeg> = Arc::new(FfmpegProcess);
        let codec = FfmpegCodec::new(ffmpeg, limits.sticker_side, limits.icon_side)
            .with_lottie(lottie::renderer());
        let codec = Arc::new(codec);

        let source: Arc<dyn PackSource> = Arc::new(LibrarySource::new(self.library.clone()));
        let decoder: Arc<dyn Decoder> = codec.clone();
        let encoder: Arc<dyn Encoder> = codec;

        let assembler = PackAssembler::builder()
            .source(source.clone())
            .decoder(decoder)
            .encoder(encoder)
            .limits(limits.clone())
            .build();

        let queue = Arc::new(JobQueue::new(limits.average_job_time));
        let messenger = Arc::new(DirectoryMessenger::new(self.output.clone()));

        Service::new(Worker::new(queue, source, messenger, assembler))
    }
}
