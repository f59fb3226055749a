//! The single worker that drains the job queue one job at a time.

mod messages;
mod service;

use crate::display;
use crate::pack::{self, PackAssembler};
use crate::platform::{Destination, Messenger, PackSource, SourcePack, UserId};
use crate::prelude::*;
use crate::queue::{Job, JobQueue};
use futures::FutureExt as _;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;

pub(crate) use service::Service;

pub(crate) struct Worker {
    queue: Arc<JobQueue>,
    source: Arc<dyn PackSource>,
    messenger: Arc<dyn Messenger>,
    assembler: PackAssembler,

    /// Held for the whole run, so there is never more than one job in flight
    /// even if several runs are started at once.
    token: tokio::sync::Mutex<()>,
}

/// Completes the job exactly once, whichever way its processing ends
struct Completion<'a> {
    queue: &'a JobQueue,
    id: UserId,
    success: bool,
}

impl Drop for Completion<'_> {
    fn drop(&mut self) {
        self.queue.complete(self.id, self.success);
    }
}

impl Worker {
    pub(crate) fn new(
        queue: Arc<JobQueue>,
        source: Arc<dyn PackSource>,
        messenger: Arc<dyn Messenger>,
        assembler: PackAssembler,
    ) -> Self {
        Self {
            queue,
            source,
            messenger,
            assembler,
            token: Default::default(),
        }
    }

    pub(crate) fn queue(&self) -> &JobQueue {
        &self.queue
    }

    /// Processes the jobs until the queue is empty. A run started while
    /// another one is in progress waits for it to finish first.
    pub(crate) async fn run(&self) {
        let _token = self.token.lock().await;

        while let Some(job) = self.queue.dequeue_next() {
            let span = info_span!(
                "job",
                requester = %job.requester.id,
                pack = %job.selector,
            );

            self.process(job).instrument(span).await;
        }

        debug!("The queue is empty, the worker goes idle");
    }

    async fn process(&self, job: Job) {
        let start = Instant::now();

        let mut completion = Completion {
            queue: &self.queue,
            id: job.requester.id,
            success: false,
        };

        let result = AssertUnwindSafe(self.convert(&job)).catch_unwind().await;

        completion.success = match result {
            Ok(success) => success,
            Err(_) => {
                error!("Conversion panicked");
                self.send(job.destination(), messages::UNEXPECTED_ERROR).await;
                false
            }
        };

        info!(
            success = completion.success,
            "Finished the job in {}",
            display::elapsed(start)
        );
    }

    /// Returns `true` if at least one bundle was produced
    async fn convert(&self, job: &Job) -> bool {
        let destination = job.destination();

        self.send(destination, &messages::started(&job.selector)).await;

        let pack = match self.source.resolve_pack(&job.selector).await {
            Ok(pack) => pack,
            Err(err) => {
                warn!(err = format_args!("{err:#}"), "Failed to resolve the pack");
                self.send(destination, &messages::not_found(&job.selector)).await;
                return false;
            }
        };

        let produced = self.convert_pack(job, &pack).await;

        if produced == 0 {
            self.send(destination, &messages::conversion_failed(&job.selector))
                .await;
            return false;
        }

        self.send(destination, &messages::completed(produced)).await;

        true
    }

    /// Builds and delivers the bundles one by one, returns how many were produced
    async fn convert_pack(&self, job: &Job, pack: &SourcePack) -> usize {
        let destination = job.destination();
        let max = self.assembler.limits().max_stickers_per_pack.max(1);
        let bundles = pack::bundle_count(pack.items.len(), max);

        self.send(destination, &messages::details(pack, bundles)).await;

        let mut produced = 0;

        for (i, chunk) in pack.items.chunks(max).enumerate() {
            let title = pack::bundle_title(&pack.title, i, bundles);

            let bundle = self
                .assembler
                .build(chunk, &title, &job.requester.display_name)
                .await
                .warn_err(format_args!("Building bundle {}/{bundles}", i + 1));

            let Some(Some(bundle)) = bundle else {
                continue;
            };

            produced += 1;

            debug!(
                title = %bundle.title,
                author = %bundle.author,
                stickers = bundle.sticker_count,
                "Delivering the bundle"
            );

            let caption = messages::bundle_caption(i + 1, bundles, bundle.size);

            self.messenger
                .send_file(destination, &bundle.path, &caption)
                .await
                .warn_err("Delivering the bundle");

            // The archive is removed from disk here
            drop(bundle);
        }

        produced
    }

    async fn send(&self, destination: Destination, text: &str) {
        self.messenger
            .send_text(destination, text)
            .await
            .warn_err("Sending a message");
    }
}
