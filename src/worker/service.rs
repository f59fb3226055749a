use super::{messages, Worker};
use crate::platform::{Destination, PackSelector, Requester, UserId};
use crate::queue::{Enqueued, Job};
use std::sync::Arc;

/// Entry point for the requests. Puts them into the queue and makes sure
/// the worker is running while there is something to do.
#[derive(Clone)]
pub(crate) struct Service {
    worker: Arc<Worker>,
}

impl Service {
    pub(crate) fn new(worker: Worker) -> Self {
        Self {
            worker: Arc::new(worker),
        }
    }

    /// Enqueues the request and tells the requester their position.
    /// A requester can only have one request in the queue at a time.
    pub(crate) async fn submit(
        &self,
        requester: Requester,
        destination: Destination,
        selector: PackSelector,
    ) -> Enqueued {
        let queue = self.worker.queue();

        let enqueued = queue.enqueue(
            requester,
            destination.chat,
            destination.reply_to,
            selector.clone(),
        );

        let wait = queue.wait_for_position(enqueued.position());

        let text = match enqueued {
            Enqueued::New(position) => messages::queued(&selector, position, wait),
            Enqueued::Existing(position) => messages::already_queued(position, wait),
        };

        self.worker.send(destination, &text).await;

        if let Enqueued::New(_) = enqueued {
            let worker = self.worker.clone();
            tokio::spawn(async move { worker.run().await });
        }

        enqueued
    }

    /// Waits until every submitted job is finished
    pub(crate) async fn drain(&self) {
        self.worker.run().await;
    }

    /// Recently finished jobs, see [`crate::queue::JobQueue::finished`]
    pub(crate) fn finished(&self) -> Vec<Job> {
        self.worker.queue().finished()
    }

    pub(crate) fn status(&self, id: UserId) -> String {
        let queue = self.worker.queue();
        let stats = queue.stats();

        match queue.position_of(id).zip(queue.eta(id)) {
            Some((position, wait)) => messages::queue_position(position, &stats, wait),
            None => messages::not_in_queue(&stats),
        }
    }
}
