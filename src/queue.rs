//! FIFO of conversion requests with a single active slot.
//!
//! All the state lives behind one mutex which is only ever taken inside
//! synchronous methods, so it is never held across an `.await`.

use crate::platform::{ChatId, Destination, MessageId, PackSelector, Requester, UserId};
use crate::prelude::*;
use chrono::{DateTime, Utc};
use std::collections::{HashSet, VecDeque};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

#[derive(strum::Display, Debug, Clone, Copy, PartialEq, Eq)]
#[strum(serialize_all = "kebab-case")]
pub(crate) enum JobStatus {
    Waiting,
    Processing,
    Completed,
    Failed,
}

#[derive(Debug, Clone)]
pub(crate) struct Job {
    pub(crate) requester: Requester,
    pub(crate) chat: ChatId,
    pub(crate) reply_to: Option<MessageId>,
    pub(crate) selector: PackSelector,
    pub(crate) created_at: DateTime<Utc>,
    pub(crate) status: JobStatus,
}

impl Job {
    /// Replies about the job go to the chat where it was requested
    pub(crate) fn destination(&self) -> Destination {
        Destination {
            chat: self.chat,
            reply_to: self.reply_to,
        }
    }
}

/// 1-based position in the queue, the active job is always at `1`
pub(crate) type Position = usize;

/// Number of finished jobs remembered for reporting
const MAX_FINISHED: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Enqueued {
    New(Position),
    /// The requester already had a job in the queue, nothing was added
    Existing(Position),
}

impl Enqueued {
    pub(crate) fn position(self) -> Position {
        match self {
            Self::New(position) | Self::Existing(position) => position,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct QueueStats {
    pub(crate) waiting: usize,
    pub(crate) processing: Option<Requester>,
}

impl QueueStats {
    pub(crate) fn is_processing(&self) -> bool {
        self.processing.is_some()
    }

    /// Number of jobs that aren't finished yet
    pub(crate) fn total(&self) -> usize {
        self.waiting + usize::from(self.is_processing())
    }
}

#[derive(Debug, Default)]
struct QueueState {
    waiting: VecDeque<Job>,
    active: Option<Job>,

    /// Requesters that have a waiting or an active job
    index: HashSet<UserId>,

    /// The most recently finished jobs, the oldest first
    finished: VecDeque<Job>,
}

impl QueueState {
    fn position_of(&self, id: UserId) -> Option<Position> {
        if self.active.as_ref().is_some_and(|job| job.requester.id == id) {
            return Some(1);
        }

        let index = self
            .waiting
            .iter()
            .position(|job| job.requester.id == id)?;

        Some(index + 1 + usize::from(self.active.is_some()))
    }
}

#[derive(Debug)]
pub(crate) struct JobQueue {
    state: Mutex<QueueState>,
    average_job_time: Duration,
}

impl JobQueue {
    pub(crate) fn new(average_job_time: Duration) -> Self {
        Self {
            state: Default::default(),
            average_job_time,
        }
    }

    fn lock(&self) -> MutexGuard<'_, QueueState> {
        // The state is consistent after every method, so a panic
        // in some other thread can't leave it half-updated
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn enqueue(
        &self,
        requester: Requester,
        chat: ChatId,
        reply_to: Option<MessageId>,
        selector: PackSelector,
    ) -> Enqueued {
        let mut state = self.lock();

        if state.index.contains(&requester.id) {
            if let Some(position) = state.position_of(requester.id) {
                debug!(requester = %requester.id, position, "Requester is already in the queue");
                return Enqueued::Existing(position);
            }
        }

        info!(
            requester = %requester.id,
            name = %requester.display_name,
            pack = %selector,
            "Adding to the queue"
        );

        state.index.insert(requester.id);
        state.waiting.push_back(Job {
            requester,
            chat,
            reply_to,
            selector,
            created_at: Utc::now(),
            status: JobStatus::Waiting,
        });

        let position = state.waiting.len() + usize::from(state.active.is_some());

        Enqueued::New(position)
    }

    /// Takes the next job and makes it active unless there already is an active one.
    pub(crate) fn dequeue_next(&self) -> Option<Job> {
        let mut state = self.lock();

        if state.active.is_some() {
            return None;
        }

        let mut job = state.waiting.pop_front()?;
        job.status = JobStatus::Processing;

        info!(
            requester = %job.requester.id,
            name = %job.requester.display_name,
            waited = ?(Utc::now() - job.created_at).to_std().unwrap_or_default(),
            "Starting processing"
        );

        state.active = Some(job.clone());

        Some(job)
    }

    /// Finishes the active job if it belongs to the requester, returns it.
    pub(crate) fn complete(&self, id: UserId, success: bool) -> Option<Job> {
        let mut state = self.lock();

        if !state.active.as_ref().is_some_and(|job| job.requester.id == id) {
            debug!(requester = %id, "No active job of the requester to complete");
            return None;
        }

        let mut job = state.active.take()?;
        state.index.remove(&id);

        job.status = if success {
            JobStatus::Completed
        } else {
            JobStatus::Failed
        };

        info!(requester = %id, status = %job.status, "Finished processing");

        if state.finished.len() == MAX_FINISHED {
            state.finished.pop_front();
        }
        state.finished.push_back(job.clone());

        Some(job)
    }

    pub(crate) fn position_of(&self, id: UserId) -> Option<Position> {
        self.lock().position_of(id)
    }

    /// Estimated time until the requester's job starts
    pub(crate) fn eta(&self, id: UserId) -> Option<Duration> {
        let position = self.position_of(id)?;
        Some(self.wait_for_position(position))
    }

    pub(crate) fn wait_for_position(&self, position: Position) -> Duration {
        let jobs_ahead = u32::try_from(position.saturating_sub(1)).unwrap_or(u32::MAX);
        self.average_job_time.saturating_mul(jobs_ahead)
    }

    /// Completed and failed jobs in the order they finished
    pub(crate) fn finished(&self) -> Vec<Job> {
        self.lock().finished.iter().cloned().collect()
    }

    pub(crate) fn stats(&self) -> QueueStats {
        let state = self.lock();
        QueueStats {
            waiting: state.waiting.len(),
            processing: state.active.as_ref().map(|job| job.requester.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use expect_test::expect;

    fn requester(id: i64) -> Requester {
        Requester {
            id: UserId(id),
            display_name: format!("user-{id}"),
        }
    }

    fn enqueue(queue: &JobQueue, id: i64) -> Enqueued {
        queue.enqueue(
            requester(id),
            ChatId(id),
            Some(MessageId(id * 10)),
            PackSelector::ShortName(format!("pack_{id}")),
        )
    }

    fn queue() -> JobQueue {
        JobQueue::new(Duration::from_secs(150))
    }

    /// The index must reflect exactly the jobs that aren't finished
    fn assert_consistent(queue: &JobQueue) {
        let state = queue.lock();

        let unfinished: HashSet<_> = state
            .waiting
            .iter()
            .chain(&state.active)
            .map(|job| job.requester.id)
            .collect();

        assert_eq!(unfinished, state.index);
        assert_eq!(unfinished.len(), state.waiting.len() + usize::from(state.active.is_some()));
    }

    #[test]
    fn positions_increase_in_enqueue_order() {
        let queue = queue();

        let positions = (1..=5).map(|id| enqueue(&queue, id)).collect_vec();
        expect!["[New(1), New(2), New(3), New(4), New(5)]"].assert_eq(&format!("{positions:?}"));

        let job = queue.dequeue_next().unwrap();
        assert_eq!(job.requester.id, UserId(1));
        assert_eq!(job.status, JobStatus::Processing);

        // Activating the head of the queue keeps everyone in place
        let positions = (1..=6).map(|id| queue.position_of(UserId(id))).collect_vec();
        expect!["[Some(1), Some(2), Some(3), Some(4), Some(5), None]"]
            .assert_eq(&format!("{positions:?}"));

        assert_eq!(enqueue(&queue, 6), Enqueued::New(6));

        assert_consistent(&queue);
    }

    #[test]
    fn duplicate_enqueue_returns_the_existing_position() {
        let queue = queue();

        enqueue(&queue, 1);
        enqueue(&queue, 2);

        assert_eq!(enqueue(&queue, 2), Enqueued::Existing(2));
        assert_eq!(queue.stats().waiting, 2);

        queue.dequeue_next().unwrap();

        // The active requester can't queue a second request either
        assert_eq!(enqueue(&queue, 1), Enqueued::Existing(1));
        assert_eq!(queue.stats().waiting, 1);

        assert_consistent(&queue);
    }

    #[test]
    fn only_one_job_is_active_at_a_time() {
        let queue = queue();

        enqueue(&queue, 1);
        enqueue(&queue, 2);

        assert_eq!(queue.dequeue_next().unwrap().requester.id, UserId(1));
        assert!(queue.dequeue_next().is_none());

        queue.complete(UserId(1), true).unwrap();

        assert_eq!(queue.dequeue_next().unwrap().requester.id, UserId(2));
        assert!(queue.dequeue_next().is_none());

        assert_consistent(&queue);
    }

    #[test]
    fn complete_of_another_requester_is_a_no_op() {
        let queue = queue();

        enqueue(&queue, 1);
        enqueue(&queue, 2);
        queue.dequeue_next().unwrap();

        assert!(queue.complete(UserId(2), true).is_none());
        assert!(queue.complete(UserId(42), false).is_none());

        let stats = queue.stats();
        assert_eq!(stats.processing, Some(requester(1)));
        assert_eq!(stats.waiting, 1);

        let job = queue.complete(UserId(1), false).unwrap();
        assert_eq!(job.status, JobStatus::Failed);
        assert_eq!(queue.position_of(UserId(1)), None);

        // Late duplicate call
        assert!(queue.complete(UserId(1), true).is_none());

        let finished = queue.finished();
        let finished = finished.iter().map(|job| (job.requester.id.0, job.status)).collect_vec();
        expect!["[(1, Failed)]"].assert_eq(&format!("{finished:?}"));

        assert_consistent(&queue);
    }

    #[test]
    fn finished_requester_can_enqueue_again() {
        let queue = queue();

        enqueue(&queue, 1);
        queue.dequeue_next().unwrap();
        queue.complete(UserId(1), true).unwrap();

        assert_eq!(queue.position_of(UserId(1)), None);
        assert_eq!(enqueue(&queue, 1), Enqueued::New(1));

        assert_consistent(&queue);
    }

    #[test]
    fn only_recent_finished_jobs_are_kept() {
        let queue = queue();

        for id in 1..=(MAX_FINISHED as i64 + 5) {
            enqueue(&queue, id);
            queue.dequeue_next().unwrap();
            queue.complete(UserId(id), id % 2 == 0).unwrap();
        }

        let finished = queue.finished();
        assert_eq!(finished.len(), MAX_FINISHED);
        assert_eq!(finished[0].requester.id, UserId(6));
        assert_eq!(finished[0].status, JobStatus::Completed);
        assert_eq!(finished[MAX_FINISHED - 1].status, JobStatus::Failed);
    }

    #[test]
    fn smoke_stats_and_eta() {
        let queue = queue();

        for id in 1..=4 {
            enqueue(&queue, id);
        }
        queue.dequeue_next().unwrap();

        let stats = queue.stats();
        assert!(stats.is_processing());
        assert_eq!(stats.total(), 4);

        let etas = (1..=5).map(|id| queue.eta(UserId(id))).collect_vec();
        expect!["[Some(0ns), Some(150s), Some(300s), Some(450s), None]"]
            .assert_eq(&format!("{etas:?}"));
    }
}
