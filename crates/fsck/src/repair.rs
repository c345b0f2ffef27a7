//! Bounded thread-pool repair dispatch (§4.5, §5 "fans out to a bounded
//! thread pool sized to the hardware"). A small hand-rolled worker pool,
//! matching the spec's preference for explicit concurrency primitives over
//! pulling in a scheduler crate.

use std::sync::mpsc::{sync_channel, Receiver, SyncSender};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;

use crate::collector::FsckReport;
use crate::tracker::Tracker;

/// One inconsistency's abstract repair routine, owned by another subsystem;
/// fsck only schedules it (§4.5 "Repair").
pub trait FsckEntry: Send {
    fn repair(&self);
}

type Job = Box<dyn FnOnce() + Send + 'static>;

/// A bounded thread pool: `send` blocks once `max_queued_jobs` jobs are
/// in flight (§4.5 "Queue saturation").
pub struct RepairPool {
    sender: SyncSender<Job>,
    workers: Vec<JoinHandle<()>>,
}

impl RepairPool {
    pub fn new(num_threads: usize, max_queued_jobs: usize) -> Self {
        let (sender, receiver) = sync_channel::<Job>(max_queued_jobs.max(1));
        let receiver = Arc::new(Mutex::new(receiver));
        let workers = (0..num_threads.max(1))
            .map(|id| spawn_worker(id, Arc::clone(&receiver)))
            .collect();
        RepairPool { sender, workers }
    }

    /// Sized to the hardware, per §5.
    pub fn sized_to_hardware(max_queued_jobs: usize) -> Self {
        let n = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(4);
        RepairPool::new(n, max_queued_jobs)
    }

    /// Blocks the caller if the queue is saturated.
    pub fn submit(&self, job: impl FnOnce() + Send + 'static) {
        let _ = self.sender.send(Box::new(job));
    }

    pub fn shutdown(self) {
        drop(self.sender);
        for worker in self.workers {
            let _ = worker.join();
        }
    }
}

fn spawn_worker(id: usize, receiver: Arc<Mutex<Receiver<Job>>>) -> JoinHandle<()> {
    std::thread::Builder::new()
        .name(format!("fsck-repair-{id}"))
        .spawn(move || loop {
            let job = {
                let rx = receiver.lock().expect("repair queue lock poisoned");
                rx.recv()
            };
            match job {
                Ok(job) => job(),
                Err(_) => break,
            }
        })
        .expect("spawning repair worker thread")
}

/// Walks one collector cycle's error map and schedules a repair task per
/// untracked (err_tag, fsid, fid), throttled by `tracker`'s TTL. A repair
/// that fails is left for the next cycle rather than re-queued immediately
/// — the tracker entry simply expires and the next cycle re-dispatches it.
pub fn dispatch_repairs(
    pool: &RepairPool,
    tracker: &Tracker<(String, u32, u64)>,
    report: &FsckReport,
    repair_fn: Arc<dyn Fn(&str, u32, u64) + Send + Sync>,
) -> usize {
    let mut dispatched = 0;
    for (tag, by_fsid) in &report.broadcast {
        for (&fsid, fids) in by_fsid {
            for &fid in fids {
                let key = (tag.clone(), fsid, fid);
                if !tracker.try_track(key, ()) {
                    continue;
                }
                let repair_fn = Arc::clone(&repair_fn);
                let tag = tag.clone();
                pool.submit(move || repair_fn(&tag, fsid, fid));
                dispatched += 1;
            }
        }
    }
    dispatched
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collector::{merge_reply, ErrorMap};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[test]
    fn dispatch_repairs_runs_each_untracked_entry_once() {
        let pool = RepairPool::new(2, 8);
        let tracker: Tracker<(String, u32, u64)> = Tracker::new(Duration::from_secs(600));
        let count = Arc::new(AtomicUsize::new(0));

        let mut broadcast = ErrorMap::new();
        merge_reply(&mut broadcast, "orphans_n=1:10,11");
        let report = FsckReport {
            broadcast,
            ..Default::default()
        };

        let count_clone = Arc::clone(&count);
        let repair_fn: Arc<dyn Fn(&str, u32, u64) + Send + Sync> =
            Arc::new(move |_tag, _fsid, _fid| {
                count_clone.fetch_add(1, Ordering::SeqCst);
            });

        let dispatched = dispatch_repairs(&pool, &tracker, &report, Arc::clone(&repair_fn));
        assert_eq!(dispatched, 2);

        // Re-dispatching the same cycle's map must not re-schedule within TTL.
        let second = dispatch_repairs(&pool, &tracker, &report, repair_fn);
        assert_eq!(second, 0);

        pool.shutdown();
        assert_eq!(count.load(Ordering::SeqCst), 2);
    }
}
