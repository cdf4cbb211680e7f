use parking_lot::Mutex;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

#[derive(Debug)]
struct Pending {
    id: u64,
    handle: JoinHandle<()>,
}

#[derive(Debug, Default)]
struct Slot {
    next_id: u64,
    pending: Option<Pending>,
}

/// Holds at most one delayed reconnect task.
///
/// Scheduling aborts whatever was pending. A task removes itself from the
/// slot when its delay elapses, so the work it runs afterwards may schedule
/// or cancel freely without aborting itself.
#[derive(Debug, Clone, Default)]
pub struct ReconnectTimer {
    slot: Arc<Mutex<Slot>>,
}

impl ReconnectTimer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn schedule<F>(&self, delay: Duration, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let mut slot = self.slot.lock();
        if let Some(previous) = slot.pending.take() {
            previous.handle.abort();
        }

        slot.next_id += 1;
        let id = slot.next_id;
        let shared = self.slot.clone();

        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            {
                let mut slot = shared.lock();
                if slot.pending.as_ref().is_some_and(|pending| pending.id == id) {
                    slot.pending = None;
                }
            }
            task.await;
        });

        slot.pending = Some(Pending { id, handle });
    }

    /// Returns true when a pending task was aborted.
    pub fn cancel(&self) -> bool {
        match self.slot.lock().pending.take() {
            Some(pending) => {
                pending.handle.abort();
                true
            }
            None => false,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.slot.lock().pending.is_some()
    }
}
