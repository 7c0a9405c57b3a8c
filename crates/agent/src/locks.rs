use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

use brainrelay_core::domain::thread::ThreadId;

pub type ThreadGuard = OwnedMutexGuard<()>;

/// One async mutex per thread id, created on first use.
///
/// Entries nobody holds or waits on are pruned on the next acquisition, so
/// the table tracks in-flight threads rather than every thread ever seen.
#[derive(Default)]
pub struct ThreadLocks {
    locks: Mutex<HashMap<ThreadId, Arc<AsyncMutex<()>>>>,
}

impl ThreadLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn acquire(&self, thread_id: &ThreadId) -> ThreadGuard {
        let lock = {
            let mut locks = self.locks.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
            locks.retain(|key, lock| key == thread_id || Arc::strong_count(lock) > 1);
            locks
                .entry(thread_id.clone())
                .or_insert_with(|| Arc::new(AsyncMutex::new(())))
                .clone()
        };
        lock.lock_owned().await
    }

    pub fn tracked(&self) -> usize {
        self.locks.lock().unwrap_or_else(|poisoned| poisoned.into_inner()).len()
    }
}
