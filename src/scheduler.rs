// src/scheduler.rs
//! Owned periodic background tasks.
//!
//! Loops are registered at init and stopped at shutdown through a watch
//! channel, so nothing is orphaned: `shutdown` flips the channel and awaits
//! every handle.

use std::future::Future;
use std::sync::Mutex;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;

pub struct Scheduler {
    shutdown_tx: watch::Sender<bool>,
    handles: Mutex<Vec<(&'static str, JoinHandle<()>)>>,
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl Scheduler {
    pub fn new() -> Self {
        let (shutdown_tx, _) = watch::channel(false);
        Self {
            shutdown_tx,
            handles: Mutex::new(Vec::new()),
        }
    }

    /// Run `task` every `every`, starting immediately. The loop exits when
    /// `shutdown` is called; a tick in progress finishes first.
    pub fn spawn_periodic<F, Fut>(&self, name: &'static str, every: Duration, task: F)
    where
        F: Fn() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send,
    {
        let mut rx = self.shutdown_tx.subscribe();
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        tracing::debug!(task = name, "periodic tick");
                        task().await;
                    }
                    changed = rx.changed() => {
                        if changed.is_err() || *rx.borrow() {
                            break;
                        }
                    }
                }
            }
            tracing::debug!(task = name, "periodic task stopped");
        });
        self.handles
            .lock()
            .expect("scheduler mutex poisoned")
            .push((name, handle));
    }

    pub fn task_count(&self) -> usize {
        self.handles.lock().expect("scheduler mutex poisoned").len()
    }

    /// Stop every registered loop and wait for it to finish.
    pub async fn shutdown(&self) {
        let _ = self.shutdown_tx.send(true);
        let handles: Vec<_> = {
            let mut guard = self.handles.lock().expect("scheduler mutex poisoned");
            guard.drain(..).collect()
        };
        for (name, handle) in handles {
            if handle.await.is_err() {
                tracing::warn!(task = name, "periodic task panicked");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[tokio::test]
    async fn ticks_until_shutdown_then_stops() {
        let scheduler = Scheduler::new();
        let ticks = Arc::new(AtomicUsize::new(0));

        let counter = Arc::clone(&ticks);
        scheduler.spawn_periodic("test-tick", Duration::from_millis(10), move || {
            let counter = Arc::clone(&counter);
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
            }
        });
        assert_eq!(scheduler.task_count(), 1);

        tokio::time::sleep(Duration::from_millis(45)).await;
        scheduler.shutdown().await;
        let after_shutdown = ticks.load(Ordering::SeqCst);
        assert!(after_shutdown >= 2, "got {after_shutdown} ticks");

        tokio::time::sleep(Duration::from_millis(30)).await;
        assert_eq!(ticks.load(Ordering::SeqCst), after_shutdown);
        assert_eq!(scheduler.task_count(), 0);
    }
}
