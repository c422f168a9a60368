use std::{
    sync::{Arc, Mutex},
    time::Duration,
};

use tokio::task::JoinHandle;

/// Handle to one pending visibility flip. Dropping it does not cancel the
/// flip; call `cancel`.
pub struct RevealTimer {
    handle: JoinHandle<()>,
}

impl RevealTimer {
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    pub fn cancel(self) {
        self.handle.abort();
    }
}

#[derive(Default)]
struct RevealState {
    generation: u64,
    visible: Vec<bool>,
}

/// Staggered reveal for one list of items.
///
/// `activate` hides every item and schedules item `i` to appear `i * stagger`
/// later. `cancel` aborts every timer from the current activation and hides
/// the items again, so nothing from an old activation can flip afterwards.
/// Must be used from within a tokio runtime.
#[derive(Default)]
pub struct RevealScheduler {
    state: Arc<Mutex<RevealState>>,
    timers: Vec<RevealTimer>,
}

impl RevealScheduler {
    pub fn new() -> Self {
        RevealScheduler::default()
    }

    pub fn activate(&mut self, count: usize, stagger: Duration) {
        self.cancel();

        let generation = {
            let mut guard = self.state.lock().unwrap_or_else(|e| e.into_inner());
            guard.generation += 1;
            guard.visible = vec![false; count];
            guard.generation
        };

        for index in 0..count {
            let state = Arc::clone(&self.state);
            let delay = stagger.saturating_mul(index as u32);
            let handle = tokio::spawn(async move {
                tokio::time::sleep(delay).await;
                let mut guard = state.lock().unwrap_or_else(|e| e.into_inner());
                if guard.generation != generation {
                    tracing::error!(index, "reveal timer outlived its activation");
                    return;
                }
                // Earlier items flip no later than this one.
                let upto = (index + 1).min(guard.visible.len());
                for flag in &mut guard.visible[..upto] {
                    *flag = true;
                }
            });
            self.timers.push(RevealTimer { handle });
        }
        tracing::debug!(count, stagger_ms = stagger.as_millis() as u64, "reveal scheduled");
    }

    pub fn cancel(&mut self) {
        let pending = self.timers.iter().filter(|t| !t.is_finished()).count();
        for timer in self.timers.drain(..) {
            timer.cancel();
        }
        let mut guard = self.state.lock().unwrap_or_else(|e| e.into_inner());
        guard.generation += 1;
        guard.visible.iter_mut().for_each(|flag| *flag = false);
        if pending > 0 {
            tracing::debug!(pending, "reveal cancelled");
        }
    }

    pub fn visibility(&self) -> Vec<bool> {
        self.state
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .visible
            .clone()
    }

    pub fn is_visible(&self, index: usize) -> bool {
        self.state
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .visible
            .get(index)
            .copied()
            .unwrap_or(false)
    }

    pub fn pending_timers(&self) -> usize {
        self.timers.iter().filter(|t| !t.is_finished()).count()
    }
}

impl Drop for RevealScheduler {
    fn drop(&mut self) {
        for timer in self.timers.drain(..) {
            timer.cancel();
        }
    }
}
