//! Conversation history with generation-guarded appends.
//!
//! The reset gesture can land while a run is mid-flight. Rather than racing
//! the loop, `reset()` bumps a generation counter; a run holds the
//! generation it started with and appends through `append_in`, so anything
//! it writes after a reset is silently dropped. However the race falls, a
//! reset leaves the history empty.

use std::sync::Mutex;

use tracing::debug;

use handsfree_core::turn::Turn;

pub type Generation = u64;

#[derive(Default)]
pub struct HistoryStore {
    inner: Mutex<Inner>,
}

#[derive(Default)]
struct Inner {
    turns: Vec<Turn>,
    generation: Generation,
}

impl HistoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// The generation a run should hold for the duration of its appends.
    pub fn begin_run(&self) -> Generation {
        self.lock().generation
    }

    /// Unconditional append, for writes outside any run.
    pub fn append(&self, turn: Turn) {
        self.lock().turns.push(turn);
    }

    /// Append only if `generation` is still current. Returns whether the
    /// turn was kept.
    pub fn append_in(&self, generation: Generation, turn: Turn) -> bool {
        let mut inner = self.lock();
        if inner.generation != generation {
            debug!(
                stale = generation,
                current = inner.generation,
                "Dropping append from a reset run"
            );
            return false;
        }
        inner.turns.push(turn);
        true
    }

    /// Clear all turns and invalidate in-flight runs.
    pub fn reset(&self) {
        let mut inner = self.lock();
        inner.turns.clear();
        inner.generation += 1;
    }

    pub fn snapshot(&self) -> Vec<Turn> {
        self.lock().turns.clone()
    }

    pub fn len(&self) -> usize {
        self.lock().turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().turns.is_empty()
    }

    /// Strip image payloads from all but the `n` most recent image-carrying
    /// turns. Text content stays; only the screenshots are dropped.
    pub fn retain_recent_images(&self, n: usize) {
        let mut inner = self.lock();
        let with_images: Vec<usize> = inner
            .turns
            .iter()
            .enumerate()
            .filter(|(_, t)| t.has_image())
            .map(|(i, _)| i)
            .collect();
        if with_images.len() <= n {
            return;
        }
        let cutoff = with_images.len() - n;
        for &i in &with_images[..cutoff] {
            inner.turns[i].image = None;
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        // Poisoning only happens if a holder panicked; the turn list is
        // still coherent, so keep going.
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}
