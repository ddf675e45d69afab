//! Gesture debouncing.
//!
//! The pose classifier reports per-frame, so a hand held up for a second
//! produces dozens of identical readings. The debouncer applies a global
//! cooldown: after any accepted pose, every reading is ignored until the
//! cooldown elapses, so a held pose fires exactly once.

use std::time::{Duration, Instant};

use handsfree_core::gesture::{GestureEvent, GesturePose};

pub struct GestureDebouncer {
    cooldown: Duration,
    last_accepted: Option<Instant>,
}

impl GestureDebouncer {
    pub fn new(cooldown: Duration) -> Self {
        Self {
            cooldown,
            last_accepted: None,
        }
    }

    /// Offer a pose reading; returns the control event if it is accepted.
    pub fn accept(&mut self, pose: GesturePose, now: Instant) -> Option<GestureEvent> {
        if let Some(last) = self.last_accepted {
            if now.duration_since(last) < self.cooldown {
                return None;
            }
        }
        self.last_accepted = Some(now);
        Some(GestureEvent::from_pose(pose))
    }
}
