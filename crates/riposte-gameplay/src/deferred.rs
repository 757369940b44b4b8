//! Delayed effects.
//!
//! "Wait N seconds, then apply something for M seconds" is stored as an
//! explicit record and advanced by the owner's tick. Each key holds at most
//! one record: scheduling a key again replaces whatever was pending.

/// A pending or running delayed effect.
#[derive(Debug, Clone, PartialEq)]
pub struct DeferredAction<A> {
    /// Seconds left before the effect starts.
    pub remaining_delay: f32,
    /// Seconds of the effect left once started.
    pub remaining_duration: f32,
    /// Payload handed back on every active tick.
    pub action: A,
    total_duration: f32,
    started: bool,
}

impl<A> DeferredAction<A> {
    /// Whether the delay has elapsed.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.started
    }
}

/// The part of a record that ran during one `advance`.
#[derive(Debug, Clone, PartialEq)]
pub struct ActiveSlice<A> {
    /// Payload of the record.
    pub action: A,
    /// Seconds of the effect that elapsed this tick.
    pub active_time: f32,
    /// Fraction of the effect completed after this tick (0.0-1.0).
    pub progress: f32,
    /// The delay elapsed during this tick.
    pub started: bool,
    /// The effect completed during this tick; the record is gone.
    pub finished: bool,
}

/// Keyed set of delayed effects.
#[derive(Debug, Clone)]
pub struct DeferredScheduler<K, A> {
    entries: Vec<(K, DeferredAction<A>)>,
}

impl<K, A> Default for DeferredScheduler<K, A> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
        }
    }
}

impl<K: Copy + PartialEq, A: Clone> DeferredScheduler<K, A> {
    /// Create an empty scheduler.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedule `action` under `key`. Returns `true` if a pending record for
    /// the same key was replaced.
    pub fn schedule(&mut self, key: K, delay: f32, duration: f32, action: A) -> bool {
        let replaced = self.cancel(key).is_some();
        let duration = duration.max(0.0);
        self.entries.push((
            key,
            DeferredAction {
                remaining_delay: delay.max(0.0),
                remaining_duration: duration,
                action,
                total_duration: duration,
                started: false,
            },
        ));
        replaced
    }

    /// Drop the record for `key`, returning its payload.
    pub fn cancel(&mut self, key: K) -> Option<A> {
        let index = self.entries.iter().position(|(k, _)| *k == key)?;
        Some(self.entries.remove(index).1.action)
    }

    /// Drop every record.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Record stored under `key`.
    #[must_use]
    pub fn get(&self, key: K) -> Option<&DeferredAction<A>> {
        self.entries
            .iter()
            .find_map(|(k, entry)| (*k == key).then_some(entry))
    }

    /// Whether a record exists under `key`.
    #[must_use]
    pub fn is_pending(&self, key: K) -> bool {
        self.get(key).is_some()
    }

    /// Number of records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether there are no records.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Advance every record by `dt` and report what ran.
    ///
    /// Delay left over in a tick flows into the effect, so a record whose
    /// delay ends mid-tick reports the remainder as `active_time`.
    pub fn advance(&mut self, dt: f32) -> Vec<(K, ActiveSlice<A>)> {
        let dt = dt.max(0.0);
        let mut slices = Vec::new();

        for (key, entry) in &mut self.entries {
            let mut remaining = dt;

            if entry.remaining_delay > 0.0 {
                let used = remaining.min(entry.remaining_delay);
                entry.remaining_delay -= used;
                remaining -= used;
                if entry.remaining_delay > 0.0 {
                    continue;
                }
            }

            let started = !entry.started;
            entry.started = true;

            let active_time = remaining.min(entry.remaining_duration);
            entry.remaining_duration -= active_time;
            let finished = entry.remaining_duration <= 0.0;

            if !(started || finished || active_time > 0.0) {
                continue;
            }

            let progress = if entry.total_duration <= 0.0 {
                1.0
            } else {
                (1.0 - entry.remaining_duration / entry.total_duration).clamp(0.0, 1.0)
            };

            slices.push((
                *key,
                ActiveSlice {
                    action: entry.action.clone(),
                    active_time,
                    progress,
                    started,
                    finished,
                },
            ));
        }

        self.entries
            .retain(|(_, entry)| !(entry.started && entry.remaining_duration <= 0.0));
        slices
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Copy, PartialEq)]
    enum Kind {
        Lunge,
        Heal,
    }

    #[test]
    fn test_delay_then_duration() {
        let mut scheduler = DeferredScheduler::new();
        scheduler.schedule(Kind::Lunge, 0.1, 0.2, "lunge");

        assert!(scheduler.advance(0.05).is_empty());

        let slices = scheduler.advance(0.1);
        assert_eq!(slices.len(), 1);
        let (_, slice) = &slices[0];
        assert!(slice.started);
        assert!((slice.active_time - 0.05).abs() < 1.0e-5);
        assert!((slice.progress - 0.25).abs() < 1.0e-4);
        assert!(!slice.finished);

        let slices = scheduler.advance(0.5);
        let (_, slice) = &slices[0];
        assert!(slice.finished);
        assert!((slice.active_time - 0.15).abs() < 1.0e-5);
        assert!(scheduler.is_empty());
    }

    #[test]
    fn test_reschedule_replaces_pending() {
        let mut scheduler = DeferredScheduler::new();
        assert!(!scheduler.schedule(Kind::Lunge, 0.5, 0.1, 1));
        assert!(scheduler.schedule(Kind::Lunge, 0.5, 0.1, 2));
        scheduler.schedule(Kind::Heal, 0.5, 0.1, 3);

        assert_eq!(scheduler.len(), 2);
        assert_eq!(scheduler.get(Kind::Lunge).map(|e| e.action), Some(2));
    }

    #[test]
    fn test_cancel_and_clear() {
        let mut scheduler = DeferredScheduler::new();
        scheduler.schedule(Kind::Lunge, 0.0, 1.0, ());
        scheduler.schedule(Kind::Heal, 0.0, 1.0, ());

        assert_eq!(scheduler.cancel(Kind::Lunge), Some(()));
        assert!(!scheduler.is_pending(Kind::Lunge));
        assert_eq!(scheduler.cancel(Kind::Lunge), None);

        scheduler.clear();
        assert!(scheduler.is_empty());
    }

    #[test]
    fn test_instant_action_fires_once() {
        let mut scheduler = DeferredScheduler::new();
        scheduler.schedule(Kind::Heal, 0.0, 0.0, ());

        let slices = scheduler.advance(0.0);
        assert_eq!(slices.len(), 1);
        assert!(slices[0].1.started && slices[0].1.finished);
        assert!(scheduler.advance(1.0).is_empty());
    }

    #[test]
    fn test_zero_dt_does_not_advance_running_record() {
        let mut scheduler = DeferredScheduler::new();
        scheduler.schedule(Kind::Heal, 0.0, 1.0, ());
        scheduler.advance(0.5);

        assert!(scheduler.advance(0.0).is_empty());
        let entry = scheduler.get(Kind::Heal).expect("still running");
        assert!(entry.is_running());
        assert!((entry.remaining_duration - 0.5).abs() < 1.0e-6);
    }
}
