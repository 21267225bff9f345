//! Per-frame callback scheduling.

use std::time::{Duration, Instant};

use crate::error::Result;

/// Handle returned by [`FrameScheduler::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type FrameCallback<C> = Box<dyn FnMut(&mut C, f32) -> Result<()>>;

struct Subscription<C> {
    id: SubscriptionId,
    priority: i32,
    callback: FrameCallback<C>,
}

/// Runs registered callbacks once per frame in ascending priority order.
///
/// Callbacks with equal priority run in registration order. `C` is the
/// per-frame context handed to every callback.
pub struct FrameScheduler<C> {
    subscriptions: Vec<Subscription<C>>,
    next_id: u64,
    ticks: u64,
}

impl<C> Default for FrameScheduler<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C> FrameScheduler<C> {
    pub fn new() -> Self {
        Self {
            subscriptions: Vec::new(),
            next_id: 0,
            ticks: 0,
        }
    }

    /// Registers a callback at the given priority.
    pub fn subscribe<F>(&mut self, priority: i32, callback: F) -> SubscriptionId
    where
        F: FnMut(&mut C, f32) -> Result<()> + 'static,
    {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;

        let index = self
            .subscriptions
            .partition_point(|sub| sub.priority <= priority);
        self.subscriptions.insert(
            index,
            Subscription {
                id,
                priority,
                callback: Box::new(callback),
            },
        );
        id
    }

    /// Removes a callback. Returns false if it was not registered.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.subscriptions.len();
        self.subscriptions.retain(|sub| sub.id != id);
        self.subscriptions.len() != before
    }

    /// Runs every callback once with `delta` seconds.
    ///
    /// Stops at the first callback that fails and returns its error; the
    /// remaining callbacks are skipped for this frame.
    pub fn tick(&mut self, ctx: &mut C, delta: f32) -> Result<()> {
        self.ticks += 1;
        for sub in &mut self.subscriptions {
            (sub.callback)(ctx, delta)?;
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.subscriptions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subscriptions.is_empty()
    }

    /// Priorities in execution order.
    pub fn priorities(&self) -> Vec<i32> {
        self.subscriptions.iter().map(|sub| sub.priority).collect()
    }

    /// Number of ticks run so far, including failed ones.
    pub fn ticks(&self) -> u64 {
        self.ticks
    }
}

/// Measures the time between frames.
#[derive(Debug, Clone)]
pub struct FrameClock {
    last: Option<Instant>,
    max_delta: Duration,
    elapsed: Duration,
}

impl Default for FrameClock {
    fn default() -> Self {
        Self::new(Duration::from_millis(100))
    }
}

impl FrameClock {
    /// Creates a clock whose deltas never exceed `max_delta`.
    pub fn new(max_delta: Duration) -> Self {
        Self {
            last: None,
            max_delta,
            elapsed: Duration::ZERO,
        }
    }

    /// Seconds since the previous tick. The first tick returns 0.
    pub fn tick(&mut self) -> f32 {
        self.tick_at(Instant::now())
    }

    /// Like [`tick`](Self::tick) with an explicit timestamp.
    pub fn tick_at(&mut self, now: Instant) -> f32 {
        let delta = self
            .last
            .map_or(Duration::ZERO, |last| now.saturating_duration_since(last))
            .min(self.max_delta);
        self.last = Some(now);
        self.elapsed += delta;
        delta.as_secs_f32()
    }

    /// Sum of all deltas returned so far.
    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    pub fn max_delta(&self) -> Duration {
        self.max_delta
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use proptest::prelude::*;

    use super::*;
    use crate::error::ComposerError;

    #[test]
    fn test_ticks_in_priority_order() {
        let mut scheduler = FrameScheduler::<Vec<&'static str>>::new();
        scheduler.subscribe(1, |log, _| {
            log.push("composer");
            Ok(())
        });
        scheduler.subscribe(0, |log, _| {
            log.push("update");
            Ok(())
        });
        scheduler.subscribe(1, |log, _| {
            log.push("overlay");
            Ok(())
        });

        let mut log = Vec::new();
        scheduler.tick(&mut log, 0.016).unwrap();
        assert_eq!(log, vec!["update", "composer", "overlay"]);
        assert_eq!(scheduler.priorities(), vec![0, 1, 1]);
    }

    #[test]
    fn test_delta_is_forwarded() {
        let mut scheduler = FrameScheduler::<f32>::new();
        scheduler.subscribe(0, |seen, delta| {
            *seen = delta;
            Ok(())
        });
        let mut seen = 0.0;
        scheduler.tick(&mut seen, 0.25).unwrap();
        assert!((seen - 0.25).abs() < f32::EPSILON);
    }

    #[test]
    fn test_unsubscribe() {
        let mut scheduler = FrameScheduler::<u32>::new();
        let id = scheduler.subscribe(0, |count, _| {
            *count += 1;
            Ok(())
        });
        assert!(scheduler.unsubscribe(id));
        assert!(!scheduler.unsubscribe(id));
        assert!(scheduler.is_empty());

        let mut count = 0;
        scheduler.tick(&mut count, 0.0).unwrap();
        assert_eq!(count, 0);
    }

    #[test]
    fn test_error_aborts_tick() {
        let ran_after = Rc::new(RefCell::new(false));
        let flag = Rc::clone(&ran_after);

        let mut scheduler = FrameScheduler::<()>::new();
        scheduler.subscribe(0, |_, _| Err(ComposerError::Render("lost device".into())));
        scheduler.subscribe(1, move |_, _| {
            *flag.borrow_mut() = true;
            Ok(())
        });

        let err = scheduler.tick(&mut (), 0.0).unwrap_err();
        assert!(matches!(err, ComposerError::Render(_)));
        assert!(!*ran_after.borrow());
        assert_eq!(scheduler.ticks(), 1);
    }

    #[test]
    fn test_clock_first_tick_is_zero() {
        let mut clock = FrameClock::default();
        let start = Instant::now();
        assert!(clock.tick_at(start).abs() < f32::EPSILON);
        let delta = clock.tick_at(start + Duration::from_millis(16));
        assert!((delta - 0.016).abs() < 1e-6);
    }

    #[test]
    fn test_clock_clamps_long_frames() {
        let mut clock = FrameClock::new(Duration::from_millis(50));
        let start = Instant::now();
        clock.tick_at(start);
        let delta = clock.tick_at(start + Duration::from_secs(3));
        assert!((delta - 0.05).abs() < 1e-6);
        assert_eq!(clock.elapsed(), Duration::from_millis(50));
    }

    proptest! {
        #[test]
        fn prop_execution_order_is_stable_sort(priorities in proptest::collection::vec(-5i32..5, 0..24)) {
            let mut scheduler = FrameScheduler::<Vec<(i32, usize)>>::new();
            for (index, &priority) in priorities.iter().enumerate() {
                scheduler.subscribe(priority, move |log, _| {
                    log.push((priority, index));
                    Ok(())
                });
            }

            let mut log = Vec::new();
            scheduler.tick(&mut log, 0.0).unwrap();

            let mut expected: Vec<(i32, usize)> =
                priorities.iter().copied().zip(0..).collect();
            expected.sort_by_key(|&(priority, _)| priority);
            prop_assert_eq!(log, expected);
        }
    }
}
