//! Deferred destructive actions with an undo window
//!
//! An action is armed with a delay and a commit callback. Until the deadline
//! passes it can be cancelled; the owning event loop calls [`DeferredActions::poll`]
//! on every tick and due actions are committed exactly once.
//!
//! State per instance:
//! - armed: stored in the table, cancellable
//! - cancelled: removed by `cancel`, `on_cancelled` invoked once
//! - committed: removed by `poll`, `on_commit` invoked once
//!
//! Arming over an existing action replaces it silently (its `on_cancelled`
//! is not invoked). Under [`PendingPolicy::Single`] every other armed action
//! is replaced, under [`PendingPolicy::PerTarget`] only the one for the same
//! target.

use super::clock::{Clock, SystemClock};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt::Debug;
use std::hash::Hash;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum DeferredError {
    #[error("undo delay must be greater than zero")]
    ZeroDelay,
}

/// Countdown length for an armed action, always non-zero
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UndoDelay(Duration);

impl UndoDelay {
    pub fn new(delay: Duration) -> Result<Self, DeferredError> {
        if delay.is_zero() {
            return Err(DeferredError::ZeroDelay);
        }
        Ok(Self(delay))
    }

    pub fn from_millis(ms: u64) -> Result<Self, DeferredError> {
        Self::new(Duration::from_millis(ms))
    }

    pub fn as_duration(&self) -> Duration {
        self.0
    }
}

/// How many undo windows may be open at once
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PendingPolicy {
    /// One pending action across all targets
    #[default]
    Single,
    /// Independent countdown per target
    PerTarget,
}

impl PendingPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            PendingPolicy::Single => "One at a time",
            PendingPolicy::PerTarget => "Per row",
        }
    }

    pub fn next(&self) -> Self {
        match self {
            PendingPolicy::Single => PendingPolicy::PerTarget,
            PendingPolicy::PerTarget => PendingPolicy::Single,
        }
    }
}

/// Identifies one armed instance; stale once that instance is gone
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ArmHandle(u64);

type Callback<K> = Box<dyn FnOnce(&K)>;

struct PendingAction<K> {
    handle: ArmHandle,
    scheduled_at: Instant,
    expires_at: Instant,
    committed: bool,
    on_commit: Option<Callback<K>>,
    on_cancelled: Option<Callback<K>>,
}

/// Owner of every pending action and its deadline
pub struct DeferredActions<K> {
    clock: Box<dyn Clock>,
    policy: PendingPolicy,
    pending: HashMap<K, PendingAction<K>>,
    next_handle: u64,
}

impl<K> DeferredActions<K>
where
    K: Clone + Eq + Hash + Debug,
{
    pub fn new(policy: PendingPolicy) -> Self {
        Self::with_clock(policy, SystemClock)
    }

    pub fn with_clock(policy: PendingPolicy, clock: impl Clock + 'static) -> Self {
        Self {
            clock: Box::new(clock),
            policy,
            pending: HashMap::new(),
            next_handle: 0,
        }
    }

    pub fn policy(&self) -> PendingPolicy {
        self.policy
    }

    /// Applies to actions armed from now on
    pub fn set_policy(&mut self, policy: PendingPolicy) {
        self.policy = policy;
    }

    /// Current instant according to the controller's clock
    pub fn now(&self) -> Instant {
        self.clock.now()
    }

    /// Arm an action that commits after `delay` unless cancelled
    pub fn arm(
        &mut self,
        target: K,
        delay: UndoDelay,
        on_commit: impl FnOnce(&K) + 'static,
    ) -> ArmHandle {
        self.arm_inner(target, delay, Box::new(on_commit), None)
    }

    /// Like [`arm`](Self::arm), with a callback for user-initiated cancellation
    pub fn arm_with_cancel(
        &mut self,
        target: K,
        delay: UndoDelay,
        on_commit: impl FnOnce(&K) + 'static,
        on_cancelled: impl FnOnce(&K) + 'static,
    ) -> ArmHandle {
        self.arm_inner(target, delay, Box::new(on_commit), Some(Box::new(on_cancelled)))
    }

    fn arm_inner(
        &mut self,
        target: K,
        delay: UndoDelay,
        on_commit: Callback<K>,
        on_cancelled: Option<Callback<K>>,
    ) -> ArmHandle {
        // Replaced actions are dropped here, before the new deadline exists
        match self.policy {
            PendingPolicy::Single => {
                for (replaced, _) in self.pending.drain() {
                    debug!(key = ?replaced, "pending action replaced");
                }
            }
            PendingPolicy::PerTarget => {
                if self.pending.remove(&target).is_some() {
                    debug!(key = ?target, "pending action replaced");
                }
            }
        }

        let now = self.clock.now();
        let handle = ArmHandle(self.next_handle);
        self.next_handle += 1;

        info!(key = ?target, delay_ms = delay.as_duration().as_millis() as u64, "action armed");

        self.pending.insert(
            target,
            PendingAction {
                handle,
                scheduled_at: now,
                expires_at: now + delay.as_duration(),
                committed: false,
                on_commit: Some(on_commit),
                on_cancelled,
            },
        );

        handle
    }

    /// Cancel the armed action for `target`; false if nothing was armed
    pub fn cancel(&mut self, target: &K) -> bool {
        let Some(mut action) = self.pending.remove(target) else {
            return false;
        };

        info!(key = ?target, "action cancelled");
        if let Some(on_cancelled) = action.on_cancelled.take() {
            on_cancelled(target);
        }
        true
    }

    /// Cancel exactly the instance `handle` was issued for
    pub fn cancel_handle(&mut self, handle: ArmHandle) -> bool {
        let target = self
            .pending
            .iter()
            .find(|(_, action)| action.handle == handle)
            .map(|(target, _)| target.clone());

        match target {
            Some(target) => self.cancel(&target),
            None => false,
        }
    }

    /// Cancel everything still armed, e.g. when the owning view goes away
    pub fn cancel_all(&mut self) -> usize {
        let targets: Vec<K> = self.pending.keys().cloned().collect();
        targets.iter().filter(|target| self.cancel(target)).count()
    }

    pub fn is_pending(&self, target: &K) -> bool {
        self.pending.contains_key(target)
    }

    /// Time left before commit, zero once the deadline has passed
    pub fn remaining(&self, target: &K) -> Option<Duration> {
        let now = self.clock.now();
        self.pending
            .get(target)
            .map(|action| action.expires_at.saturating_duration_since(now))
    }

    pub fn remaining_ms(&self, target: &K) -> Option<u64> {
        self.remaining(target).map(|d| d.as_millis() as u64)
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Commit every action whose deadline has passed, oldest deadline first
    pub fn poll(&mut self) -> usize {
        let now = self.clock.now();

        let mut due: Vec<(Instant, ArmHandle, K)> = self
            .pending
            .iter()
            .filter(|(_, action)| action.expires_at <= now)
            .map(|(target, action)| (action.expires_at, action.handle, target.clone()))
            .collect();
        due.sort_by_key(|(expires_at, handle, _)| (*expires_at, handle.0));

        let mut fired = 0;
        for (_, _, target) in due {
            let Some(mut action) = self.pending.remove(&target) else {
                continue;
            };
            debug_assert!(!action.committed);
            action.committed = true;

            info!(
                key = ?target,
                waited_ms = now.saturating_duration_since(action.scheduled_at).as_millis() as u64,
                "action committed"
            );
            if let Some(on_commit) = action.on_commit.take() {
                on_commit(&target);
                fired += 1;
            }
        }
        fired
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::deferred::ManualClock;
    use std::cell::RefCell;
    use std::rc::Rc;

    type Log = Rc<RefCell<Vec<String>>>;

    fn recorder(log: &Log, tag: &'static str) -> impl FnOnce(&&'static str) + 'static {
        let log = Rc::clone(log);
        move |target: &&'static str| log.borrow_mut().push(format!("{}:{}", tag, target))
    }

    fn setup(policy: PendingPolicy) -> (DeferredActions<&'static str>, ManualClock, Log) {
        let clock = ManualClock::new();
        let actions = DeferredActions::with_clock(policy, clock.clone());
        (actions, clock, Rc::new(RefCell::new(Vec::new())))
    }

    fn delay(ms: u64) -> UndoDelay {
        UndoDelay::from_millis(ms).unwrap()
    }

    #[test]
    fn test_zero_delay_rejected() {
        assert_eq!(UndoDelay::from_millis(0), Err(DeferredError::ZeroDelay));
        assert!(UndoDelay::from_millis(1).is_ok());
    }

    #[test]
    fn test_cancel_before_expiry_prevents_commit() {
        let (mut actions, clock, log) = setup(PendingPolicy::Single);
        actions.arm("row-7", delay(4000), recorder(&log, "commit"));

        clock.advance_ms(1000);
        assert!(actions.cancel(&"row-7"));

        clock.advance_ms(10_000);
        assert_eq!(actions.poll(), 0);
        assert!(log.borrow().is_empty());
        assert!(!actions.is_pending(&"row-7"));
    }

    #[test]
    fn test_commit_fires_once_at_deadline() {
        let (mut actions, clock, log) = setup(PendingPolicy::Single);
        actions.arm("row-7", delay(4000), recorder(&log, "commit"));

        clock.advance_ms(3999);
        assert_eq!(actions.poll(), 0);

        clock.advance_ms(1);
        assert_eq!(actions.poll(), 1);
        assert_eq!(actions.poll(), 0);

        assert_eq!(*log.borrow(), vec!["commit:row-7".to_string()]);
    }

    #[test]
    fn test_cancel_after_commit_is_noop() {
        let (mut actions, clock, log) = setup(PendingPolicy::Single);
        actions.arm_with_cancel(
            "row-7",
            delay(4000),
            recorder(&log, "commit"),
            recorder(&log, "cancel"),
        );

        clock.advance_ms(4000);
        actions.poll();

        assert!(!actions.cancel(&"row-7"));
        assert_eq!(*log.borrow(), vec!["commit:row-7".to_string()]);
    }

    #[test]
    fn test_cancel_is_idempotent() {
        let (mut actions, _clock, log) = setup(PendingPolicy::Single);
        actions.arm_with_cancel(
            "row-7",
            delay(4000),
            recorder(&log, "commit"),
            recorder(&log, "cancel"),
        );

        assert!(actions.cancel(&"row-7"));
        assert!(!actions.cancel(&"row-7"));
        assert!(!actions.cancel(&"never-armed"));
        assert_eq!(*log.borrow(), vec!["cancel:row-7".to_string()]);
    }

    #[test]
    fn test_rearm_same_target_supersedes_first() {
        let (mut actions, clock, log) = setup(PendingPolicy::Single);
        actions.arm_with_cancel(
            "row-7",
            delay(4000),
            recorder(&log, "first"),
            recorder(&log, "first-cancel"),
        );

        clock.advance_ms(500);
        actions.arm("row-7", delay(4000), recorder(&log, "second"));

        clock.advance_ms(3500);
        assert_eq!(actions.poll(), 0);
        assert!(log.borrow().is_empty());

        clock.advance_ms(499);
        assert_eq!(actions.poll(), 0);

        clock.advance_ms(1);
        assert_eq!(actions.poll(), 1);
        assert_eq!(*log.borrow(), vec!["second:row-7".to_string()]);
    }

    #[test]
    fn test_single_policy_replaces_other_targets() {
        let (mut actions, clock, log) = setup(PendingPolicy::Single);
        actions.arm_with_cancel(
            "row-1",
            delay(4000),
            recorder(&log, "commit"),
            recorder(&log, "cancel"),
        );
        actions.arm("row-2", delay(4000), recorder(&log, "commit"));

        assert!(!actions.is_pending(&"row-1"));
        assert!(actions.is_pending(&"row-2"));
        assert_eq!(actions.pending_count(), 1);

        clock.advance_ms(4000);
        actions.poll();
        assert_eq!(*log.borrow(), vec!["commit:row-2".to_string()]);
    }

    #[test]
    fn test_per_target_policy_keeps_independent_countdowns() {
        let (mut actions, clock, log) = setup(PendingPolicy::PerTarget);
        actions.arm("row-1", delay(4000), recorder(&log, "commit"));
        clock.advance_ms(1000);
        actions.arm("row-2", delay(4000), recorder(&log, "commit"));

        assert_eq!(actions.pending_count(), 2);

        clock.advance_ms(3000);
        assert_eq!(actions.poll(), 1);
        clock.advance_ms(1000);
        assert_eq!(actions.poll(), 1);

        assert_eq!(
            *log.borrow(),
            vec!["commit:row-1".to_string(), "commit:row-2".to_string()]
        );
    }

    #[test]
    fn test_poll_commits_in_deadline_order() {
        let (mut actions, clock, log) = setup(PendingPolicy::PerTarget);
        actions.arm("late", delay(5000), recorder(&log, "commit"));
        actions.arm("early", delay(3000), recorder(&log, "commit"));

        clock.advance_ms(6000);
        assert_eq!(actions.poll(), 2);
        assert_eq!(
            *log.borrow(),
            vec!["commit:early".to_string(), "commit:late".to_string()]
        );
    }

    #[test]
    fn test_remaining_is_monotonic_and_clamped() {
        let (mut actions, clock, log) = setup(PendingPolicy::Single);
        assert_eq!(actions.remaining(&"row-7"), None);

        actions.arm("row-7", delay(4000), recorder(&log, "commit"));

        let mut previous = actions.remaining_ms(&"row-7").unwrap();
        assert_eq!(previous, 4000);
        for step in [10, 990, 1500, 1499, 1] {
            clock.advance_ms(step);
            let now = actions.remaining_ms(&"row-7").unwrap();
            assert!(now <= previous);
            previous = now;
        }
        assert_eq!(previous, 0);

        clock.advance_ms(2500);
        assert_eq!(actions.remaining(&"row-7"), Some(Duration::ZERO));

        actions.poll();
        assert_eq!(actions.remaining(&"row-7"), None);
    }

    #[test]
    fn test_stale_handle_does_not_cancel_replacement() {
        let (mut actions, clock, log) = setup(PendingPolicy::Single);
        let first = actions.arm("row-7", delay(4000), recorder(&log, "first"));
        let second = actions.arm("row-7", delay(4000), recorder(&log, "second"));

        assert!(!actions.cancel_handle(first));
        assert!(actions.is_pending(&"row-7"));

        assert!(actions.cancel_handle(second));
        clock.advance_ms(5000);
        assert_eq!(actions.poll(), 0);
        assert!(log.borrow().is_empty());
    }

    #[test]
    fn test_cancel_all_invokes_cancel_callbacks() {
        let (mut actions, clock, log) = setup(PendingPolicy::PerTarget);
        actions.arm_with_cancel(
            "row-1",
            delay(4000),
            recorder(&log, "commit"),
            recorder(&log, "cancel"),
        );
        actions.arm("row-2", delay(4000), recorder(&log, "commit"));

        assert_eq!(actions.cancel_all(), 2);
        clock.advance_ms(5000);
        assert_eq!(actions.poll(), 0);
        assert_eq!(*log.borrow(), vec!["cancel:row-1".to_string()]);
    }

    #[test]
    fn test_policy_cycle() {
        assert_eq!(PendingPolicy::Single.next(), PendingPolicy::PerTarget);
        assert_eq!(PendingPolicy::Single.next().next(), PendingPolicy::Single);
    }
}
