//! Delayed, cancellable state transitions.
//!
//! Agents never hold callbacks. Every transition is data: a [`Step`] pairs a
//! delay with an [`Action`], and a timeline is the ordered list of steps that
//! remain. The world owns a single [`Scheduler`]; each agent owns a
//! [`TimerGroup`] recording the handles it scheduled so a reset or destroy can
//! cancel all of them at once.

use std::{
    collections::{BTreeMap, HashMap, VecDeque},
    time::Duration,
};

use tailchase_core::{AgentId, Posture, Tint, Vitality};

/// Maximum number of missed periods a repeating timer replays in one tick.
const MAX_CATCH_UP_PERIODS: u32 = 8;

/// Mutation applied to an agent when a step comes due.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) enum Action {
    /// Sets the agent's speed.
    Speed(f32),
    /// Moves the agent to another rung of the vitality ladder.
    Vitality(Vitality),
    /// Applies a fixed tint.
    Tint(Tint),
    /// Applies a random shade of the provided tint.
    RandomTint(Tint),
    /// Makes the agent flee (`true`) or pursue (`false`) its target.
    Reverse(bool),
    /// Records the timeline the agent is following.
    Posture(Posture),
    /// Grants or revokes the controlled entity's ability to catch followers.
    Empowered(bool),
    /// Restores the role's baseline, cancelling everything still pending.
    Reset,
}

/// Single entry of a timeline: `action` runs `delay` after the previous step.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct Step {
    delay: Duration,
    action: Action,
}

impl Step {
    /// Step that runs together with the previous one.
    pub(crate) const fn now(action: Action) -> Self {
        Self {
            delay: Duration::ZERO,
            action,
        }
    }

    /// Step that runs `millis` milliseconds after the previous one.
    pub(crate) const fn after(millis: u64, action: Action) -> Self {
        Self {
            delay: Duration::from_millis(millis),
            action,
        }
    }

    pub(crate) const fn delay(&self) -> Duration {
        self.delay
    }

    pub(crate) const fn action(&self) -> Action {
        self.action
    }
}

/// Remaining steps of a timeline, head first.
pub(crate) type Timeline = VecDeque<Step>;

/// Work performed when a timer fires.
#[derive(Clone, Debug, PartialEq)]
pub(crate) enum TimerJob {
    /// Resume a timeline; the head step is the one that came due.
    Timeline(Timeline),
    /// Advance the owner's supernova by one pulse.
    SupernovaPulse,
}

/// Opaque identifier of a scheduled timer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub(crate) struct TimerHandle(u64);

/// Timers scheduled on behalf of one agent.
///
/// Cancelling the group removes every outstanding timer and advances the
/// epoch, so a timeline driver that is mid-run can tell it was superseded.
#[derive(Clone, Debug, Default)]
pub(crate) struct TimerGroup {
    epoch: u64,
    handles: Vec<TimerHandle>,
}

impl TimerGroup {
    pub(crate) fn epoch(&self) -> u64 {
        self.epoch
    }

    /// Number of timers still pending for the owner.
    pub(crate) fn len(&self) -> usize {
        self.handles.len()
    }

    fn forget(&mut self, handle: TimerHandle) {
        self.handles.retain(|pending| *pending != handle);
    }
}

#[derive(Clone, Debug)]
struct ScheduledTimer {
    owner: AgentId,
    epoch: u64,
    job: TimerJob,
    period: Option<Duration>,
}

/// Timer that came due and must be executed by the world.
#[derive(Clone, Debug)]
pub(crate) struct DueTimer {
    pub(crate) handle: TimerHandle,
    pub(crate) owner: AgentId,
    pub(crate) epoch: u64,
    pub(crate) job: TimerJob,
    pub(crate) repeating: bool,
}

/// Clock-ordered queue of every pending timer in the world.
#[derive(Clone, Debug, Default)]
pub(crate) struct Scheduler {
    now: Duration,
    next_sequence: u64,
    queue: BTreeMap<(Duration, u64), ScheduledTimer>,
    due_by_handle: HashMap<TimerHandle, Duration>,
}

impl Scheduler {
    /// Simulated time elapsed since the world was created.
    pub(crate) fn now(&self) -> Duration {
        self.now
    }

    /// Moves the clock forward. Due timers are drained with [`Self::pop_due`].
    pub(crate) fn advance(&mut self, dt: Duration) {
        self.now = self.now.saturating_add(dt);
    }

    /// Schedules a one-shot `job` for `owner`, `delay` from now.
    pub(crate) fn schedule(
        &mut self,
        group: &mut TimerGroup,
        owner: AgentId,
        delay: Duration,
        job: TimerJob,
    ) -> TimerHandle {
        self.insert(group, owner, delay, job, None)
    }

    /// Schedules `job` to fire every `period` until the owner's group is cancelled.
    pub(crate) fn schedule_repeating(
        &mut self,
        group: &mut TimerGroup,
        owner: AgentId,
        period: Duration,
        job: TimerJob,
    ) -> TimerHandle {
        self.insert(group, owner, period, job, Some(period))
    }

    fn insert(
        &mut self,
        group: &mut TimerGroup,
        owner: AgentId,
        delay: Duration,
        job: TimerJob,
        period: Option<Duration>,
    ) -> TimerHandle {
        let sequence = self.next_sequence;
        self.next_sequence += 1;
        let handle = TimerHandle(sequence);
        let due = self.now.saturating_add(delay);

        let _ = self.queue.insert(
            (due, sequence),
            ScheduledTimer {
                owner,
                epoch: group.epoch,
                job,
                period,
            },
        );
        let _ = self.due_by_handle.insert(handle, due);
        group.handles.push(handle);
        handle
    }

    /// Removes the earliest timer whose due time has passed.
    ///
    /// Repeating timers are re-queued one period later. A repeating timer that
    /// fell more than a few periods behind skips the backlog.
    pub(crate) fn pop_due(&mut self) -> Option<DueTimer> {
        let (&(due, sequence), _) = self.queue.first_key_value()?;
        if due > self.now {
            return None;
        }

        let timer = self.queue.remove(&(due, sequence))?;
        let handle = TimerHandle(sequence);

        match timer.period {
            Some(period) => {
                let mut next = due.saturating_add(period);
                let horizon = period.saturating_mul(MAX_CATCH_UP_PERIODS);
                if self.now.saturating_sub(next) > horizon {
                    next = self.now.saturating_sub(horizon);
                }
                let _ = self.queue.insert((next, sequence), timer.clone());
                let _ = self.due_by_handle.insert(handle, next);
            }
            None => {
                let _ = self.due_by_handle.remove(&handle);
            }
        }

        Some(DueTimer {
            handle,
            owner: timer.owner,
            epoch: timer.epoch,
            job: timer.job,
            repeating: timer.period.is_some(),
        })
    }

    /// Drops a one-shot timer that fired from its owner's group.
    pub(crate) fn complete(group: &mut TimerGroup, handle: TimerHandle) {
        group.forget(handle);
    }

    /// Cancels every timer in the group and advances its epoch.
    pub(crate) fn cancel_all(&mut self, group: &mut TimerGroup) {
        for handle in group.handles.drain(..) {
            if let Some(due) = self.due_by_handle.remove(&handle) {
                let _ = self.queue.remove(&(due, handle.0));
            }
        }
        group.epoch += 1;
    }

    /// Number of timers pending across every agent.
    pub(crate) fn pending(&self) -> usize {
        self.queue.len()
    }
}
