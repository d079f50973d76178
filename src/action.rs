//! Action tracking - correlating queued actions with their completions.
//!
//! Every action queued on the engine gets a correlation id from the range
//! reserved for externally-originated actions. The tracker holds each
//! pending action until a [`RobotCompletedAction`](crate::message::RobotCompletedAction)
//! with the same id is dispatched, then marks it completed and wakes any
//! thread blocked in [`Action::wait`].
//!
//! Ids recycle: after `LAST_SDK_TAG - 1` the counter wraps back to
//! [`FIRST_SDK_TAG`]. Only concurrently pending actions are guaranteed
//! distinct ids.

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

use crate::error::Result;
use crate::message::{
    ActionResult, CancelActionByIdTag, QueueActionPosition, QueueSingleAction, RobotAction,
};
use crate::writer::FrameWriter;

/// Correlation id of a queued action.
pub type ActionId = u32;

/// First id of the range reserved for SDK-originated actions.
pub const FIRST_SDK_TAG: ActionId = 2_000_001;

/// End (exclusive) of the range reserved for SDK-originated actions.
pub const LAST_SDK_TAG: ActionId = 3_000_000;

/// Lifecycle state of an action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionStatus {
    /// Queued, no completion received yet.
    Pending,
    /// The engine reported completion with this result.
    Completed(ActionResult),
    /// Cancelled locally through [`Action::abort`].
    Aborted,
    /// The connection closed while the action was pending.
    ConnectionLost,
}

impl ActionStatus {
    /// Whether the action has left the pending state.
    pub fn is_finished(self) -> bool {
        !matches!(self, Self::Pending)
    }
}

/// Status shared between an [`Action`] handle and the tracker.
#[derive(Debug)]
struct ActionState {
    status: Mutex<ActionStatus>,
    changed: Condvar,
}

impl ActionState {
    fn new() -> Self {
        Self {
            status: Mutex::new(ActionStatus::Pending),
            changed: Condvar::new(),
        }
    }

    /// Move out of `Pending`. Later transitions are ignored.
    fn finish(&self, status: ActionStatus) -> bool {
        let mut current = self.status.lock();
        if current.is_finished() {
            return false;
        }
        *current = status;
        self.changed.notify_all();
        true
    }
}

/// Tracks in-flight actions for one connection.
#[derive(Debug)]
pub struct ActionTracker {
    next_id: Mutex<ActionId>,
    pending: Mutex<Vec<(ActionId, Arc<ActionState>)>>,
}

impl ActionTracker {
    /// Create a tracker whose first id is [`FIRST_SDK_TAG`].
    pub fn new() -> Self {
        Self::starting_at(FIRST_SDK_TAG)
    }

    /// Create a tracker whose first id is `first`, clamped into the range.
    pub fn starting_at(first: ActionId) -> Self {
        let first = if (FIRST_SDK_TAG..LAST_SDK_TAG).contains(&first) {
            first
        } else {
            FIRST_SDK_TAG
        };
        Self {
            next_id: Mutex::new(first),
            pending: Mutex::new(Vec::new()),
        }
    }

    /// Hand out the next correlation id.
    pub fn allocate_id(&self) -> ActionId {
        let mut next = self.next_id.lock();
        let id = *next;
        *next += 1;
        if *next >= LAST_SDK_TAG {
            *next = FIRST_SDK_TAG;
        }
        id
    }

    /// Allocate an id, build the queue envelope for `action` and start
    /// tracking it.
    pub fn create(
        &self,
        action: RobotAction,
        num_retries: u8,
        position: QueueActionPosition,
    ) -> PendingAction {
        let id = self.allocate_id();
        let state = Arc::new(ActionState::new());
        self.pending.lock().push((id, Arc::clone(&state)));

        PendingAction {
            message: QueueSingleAction {
                id_tag: id,
                num_retries,
                position,
                action,
            },
            state,
        }
    }

    /// Mark every tracked action with `id` as completed and stop tracking it.
    ///
    /// Returns the number of actions matched.
    pub fn complete(&self, id: ActionId, result: ActionResult) -> usize {
        self.finish_matching(id, ActionStatus::Completed(result))
    }

    /// Stop tracking `id` and mark it aborted.
    ///
    /// Returns the number of actions matched.
    pub fn abort(&self, id: ActionId) -> usize {
        self.finish_matching(id, ActionStatus::Aborted)
    }

    /// Release every pending action with [`ActionStatus::ConnectionLost`].
    pub fn abandon_all(&self) -> usize {
        let drained: Vec<_> = self.pending.lock().drain(..).collect();
        for (_, state) in &drained {
            state.finish(ActionStatus::ConnectionLost);
        }
        drained.len()
    }

    /// Stop tracking `id` without changing its status.
    pub(crate) fn forget(&self, id: ActionId) {
        self.pending.lock().retain(|(pending_id, _)| *pending_id != id);
    }

    /// Number of actions awaiting completion.
    pub fn pending_count(&self) -> usize {
        self.pending.lock().len()
    }

    /// Whether an action with `id` is awaiting completion.
    pub fn is_pending(&self, id: ActionId) -> bool {
        self.pending.lock().iter().any(|(pending_id, _)| *pending_id == id)
    }

    fn finish_matching(&self, id: ActionId, status: ActionStatus) -> usize {
        let matched: Vec<Arc<ActionState>> = {
            let mut pending = self.pending.lock();
            let mut matched = Vec::new();
            pending.retain(|(pending_id, state)| {
                if *pending_id == id {
                    matched.push(Arc::clone(state));
                    false
                } else {
                    true
                }
            });
            matched
        };

        for state in &matched {
            state.finish(status);
        }
        matched.len()
    }
}

impl Default for ActionTracker {
    fn default() -> Self {
        Self::new()
    }
}

/// A freshly tracked action, before it has been sent.
pub struct PendingAction {
    /// Envelope to send to the engine.
    pub message: QueueSingleAction,
    state: Arc<ActionState>,
}

impl PendingAction {
    /// Attach the handles the caller needs to wait on or abort the action.
    pub(crate) fn into_action(self, tracker: Arc<ActionTracker>, writer: Arc<FrameWriter>) -> Action {
        Action {
            message: Arc::new(self.message),
            state: self.state,
            tracker,
            writer,
        }
    }
}

/// Handle to an action queued on the engine.
///
/// Cheap to clone; all clones observe the same status.
#[derive(Clone)]
pub struct Action {
    message: Arc<QueueSingleAction>,
    state: Arc<ActionState>,
    tracker: Arc<ActionTracker>,
    writer: Arc<FrameWriter>,
}

impl Action {
    /// Correlation id of this action.
    pub fn id(&self) -> ActionId {
        self.message.id_tag
    }

    /// The queue envelope that created this action.
    pub fn message(&self) -> &QueueSingleAction {
        &self.message
    }

    /// Current status.
    pub fn status(&self) -> ActionStatus {
        *self.state.status.lock()
    }

    /// Whether the engine reported completion.
    pub fn is_completed(&self) -> bool {
        matches!(self.status(), ActionStatus::Completed(_))
    }

    /// Block until the action leaves [`ActionStatus::Pending`].
    ///
    /// There is no timeout: if the engine never reports completion and the
    /// connection stays up, this never returns.
    pub fn wait(&self) -> ActionStatus {
        let mut status = self.state.status.lock();
        while !status.is_finished() {
            self.state.changed.wait(&mut status);
        }
        *status
    }

    /// Block until the action finishes or `timeout` elapses.
    ///
    /// Returns `None` on timeout; the action stays tracked.
    pub fn wait_timeout(&self, timeout: Duration) -> Option<ActionStatus> {
        let deadline = Instant::now() + timeout;
        let mut status = self.state.status.lock();
        while !status.is_finished() {
            if self
                .state
                .changed
                .wait_until(&mut status, deadline)
                .timed_out()
            {
                return status.is_finished().then_some(*status);
            }
        }
        Some(*status)
    }

    /// Ask the engine to cancel this action and stop tracking it locally.
    ///
    /// Threads blocked in [`wait`](Self::wait) wake with
    /// [`ActionStatus::Aborted`] unless a completion already arrived.
    ///
    /// # Errors
    ///
    /// Returns an error if the cancel request could not be sent. The action
    /// is marked aborted regardless.
    pub fn abort(&self) -> Result<()> {
        self.tracker.abort(self.id());
        self.writer
            .send(&CancelActionByIdTag { id_tag: self.id() }.into())
    }
}

impl fmt::Debug for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Action")
            .field("id", &self.id())
            .field("action", &self.message.action.kind())
            .field("status", &self.status())
            .finish()
    }
}
