mod state;

use std::any::Any;
use std::cell::RefCell;
use std::collections::HashSet;
use std::fmt;
use std::mem;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use serde::Serialize;

use crate::engine::Engine;
use crate::promise::PromiseValue;
use crate::settlement::Settlement;

pub(crate) use state::{CellState, Reaction};
pub use state::Snapshot;

static NEXT_CELL_ID: AtomicU64 = AtomicU64::new(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct CellId(u64);

impl CellId {
    fn next() -> Self {
        Self(NEXT_CELL_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for CellId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Type-erased view of a cell used to walk adoption chains.
pub(crate) trait Tracked: Send + Sync {
    fn id(&self) -> CellId;
    fn following(&self) -> Option<Arc<dyn Tracked>>;
}

/// Identity of the promise behind a thenable, used for cycle detection.
#[derive(Clone)]
pub struct Origin(Arc<dyn Tracked>);

impl Origin {
    pub(crate) fn of<T: PromiseValue>(cell: &Arc<Cell<T>>) -> Self {
        let tracked: Arc<dyn Tracked> = cell.clone();
        Self(tracked)
    }

    pub fn id(&self) -> CellId {
        self.0.id()
    }

    /// Whether following this origin's adoption chain reaches `target`.
    pub(crate) fn leads_to(&self, target: CellId) -> bool {
        let mut seen = HashSet::new();
        let mut cursor = Some(Arc::clone(&self.0));
        while let Some(link) = cursor {
            let id = link.id();
            if id == target {
                return true;
            }
            if !seen.insert(id) {
                return false;
            }
            cursor = link.following();
        }
        false
    }
}

impl fmt::Debug for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Origin").field(&self.id()).finish()
    }
}

/// Shared state behind one deferred and all of its promises.
pub(crate) struct Cell<T: PromiseValue> {
    id: CellId,
    engine: Engine,
    state: Mutex<CellState<T>>,
}

impl<T: PromiseValue> Cell<T> {
    pub fn new(engine: Engine) -> Arc<Self> {
        engine.counters().record_created();
        Arc::new(Self {
            id: CellId::next(),
            engine,
            state: Mutex::new(CellState::pending()),
        })
    }

    pub fn id(&self) -> CellId {
        self.id
    }

    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    fn lock(&self) -> MutexGuard<'_, CellState<T>> {
        // Every critical section leaves the state consistent, so a panic
        // elsewhere never invalidates it.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Reserves the producer side. Only the first caller gets `true`.
    pub fn claim(&self) -> bool {
        let mut state = self.lock();
        if state.locked || state.settlement.is_some() {
            return false;
        }
        state.locked = true;
        true
    }

    pub fn is_pending(&self) -> bool {
        self.lock().settlement.is_none()
    }

    pub fn follow(&self, origin: &Origin) {
        let mut state = self.lock();
        if state.settlement.is_none() {
            state.following = Some(Arc::downgrade(&origin.0));
        }
    }

    /// Moves the cell to its terminal state. Returns `false` if it was
    /// already settled.
    pub fn settle(self: &Arc<Self>, settlement: Settlement<T>) -> bool {
        let schedule = {
            let mut state = self.lock();
            if state.settlement.is_some() {
                return false;
            }
            match &settlement {
                Settlement::Fulfilled(_) => self.engine.counters().record_fulfilled(),
                Settlement::Rejected(_) => self.engine.counters().record_rejected(),
            }
            state.settlement = Some(settlement);
            state.locked = true;
            state.following = None;
            Self::begin_drain(&mut state)
        };
        if schedule {
            self.schedule_drain();
        }
        true
    }

    /// Registers a reaction. It is stored while the cell is pending and
    /// scheduled as soon as the cell is settled.
    pub fn subscribe(self: &Arc<Self>, reaction: Reaction<T>) {
        let schedule = {
            let mut state = self.lock();
            state.observed = true;
            state.reactions.push_back(reaction);
            state.settlement.is_some() && Self::begin_drain(&mut state)
        };
        if schedule {
            self.schedule_drain();
        }
    }

    fn begin_drain(state: &mut CellState<T>) -> bool {
        if state.draining || state.reactions.is_empty() {
            return false;
        }
        state.draining = true;
        true
    }

    fn schedule_drain(self: &Arc<Self>) {
        let cell = Arc::clone(self);
        self.engine.dispatch().dispatch(Box::new(move || cell.drain()));
    }

    fn drain(&self) {
        let mut fired = 0usize;
        loop {
            let (reaction, settlement) = {
                let mut state = self.lock();
                let Some(settlement) = state.settlement.clone() else {
                    state.draining = false;
                    return;
                };
                match state.reactions.pop_front() {
                    Some(reaction) => (reaction, settlement),
                    None => {
                        state.draining = false;
                        break;
                    }
                }
            };
            reaction(settlement);
            fired += 1;
        }
        tracing::trace!(cell = %self.id, fired, "drained reactions");
    }

    pub fn snapshot(&self) -> Snapshot<T> {
        match &self.lock().settlement {
            None => Snapshot::Pending,
            Some(settlement) => settlement.clone().into(),
        }
    }
}

impl<T: PromiseValue> Tracked for Cell<T> {
    fn id(&self) -> CellId {
        self.id
    }

    fn following(&self) -> Option<Arc<dyn Tracked>> {
        self.lock().following.as_ref().and_then(Weak::upgrade)
    }
}

impl<T: PromiseValue> Drop for Cell<T> {
    fn drop(&mut self) {
        let state = self.state.get_mut().unwrap_or_else(PoisonError::into_inner);
        if !state.observed && matches!(state.settlement, Some(Settlement::Rejected(_))) {
            self.engine.counters().record_unobserved_rejection();
        }
        let reactions = mem::take(&mut state.reactions);
        if !reactions.is_empty() {
            release(reactions.into_iter().map(|reaction| Box::new(reaction) as Box<dyn Any>));
        }
    }
}

thread_local! {
    /// Reactions waiting to be dropped by the outermost `release` on this
    /// thread. `None` when no release is in progress.
    static RELEASING: RefCell<Option<Vec<Box<dyn Any>>>> = const { RefCell::new(None) };
}

/// Drops unfired reactions one at a time. A reaction owns the cell it
/// settles, so dropping a pending chain would otherwise nest one drop per
/// link.
fn release(items: impl Iterator<Item = Box<dyn Any>>) {
    let outermost = RELEASING.try_with(|slot| {
        let mut slot = slot.borrow_mut();
        match slot.as_mut() {
            Some(waiting) => {
                waiting.extend(items);
                false
            }
            None => {
                *slot = Some(items.collect());
                true
            }
        }
    });
    if !matches!(outermost, Ok(true)) {
        return;
    }

    while let Some(item) = RELEASING.with(|slot| slot.borrow_mut().as_mut().and_then(Vec::pop)) {
        drop(item);
    }
    RELEASING.with(|slot| slot.borrow_mut().take());
}
