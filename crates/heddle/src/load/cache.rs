//! Concurrency-safe registry of loading units per scope.
//!
//! Guarantees at-most-one construction per scope key under concurrent
//! requests: the first caller to find a key absent claims it and runs the
//! build function with no cache lock held; everyone else parks on that
//! key's build gate and receives the winner's result. Ready-state reads
//! take only the map's read lock, since they happen on every activity
//! invocation.

use std::fmt;
use std::sync::{Arc, Condvar, Mutex, PoisonError, RwLock};

use rustc_hash::FxHashMap;

use crate::error::{Error, Result};
use crate::registry::RunRegistry;

use super::unit::LoadingUnit;

/// The unit of sharing for a loading unit.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ScopeKey {
    /// Scoped to a single workflow run. Only valid while the run is alive.
    Workflow(String),
    /// Process-wide scope; built once per process lifetime.
    System,
}

impl fmt::Display for ScopeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Workflow(run_id) => write!(f, "workflow({run_id})"),
            Self::System => f.write_str("system"),
        }
    }
}

/// Helper to convert PoisonError to our Error type.
fn lock_error<T>(e: PoisonError<T>) -> Error {
    Error::Lock(format!("scope cache lock poisoned (thread panicked): {e}"))
}

/// Outcome a build gate delivers to parked waiters.
///
/// The failure side carries only the rendered cause: the original error
/// goes to the winning caller, waiters get a [`Error::ScopeBuild`] built
/// from this message.
type GateOutcome = std::result::Result<Arc<LoadingUnit>, String>;

enum GateState {
    Pending,
    Done(GateOutcome),
}

/// Rendezvous for callers that arrived while a build was in flight.
struct BuildGate {
    state: Mutex<GateState>,
    ready: Condvar,
}

impl BuildGate {
    fn new() -> Self {
        Self {
            state: Mutex::new(GateState::Pending),
            ready: Condvar::new(),
        }
    }

    fn complete(&self, outcome: GateOutcome) {
        // A poisoned gate mutex means a waiter panicked while holding it;
        // recover the guard so the remaining waiters still get the result.
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        *state = GateState::Done(outcome);
        self.ready.notify_all();
    }

    fn wait(&self) -> Result<GateOutcome> {
        let mut state = self.state.lock().map_err(lock_error)?;
        loop {
            match &*state {
                GateState::Done(outcome) => return Ok(outcome.clone()),
                GateState::Pending => {
                    state = self.ready.wait(state).map_err(lock_error)?;
                }
            }
        }
    }
}

enum Slot {
    /// A build for this key is in flight.
    Building(Arc<BuildGate>),
    /// Terminal until eviction.
    Ready(Arc<LoadingUnit>),
}

enum Claim {
    Hit(Arc<LoadingUnit>),
    Wait(Arc<BuildGate>),
    Won(Arc<BuildGate>),
}

/// Cache of loading units keyed by scope.
///
/// Holds only run ids, never workflow graphs, so it cannot keep a run
/// alive. Workflow entries are evicted once the run registry no longer
/// knows the owning run; the [`ScopeKey::System`] entry is never evicted.
pub struct ScopeCache {
    entries: RwLock<FxHashMap<ScopeKey, Slot>>,
    registry: Arc<dyn RunRegistry>,
}

impl ScopeCache {
    /// Create an empty cache whose liveness signal is `registry`.
    pub fn new(registry: Arc<dyn RunRegistry>) -> Self {
        Self {
            entries: RwLock::new(FxHashMap::default()),
            registry,
        }
    }

    /// Return the loading unit for `key`, building it if absent.
    ///
    /// At most one caller runs `build` per key; concurrent callers block
    /// until that build completes and observe the identical unit. If the
    /// build fails, the error reaches the winner as-is, every parked
    /// waiter as [`Error::ScopeBuild`], and the key returns to absent so
    /// a later call may retry.
    ///
    /// A hit on a workflow key whose run has since died is dropped and
    /// rebuilt rather than served stale.
    pub fn get_or_create<F>(&self, key: &ScopeKey, build: F) -> Result<Arc<LoadingUnit>>
    where
        F: FnOnce() -> Result<LoadingUnit>,
    {
        match self.claim(key)? {
            Claim::Hit(unit) => {
                tracing::debug!(%key, "scope cache hit");
                Ok(unit)
            }
            Claim::Wait(gate) => match gate.wait()? {
                Ok(unit) => Ok(unit),
                Err(message) => Err(Error::ScopeBuild {
                    key: key.to_string(),
                    message,
                }),
            },
            Claim::Won(gate) => self.run_build(key, gate, build),
        }
    }

    /// Evict every workflow entry whose owning run is no longer alive.
    ///
    /// Intended for periodic housekeeping; in-flight builds and the
    /// system entry are left alone. Returns the number of evictions.
    pub fn reap(&self) -> Result<usize> {
        let mut entries = self.entries.write().map_err(lock_error)?;
        let before = entries.len();
        entries.retain(|key, slot| match (key, slot) {
            (ScopeKey::Workflow(run_id), Slot::Ready(_)) => {
                let alive = self.registry.is_alive(run_id);
                if !alive {
                    tracing::info!(run_id = %run_id, "evicting loading unit of finished run");
                }
                alive
            }
            _ => true,
        });
        Ok(before - entries.len())
    }

    /// Number of cached or in-flight entries.
    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .len()
    }

    /// Whether the cache holds no entries.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Fast path under the read lock; falls back to claiming the key
    /// under the write lock when absent.
    fn claim(&self, key: &ScopeKey) -> Result<Claim> {
        let stale = {
            let entries = self.entries.read().map_err(lock_error)?;
            match entries.get(key) {
                Some(Slot::Ready(unit)) => {
                    if self.key_alive(key) {
                        return Ok(Claim::Hit(unit.clone()));
                    }
                    true
                }
                Some(Slot::Building(gate)) => return Ok(Claim::Wait(gate.clone())),
                None => false,
            }
        };

        let mut entries = self.entries.write().map_err(lock_error)?;
        if stale {
            // Re-check under the write lock: another caller may already
            // have evicted and rebuilt the entry.
            if let Some(Slot::Ready(_)) = entries.get(key) {
                if !self.key_alive(key) {
                    tracing::info!(%key, "evicting stale loading unit of finished run");
                    entries.remove(key);
                }
            }
        }
        match entries.get(key) {
            Some(Slot::Ready(unit)) => Ok(Claim::Hit(unit.clone())),
            Some(Slot::Building(gate)) => Ok(Claim::Wait(gate.clone())),
            None => {
                let gate = Arc::new(BuildGate::new());
                entries.insert(key.clone(), Slot::Building(gate.clone()));
                Ok(Claim::Won(gate))
            }
        }
    }

    fn key_alive(&self, key: &ScopeKey) -> bool {
        match key {
            ScopeKey::Workflow(run_id) => self.registry.is_alive(run_id),
            ScopeKey::System => true,
        }
    }

    /// Run the build as the winning claimant, publish the result, and
    /// release the parked waiters. No cache lock is held while building.
    fn run_build<F>(&self, key: &ScopeKey, gate: Arc<BuildGate>, build: F) -> Result<Arc<LoadingUnit>>
    where
        F: FnOnce() -> Result<LoadingUnit>,
    {
        match build() {
            Ok(unit) => {
                let unit = Arc::new(unit);
                tracing::info!(%key, locations = unit.locations().len(), "built loading unit");
                {
                    let mut entries = self.entries.write().map_err(lock_error)?;
                    entries.insert(key.clone(), Slot::Ready(unit.clone()));
                }
                gate.complete(Ok(unit.clone()));
                Ok(unit)
            }
            Err(err) => {
                tracing::warn!(%key, error = %err, "loading unit build failed");
                {
                    let mut entries = self.entries.write().map_err(lock_error)?;
                    entries.remove(key);
                }
                gate.complete(Err(err.to_string()));
                Err(err)
            }
        }
    }
}
