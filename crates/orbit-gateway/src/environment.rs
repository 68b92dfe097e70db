//! Game environment seam.
//!
//! The gateway never owns game state. It asks an [`Environment`] whether a
//! game is loading or running and, when one is, attaches a per-session engine
//! handle for a participant. [`SharedEnvironment`] is the switchable holder
//! the binary and the tests use.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use orbit_core::{Gameplay, RpcError, RpcResult};

/// Per-session engine handle.
pub type GameHandle = Box<dyn Gameplay + Send>;

/// Builds an engine handle for one participant.
pub type GameFactory = Arc<dyn Fn(&str) -> RpcResult<GameHandle> + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnvironmentStatus {
    /// Resources are still loading; nothing can be attached yet.
    Loading,
    /// Loaded, no game instance.
    Idle,
    Running,
}

pub trait Environment: Send + Sync {
    fn status(&self) -> EnvironmentStatus;

    /// Changes whenever the game instance changes. Handles attached under an
    /// older generation belong to a game that is gone.
    fn generation(&self) -> u64;

    /// Attach `participant` to the running game. Fails NO_GAME_RUNNING when
    /// there is none and NO_GAME_AVAILABLE when it has no seat for them.
    fn attach(&self, participant: &str) -> RpcResult<GameHandle>;
}

enum State {
    Loading,
    Idle,
    Running(GameFactory),
}

/// Environment whose state can be switched at runtime.
pub struct SharedEnvironment {
    state: RwLock<State>,
    generation: AtomicU64,
}

impl Default for SharedEnvironment {
    fn default() -> Self {
        Self::loading()
    }
}

impl SharedEnvironment {
    pub fn loading() -> Self {
        Self::with_state(State::Loading)
    }

    pub fn idle() -> Self {
        Self::with_state(State::Idle)
    }

    pub fn running(factory: GameFactory) -> Self {
        Self::with_state(State::Running(factory))
    }

    fn with_state(state: State) -> Self {
        Self {
            state: RwLock::new(state),
            generation: AtomicU64::new(0),
        }
    }

    pub fn set_loading(&self) {
        self.replace(State::Loading);
    }

    /// Loading finished, or the running game ended.
    pub fn stop(&self) {
        let generation = self.replace(State::Idle);
        tracing::info!(generation, "game stopped");
    }

    pub fn start(&self, factory: GameFactory) {
        let generation = self.replace(State::Running(factory));
        tracing::info!(generation, "game started");
    }

    /// Generation is bumped and read under the state lock.
    fn replace(&self, state: State) -> u64 {
        let mut guard = self.write();
        *guard = state;
        self.generation.fetch_add(1, Ordering::SeqCst) + 1
    }

    // Poison is ignored: every write is a single whole-value assignment.
    fn read(&self) -> RwLockReadGuard<'_, State> {
        self.state.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, State> {
        self.state.write().unwrap_or_else(|e| e.into_inner())
    }
}

impl Environment for SharedEnvironment {
    fn status(&self) -> EnvironmentStatus {
        match &*self.read() {
            State::Loading => EnvironmentStatus::Loading,
            State::Idle => EnvironmentStatus::Idle,
            State::Running(_) => EnvironmentStatus::Running,
        }
    }

    fn generation(&self) -> u64 {
        let _state = self.read();
        self.generation.load(Ordering::SeqCst)
    }

    fn attach(&self, participant: &str) -> RpcResult<GameHandle> {
        let factory = match &*self.read() {
            State::Loading => return Err(RpcError::not_ready()),
            State::Idle => return Err(RpcError::no_game_running()),
            State::Running(factory) => Arc::clone(factory),
        };
        // Factory runs outside the lock.
        factory(participant)
    }
}
