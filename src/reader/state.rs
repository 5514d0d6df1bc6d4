//! Reader lifecycle state and refresh health.
//!
//! # States
//! ```text
//! Uninitialized → Loading → Ready → Disposed
//!                    └───────────────↗
//! ```
//! Ready is entered when the first load completes, whether it succeeded or
//! not. Disposed is terminal.

use arc_swap::ArcSwapOption;
use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::Arc;

#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReaderState {
    Uninitialized = 0,
    Loading = 1,
    Ready = 2,
    Disposed = 3,
}

impl From<u8> for ReaderState {
    fn from(val: u8) -> Self {
        match val {
            1 => ReaderState::Loading,
            2 => ReaderState::Ready,
            3 => ReaderState::Disposed,
            _ => ReaderState::Uninitialized,
        }
    }
}

/// Atomic holder of a [`ReaderState`].
#[derive(Debug)]
pub(crate) struct StateCell(AtomicU8);

impl StateCell {
    pub(crate) fn new() -> Self {
        Self(AtomicU8::new(ReaderState::Uninitialized as u8))
    }

    pub(crate) fn get(&self) -> ReaderState {
        ReaderState::from(self.0.load(Ordering::SeqCst))
    }

    fn transition(&self, from: ReaderState, to: ReaderState) -> bool {
        self.0
            .compare_exchange(from as u8, to as u8, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
    }

    pub(crate) fn begin_loading(&self) -> bool {
        self.transition(ReaderState::Uninitialized, ReaderState::Loading)
    }

    pub(crate) fn mark_ready(&self) -> bool {
        self.transition(ReaderState::Loading, ReaderState::Ready)
    }

    /// Move to Disposed. Returns `false` if already disposed.
    pub(crate) fn dispose(&self) -> bool {
        self.0.swap(ReaderState::Disposed as u8, Ordering::SeqCst) != ReaderState::Disposed as u8
    }
}

/// Outcome of the most recent reload.
#[derive(Debug, Default)]
pub(crate) struct RefreshStatus {
    healthy: AtomicBool,
    last_success: ArcSwapOption<DateTime<Utc>>,
}

impl RefreshStatus {
    pub(crate) fn mark_success(&self, at: DateTime<Utc>) {
        self.last_success.store(Some(Arc::new(at)));
        self.healthy.store(true, Ordering::SeqCst);
    }

    pub(crate) fn mark_failure(&self) {
        self.healthy.store(false, Ordering::SeqCst);
    }

    pub(crate) fn last_refresh_succeeded(&self) -> bool {
        self.healthy.load(Ordering::SeqCst)
    }

    pub(crate) fn last_success(&self) -> Option<DateTime<Utc>> {
        self.last_success.load_full().map(|at| *at)
    }
}
