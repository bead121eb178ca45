//! Capture/restore engine and orchestration for Windowsill.
//!
//! `capture` and `restore` are pure functions over a [`desk_engine::WindowSystem`];
//! the [`Coordinator`] wires them to the snapshot store and retention
//! indexes behind a single-in-flight [`OperationGuard`].

pub mod capture;
pub mod coordinator;
pub mod guard;
pub mod restore;

pub use capture::capture;
pub use coordinator::{Coordinator, CoordinatorError};
pub use guard::{OperationGuard, OperationPermit};
pub use restore::{restore, RestoreOutcome};
