//! # TowerKit Core
//!
//! Core types and traits shared by the TowerKit crates.
//! Provides the error taxonomy used across settings validation and tower
//! rewriting, and the observer interface through which a front end receives
//! status text, progress and control-state notifications.

pub mod error;
pub mod observer;

pub use error::{ConfigurationError, Error, IoError, Result};
pub use observer::{NoOpObserver, ProgressObserver, ProgressObserverHandle};
