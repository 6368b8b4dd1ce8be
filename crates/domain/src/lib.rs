//! social-daemon domain crate
//!
//! This crate contains the core posting logic following hexagonal architecture:
//! - `model`: Platforms, messages, per-send results and cycle outcomes
//! - `ports`: Trait definitions for senders, content, halt signal and jitter
//! - `policy`: Interval selection and per-platform truncation
//! - `mood`: Optional circadian/emotion interval jitter
//! - `usecases`: The posting cycle and the scheduler loop

pub mod model;
pub mod mood;
pub mod policy;
pub mod ports;
pub mod usecases;

pub use model::*;
pub use ports::*;
