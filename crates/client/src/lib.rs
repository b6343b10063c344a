//! Client side of shellcache.
//!
//! This crate provides the network fetcher, the request router that executes
//! cache strategies, worker lifecycle and the registration that ties workers,
//! control messages and push notifications together. The gateway binary is a
//! thin HTTP layer over [`Registration`].

pub mod fetch;
pub mod lifecycle;
pub mod notify;
pub mod registration;
pub mod router;
pub mod worker;

#[cfg(test)]
mod testing;

pub use fetch::{FetchClient, FetchConfig, Network};
pub use lifecycle::{ActivateReport, InstallReport};
pub use notify::{NotificationCenter, ShownNotification};
pub use registration::{InstallOutcome, MessageOutcome, Registration, RegistrationConfig, RegistrationStatus};
pub use router::{Outcome, Router, Source, offline_response};
pub use worker::{Worker, WorkerStatus};
