//! Bellhop coordinator service.
//!
//! Receives container lifecycle events and provisions per-application Vault
//! credentials through a two-token cubbyhole hand-off: a carrier token scoped
//! to one application's cubbyhole path is delivered over HTTP, and the actual
//! working credential sits behind it in the cubbyhole.

pub mod api;
pub mod backend;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod events;
pub mod rendezvous;
pub mod server;
pub mod shutdown;

pub use backend::Backend;
pub use config::Config;
pub use coordinator::SecretCoordinator;
pub use error::CoordinatorError;
pub use events::{StatusEvent, TaskStatus};
pub use rendezvous::{Delivery, RendezvousRegistry};
