//! Wire and data types for the Keeper dashboard.
//!
//! # Core Concepts
//!
//! - [`VaultInfo`] / [`VaultContent`]: a seed vault, one YAML file per domain
//!   (frontend, backend, auth, ...). Identity is the file name minus extension.
//! - [`DecisionInfo`] / [`DecisionContent`]: one architectural decision per
//!   YAML file. File names sort by recency, so listings are descending.
//! - [`ChangeEvent`]: a best-effort invalidation hint pushed to live clients.
//!   Consumers re-fetch the resource instead of trusting the event.
//! - [`StreamFrame`]: the JSON body of one push-stream frame.

mod decision;
mod event;
mod health;
mod vault;

pub use decision::*;
pub use event::*;
pub use health::*;
pub use vault::*;
