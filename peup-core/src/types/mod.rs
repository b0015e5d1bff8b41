//! Domain types for PEUP.
//!
//! - [`Manifest`]: Resolvable description of a service (endpoint + cache policy)
//! - [`Intent`]: Structured request naming an action, a scope and parameters
//! - [`Deadline`]: Absolute time budget handed to every collaborator call
//! - [`Resolution`]: A resolved manifest together with where it came from

mod manifest;
mod intent;
mod deadline;
mod resolution;

pub use manifest::*;
pub use intent::*;
pub use deadline::*;
pub use resolution::*;
