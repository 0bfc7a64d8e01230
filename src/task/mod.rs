//! Task records and user-initiated task control.
//!
//! A task moves `PENDING → PROCESSING → {COMPLETED, ERROR, CANCELLED}` and
//! is written through atomic [`domain::TaskChanges`] values so that a user
//! stop and a runner write cannot interleave. The context follows the
//! hexagonal layout used throughout the crate:
//!
//! - Domain types in [`domain`]
//! - Port contracts in [`ports`]
//! - In-memory adapters in [`adapters`]
//! - The request-side [`services::TaskControlService`] in [`services`]

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod services;

#[cfg(test)]
mod tests;
