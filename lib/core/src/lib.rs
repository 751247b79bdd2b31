//! Core identifiers and error handling shared across the authgate crates.
//!
//! This crate provides the foundational types used by the gate and its
//! collaborators: provider and account identifiers, and the `Result` alias
//! built on rootcause.

pub mod error;
pub mod id;

pub use error::Result;
pub use id::{AccountId, ProviderId};
