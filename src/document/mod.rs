//! Hydrated documents
//!
//! A `Document` wraps a raw record with the provenance the population engine
//! relies on: whether the instance was produced from a cache hit, whether it
//! was itself the product of a population query, which paths were modified
//! since hydration, and which paths were populated with which ids.
//!
//! Lean results stay plain `serde_json::Value`s and carry none of this.

mod instance;
pub mod path;

pub use instance::{Document, PopulatedEntry};
