//! Triple-store backend for the Kith contact store.
//!
//! Contacts are read with one SPARQL query per contact type. Each query is
//! assembled from the type's [`schema::Schema`]: every detail becomes one or
//! more projected columns, and multi-valued data is packed into single cells
//! with the control-character separators in [`packing`]. The result rows are
//! decoded back into [`kith_core::contact::Contact`] records, post-processed,
//! and merged into one sorted list.
//!
//! The query service and the id resolver are collaborators supplied by the
//! caller; see [`service`].

#![allow(async_fn_in_trait)]

pub mod cache;
pub mod config;
mod decode;
pub mod error;
pub mod fetch;
pub mod packing;
mod phone;
pub mod query;
pub mod schema;
pub mod service;
pub mod sparql;
pub mod store;
pub mod synth;
mod translate;
pub mod vocab;

pub use error::{Error, ErrorKind, Result};
pub use store::RdfStore;

#[cfg(test)]
mod tests;
