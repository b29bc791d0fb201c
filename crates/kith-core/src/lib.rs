//! Contact model shared by the Kith storage backends.
//!
//! Filters, sort orders and fetch hints describe a request; backends such as
//! `kith-store-rdf` answer it with [`contact::Contact`] records through the
//! [`store::ContactReader`] trait. No query language or storage code lives
//! here.

// Trait futures carry explicit `Send` bounds.
#![allow(async_fn_in_trait)]

pub mod contact;
pub mod detail;
pub mod error;
pub mod filter;
pub mod hint;
pub mod sort;
pub mod store;

pub use error::{Error, Result};
