//! Durable breed store backed by a single SQLite file.

pub mod error;
pub mod store;

pub use error::StoreError;
pub use store::DogStore;
