//! Data store gateway for camps, talks and speakers.
//!
//! `CampRepository` is the only way the HTTP layer touches storage. Two
//! backends exist: an in-memory one for dev/tests and a Postgres one.

pub mod in_memory;
pub mod postgres;
pub mod seed;
pub mod r#trait;

pub use in_memory::InMemoryCampRepository;
pub use postgres::PostgresCampRepository;
pub use r#trait::{CampRepository, StoreError, StoreResult};
