//! Formkit form store
//!
//! Saved forms live as one JSON array under a single storage key. Only the
//! schema is persisted; entered values never are.

pub mod error;
pub mod kv;
pub mod repository;

pub use error::{StoreError, StoreResult};
pub use kv::{FileStore, KeyValueStore, MemoryStore};
pub use repository::FormRepository;
