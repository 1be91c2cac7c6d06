//! Export job status storage.

mod memory_store;

pub use memory_store::InMemoryJobStore;
