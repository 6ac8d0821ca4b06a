//! Storage adapters implementing the repository port.
//!
//! Only an in-memory store exists; it stands in for a database and loses its
//! contents on restart.

pub mod memory_repo;
