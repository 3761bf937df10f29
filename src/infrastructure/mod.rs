//! In-memory adapters for the ports in `domain::ports`.

pub mod in_memory;
