//! Batch I/O used by the command-line driver.

pub mod csv;
