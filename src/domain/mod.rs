//! Value objects, message schemas and the ports every principal is reached through.

pub mod address;
pub mod amount;
pub mod flow;
pub mod messages;
pub mod ports;
pub mod principal;
pub mod signing;
