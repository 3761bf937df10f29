//! The four principal handlers and the orchestrator that sequences them.
//!
//! Handlers only exchange the message schemas from `domain::messages`; the
//! orchestrator reaches them through the traits in `domain::ports`.

pub mod credentials;
pub mod merchant;
pub mod orchestrator;
pub mod processor;
pub mod receipt;
