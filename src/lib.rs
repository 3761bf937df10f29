//! Protocol core for four-party payment authorization.
//!
//! An orchestrator obtains a signed cart from a merchant, a signed approval
//! from the credentials holder and a signed settlement from the payment
//! processor, then closes the flow with an auditable receipt.

pub mod application;
pub mod config;
pub mod domain;
pub mod error;
pub mod infrastructure;
pub mod interfaces;
