//! Capability boundaries the core calls through.
//!
//! Each principal sits behind one of these traits, so a handler can run
//! in-process or behind an RPC client without the orchestrator noticing.
//! Only the message schemas cross a boundary.

use super::amount::Amount;
use super::messages::{
    ApprovalDecision, ApprovalRequest, CartRequest, SettlementRequest, SignedAuthorization,
    SignedCart, SignedSettlement,
};
use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[async_trait]
pub trait MerchantService: Send + Sync {
    /// Turns a cart request into a priced, signed cart. Single round trip.
    async fn create_cart(&self, request: CartRequest) -> Result<SignedCart>;
}

#[async_trait]
pub trait CredentialsService: Send + Sync {
    /// Signs the user's decision on an approval request. Always answers.
    async fn decide_approval(
        &self,
        request: ApprovalRequest,
        decision: ApprovalDecision,
    ) -> Result<SignedAuthorization>;
}

#[async_trait]
pub trait SettlementService: Send + Sync {
    /// Settles an approved payment. Ledger failures come back as a signed
    /// `failed` settlement; `Err` is reserved for transport faults.
    async fn settle(&self, request: SettlementRequest) -> Result<SignedSettlement>;
}

/// The external capability that actually moves value.
#[async_trait]
pub trait LedgerClient: Send + Sync {
    /// Transfers `amount` to `recipient` and returns the ledger's reference.
    async fn transfer(&self, recipient: &str, amount: Amount) -> Result<String>;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogEntry {
    pub sku: String,
    pub name: String,
    pub unit_price: Amount,
}

/// Optional order matching for the merchant.
pub trait Catalog: Send + Sync {
    fn find_match(&self, summary: &str, amount: Amount) -> Option<CatalogEntry>;
}

pub type MerchantHandle = Arc<dyn MerchantService>;
pub type CredentialsHandle = Arc<dyn CredentialsService>;
pub type SettlementHandle = Arc<dyn SettlementService>;
pub type LedgerHandle = Arc<dyn LedgerClient>;
pub type CatalogHandle = Arc<dyn Catalog>;
