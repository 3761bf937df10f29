//! Message contracts exchanged between the four principals.
//!
//! Every request carries a fresh `request_id`; every signed response echoes
//! it. Amounts travel as decimal strings and are validated by the principal
//! that acts on them.

use crate::domain::principal::Principal;
use crate::domain::signing::canonical_payload;
use crate::error::Result;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Generates an opaque id scoped to an entity kind, e.g. `cart_9f1c…`.
pub fn new_id(prefix: &str) -> String {
    format!("{}_{}", prefix, Uuid::new_v4().simple())
}

/// Timestamp rendering used inside signed payloads.
fn attested_time(at: &DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// What the user asked to pay for.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentIntent {
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub prompt: String,
    pub summary: String,
    pub amount: String,
    pub recipient: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memo: Option<String>,
    pub created_by: Principal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartRequest {
    pub request_id: String,
    pub from: Principal,
    pub intent_id: String,
    pub summary: String,
    pub amount: String,
    pub recipient: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartItem {
    pub id: String,
    pub name: String,
    pub quantity: u32,
    pub unit_amount: String,
    pub total: String,
}

/// The merchant's priced commitment, valid until `expires_at`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignedCart {
    pub id: String,
    pub request_id: String,
    pub merchant_id: String,
    pub merchant_name: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub items: Vec<CartItem>,
    pub total: String,
    pub signer: Principal,
    pub signature: String,
    pub signed_payload: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CartPayload<'a> {
    cart_id: &'a str,
    request_id: &'a str,
    merchant_id: &'a str,
    total: &'a str,
    expires_at: String,
}

impl SignedCart {
    /// Canonical payload over `{cartId, requestId, merchantId, total, expiresAt}`.
    pub fn attested_payload(&self) -> Result<String> {
        cart_payload(
            &self.id,
            &self.request_id,
            &self.merchant_id,
            &self.total,
            &self.expires_at,
        )
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

pub(crate) fn cart_payload(
    cart_id: &str,
    request_id: &str,
    merchant_id: &str,
    total: &str,
    expires_at: &DateTime<Utc>,
) -> Result<String> {
    canonical_payload(&CartPayload {
        cart_id,
        request_id,
        merchant_id,
        total,
        expires_at: attested_time(expires_at),
    })
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApprovalRequest {
    pub request_id: String,
    pub from: Principal,
    pub intent_id: String,
    pub cart_id: String,
    pub total: String,
    pub recipient: String,
    pub timestamp: DateTime<Utc>,
}

/// The user's answer to an approval request, collected outside the core.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum ApprovalDecision {
    Approved,
    Rejected { reason: String },
}

impl ApprovalDecision {
    pub fn rejected(reason: impl Into<String>) -> Self {
        ApprovalDecision::Rejected {
            reason: reason.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthorizationStatus {
    Approved,
    Rejected,
}

impl AuthorizationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuthorizationStatus::Approved => "approved",
            AuthorizationStatus::Rejected => "rejected",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignedAuthorization {
    pub id: String,
    pub request_id: String,
    pub intent_id: String,
    pub created_at: DateTime<Utc>,
    pub authorized_by: String,
    pub status: AuthorizationStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    pub signer: Principal,
    pub signature: String,
    pub signed_payload: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct AuthorizationPayload<'a> {
    auth_id: &'a str,
    request_id: &'a str,
    intent_id: &'a str,
    status: AuthorizationStatus,
    timestamp: String,
}

impl SignedAuthorization {
    /// Canonical payload over `{authId, requestId, intentId, status, timestamp}`.
    pub fn attested_payload(&self) -> Result<String> {
        authorization_payload(
            &self.id,
            &self.request_id,
            &self.intent_id,
            self.status,
            &self.created_at,
        )
    }

    pub fn is_approved(&self) -> bool {
        self.status == AuthorizationStatus::Approved
    }
}

pub(crate) fn authorization_payload(
    auth_id: &str,
    request_id: &str,
    intent_id: &str,
    status: AuthorizationStatus,
    at: &DateTime<Utc>,
) -> Result<String> {
    canonical_payload(&AuthorizationPayload {
        auth_id,
        request_id,
        intent_id,
        status,
        timestamp: attested_time(at),
    })
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettlementRequest {
    pub request_id: String,
    pub from: Principal,
    pub intent_id: String,
    pub authorization_id: String,
    pub amount: String,
    pub recipient: String,
    /// The attested payload of the referenced authorization.
    pub authorization_payload: String,
    /// The credentials holder's signature over `authorization_payload`.
    pub authorization_proof: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SettlementStatus {
    Success,
    Failed,
}

impl SettlementStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SettlementStatus::Success => "success",
            SettlementStatus::Failed => "failed",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignedSettlement {
    pub id: String,
    pub request_id: String,
    pub intent_id: String,
    pub authorization_id: String,
    pub created_at: DateTime<Utc>,
    pub status: SettlementStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tx_ref: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub amount: String,
    pub recipient: String,
    pub signer: Principal,
    pub signature: String,
    pub protocol_tag: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SettlementPayload<'a> {
    settlement_id: &'a str,
    request_id: &'a str,
    intent_id: &'a str,
    status: SettlementStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    tx_ref: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<&'a str>,
    timestamp: String,
}

impl SignedSettlement {
    /// Canonical payload over `{settlementId, requestId, intentId, status, txRef|error, timestamp}`.
    pub fn attested_payload(&self) -> Result<String> {
        canonical_payload(&SettlementPayload {
            settlement_id: &self.id,
            request_id: &self.request_id,
            intent_id: &self.intent_id,
            status: self.status,
            tx_ref: self.tx_ref.as_deref(),
            error: self.error.as_deref(),
            timestamp: attested_time(&self.created_at),
        })
    }

    pub fn is_success(&self) -> bool {
        self.status == SettlementStatus::Success
    }
}

/// The audit-closing bundle of one flow instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Receipt {
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub intent: PaymentIntent,
    pub authorization: SignedAuthorization,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub settlement: Option<SignedSettlement>,
    pub human_summary: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_new_id_is_prefixed_and_unique() {
        let a = new_id("cart");
        let b = new_id("cart");
        assert!(a.starts_with("cart_"));
        assert_ne!(a, b);
    }

    #[test]
    fn test_cart_payload_shape() {
        let expires = Utc.with_ymd_and_hms(2025, 1, 1, 12, 0, 0).unwrap();
        let payload = cart_payload("cart_1", "req_1", "merchant-demo", "0.001", &expires).unwrap();
        assert_eq!(
            payload,
            r#"{"cartId":"cart_1","requestId":"req_1","merchantId":"merchant-demo","total":"0.001","expiresAt":"2025-01-01T12:00:00.000Z"}"#
        );
    }

    #[test]
    fn test_settlement_payload_omits_absent_fields() {
        let settlement = SignedSettlement {
            id: "settle_1".into(),
            request_id: "req_3".into(),
            intent_id: "intent_1".into(),
            authorization_id: "auth_1".into(),
            created_at: Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap(),
            status: SettlementStatus::Failed,
            tx_ref: None,
            error: Some("insufficient funds".into()),
            amount: "0.001".into(),
            recipient: "addr1".into(),
            signer: Principal::PaymentProcessor,
            signature: String::new(),
            protocol_tag: "x402".into(),
        };
        let payload = settlement.attested_payload().unwrap();
        assert!(payload.contains(r#""status":"failed""#));
        assert!(payload.contains(r#""error":"insufficient funds""#));
        assert!(!payload.contains("txRef"));
    }

    #[test]
    fn test_decision_serialization() {
        let json = serde_json::to_string(&ApprovalDecision::rejected("user declined")).unwrap();
        assert_eq!(json, r#"{"status":"rejected","reason":"user declined"}"#);
        let approved: ApprovalDecision = serde_json::from_str(r#"{"status":"approved"}"#).unwrap();
        assert_eq!(approved, ApprovalDecision::Approved);
    }
}
