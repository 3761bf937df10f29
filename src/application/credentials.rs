use crate::domain::amount::Amount;
use crate::domain::messages::{
    ApprovalDecision, ApprovalRequest, AuthorizationStatus, SignedAuthorization,
    authorization_payload, new_id,
};
use crate::domain::ports::CredentialsService;
use crate::domain::principal::Principal;
use crate::domain::signing::SigningIdentity;
use crate::error::{ProtocolError, Result};
use async_trait::async_trait;
use chrono::Utc;
use ed25519_dalek::VerifyingKey;
use tracing::info;

const DEFAULT_REJECTION_REASON: &str = "Rejected by user";

/// Holds the user's payment credentials and signs approval decisions.
///
/// Sees only the cart id and total carried in the approval request.
pub struct CredentialsHandler {
    identity: SigningIdentity,
}

impl CredentialsHandler {
    pub fn new() -> Self {
        Self::with_identity(SigningIdentity::generate(
            Principal::CredentialsHolder.signer_id(),
        ))
    }

    pub fn with_identity(identity: SigningIdentity) -> Self {
        Self { identity }
    }

    pub fn verifying_key(&self) -> VerifyingKey {
        self.identity.verifying_key()
    }

    /// Signs `decision` for `request`. A rejection always carries a reason.
    pub fn sign_decision(
        &self,
        request: &ApprovalRequest,
        decision: ApprovalDecision,
    ) -> Result<SignedAuthorization> {
        Amount::parse(&request.total)?;
        if request.recipient.trim().is_empty() {
            return Err(ProtocolError::Validation(
                "Approval request has no recipient".to_string(),
            ));
        }

        let (status, reason) = match decision {
            ApprovalDecision::Approved => (AuthorizationStatus::Approved, None),
            ApprovalDecision::Rejected { reason } => {
                let reason = if reason.trim().is_empty() {
                    DEFAULT_REJECTION_REASON.to_string()
                } else {
                    reason
                };
                (AuthorizationStatus::Rejected, Some(reason))
            }
        };

        let id = new_id("auth");
        let created_at = Utc::now();
        let signed_payload = authorization_payload(
            &id,
            &request.request_id,
            &request.intent_id,
            status,
            &created_at,
        )?;
        let signature = self.identity.sign(&signed_payload);

        info!(
            auth_id = %id,
            request_id = %request.request_id,
            cart_id = %request.cart_id,
            status = status.as_str(),
            "Signed authorization"
        );
        Ok(SignedAuthorization {
            id,
            request_id: request.request_id.clone(),
            intent_id: request.intent_id.clone(),
            created_at,
            authorized_by: "user".to_string(),
            status,
            reason,
            signer: Principal::CredentialsHolder,
            signature,
            signed_payload,
        })
    }
}

impl Default for CredentialsHandler {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CredentialsService for CredentialsHandler {
    async fn decide_approval(
        &self,
        request: ApprovalRequest,
        decision: ApprovalDecision,
    ) -> Result<SignedAuthorization> {
        self.sign_decision(&request, decision)
    }
}
