use crate::config::Config;
use crate::domain::address::AddressPolicy;
use crate::domain::amount::Amount;
use crate::domain::messages::{
    AuthorizationStatus, SettlementRequest, SettlementStatus, SignedSettlement, new_id,
};
use crate::domain::ports::{LedgerHandle, SettlementService};
use crate::domain::principal::Principal;
use crate::domain::signing::{SigningIdentity, verify};
use crate::error::{ProtocolError, Result};
use crate::infrastructure::in_memory::SettlementCache;
use async_trait::async_trait;
use chrono::Utc;
use ed25519_dalek::VerifyingKey;
use serde::Deserialize;
use std::sync::Arc;
use tracing::{info, warn};

/// The authorization fields a settlement depends on.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct AuthorizationClaims {
    auth_id: String,
    intent_id: String,
    status: AuthorizationStatus,
}

struct ProcessorInner {
    identity: SigningIdentity,
    authorizer: VerifyingKey,
    ledger: LedgerHandle,
    cache: SettlementCache,
    address_policy: AddressPolicy,
    protocol_tag: String,
}

/// Settles approved payments through the ledger client and signs the outcome.
///
/// Replays of a `request_id` are answered from the settlement cache and never
/// reach the ledger again. Each settlement runs on its own task, so a caller
/// that goes away mid-transfer cannot leave the cache without a result.
#[derive(Clone)]
pub struct PaymentProcessor {
    inner: Arc<ProcessorInner>,
}

impl PaymentProcessor {
    /// `authorizer` is the credentials holder's key. Only authorizations it
    /// signed are ever settled.
    pub fn new(ledger: LedgerHandle, authorizer: VerifyingKey, config: &Config) -> Self {
        Self::with_identity(
            SigningIdentity::generate(Principal::PaymentProcessor.signer_id()),
            ledger,
            authorizer,
            config,
        )
    }

    pub fn with_identity(
        identity: SigningIdentity,
        ledger: LedgerHandle,
        authorizer: VerifyingKey,
        config: &Config,
    ) -> Self {
        Self {
            inner: Arc::new(ProcessorInner {
                identity,
                authorizer,
                ledger,
                cache: SettlementCache::new(config.cache_capacity, config.cache_max_age()),
                address_policy: config.address_policy,
                protocol_tag: config.protocol_tag.clone(),
            }),
        }
    }

    pub fn verifying_key(&self) -> VerifyingKey {
        self.inner.identity.verifying_key()
    }

    pub fn cache(&self) -> &SettlementCache {
        &self.inner.cache
    }
}

impl ProcessorInner {
    fn check_preconditions(&self, request: &SettlementRequest) -> Result<Amount> {
        let amount = Amount::parse(&request.amount)?;
        self.address_policy.validate(&request.recipient)?;
        self.check_authorization(request)?;
        Ok(amount)
    }

    fn check_authorization(&self, request: &SettlementRequest) -> Result<()> {
        if !verify(
            &self.authorizer,
            Principal::CredentialsHolder.signer_id(),
            &request.authorization_payload,
            &request.authorization_proof,
        ) {
            return Err(ProtocolError::Validation(
                "Authorization proof is not a valid credentials holder signature".to_string(),
            ));
        }

        let claims: AuthorizationClaims = serde_json::from_str(&request.authorization_payload)
            .map_err(|e| ProtocolError::Validation(format!("Malformed authorization: {}", e)))?;
        if claims.auth_id != request.authorization_id || claims.intent_id != request.intent_id {
            return Err(ProtocolError::Validation(format!(
                "Authorization proof is for {} on intent {}",
                claims.auth_id, claims.intent_id
            )));
        }
        if claims.status != AuthorizationStatus::Approved {
            return Err(ProtocolError::Validation(format!(
                "Authorization {} was not approved",
                claims.auth_id
            )));
        }
        Ok(())
    }

    async fn execute(&self, request: &SettlementRequest) -> Result<SignedSettlement> {
        let outcome = match self.check_preconditions(request) {
            Ok(amount) => self.ledger.transfer(&request.recipient, amount).await,
            Err(e) => Err(e),
        };

        match outcome {
            Ok(tx_ref) => {
                info!(request_id = %request.request_id, tx_ref = %tx_ref, "Settlement succeeded");
                self.sign(request, SettlementStatus::Success, Some(tx_ref), None)
            }
            Err(e) => {
                let message = failure_message(e);
                warn!(request_id = %request.request_id, error = %message, "Settlement failed");
                self.sign(request, SettlementStatus::Failed, None, Some(message))
            }
        }
    }

    fn sign(
        &self,
        request: &SettlementRequest,
        status: SettlementStatus,
        tx_ref: Option<String>,
        error: Option<String>,
    ) -> Result<SignedSettlement> {
        let mut settlement = SignedSettlement {
            id: new_id("settle"),
            request_id: request.request_id.clone(),
            intent_id: request.intent_id.clone(),
            authorization_id: request.authorization_id.clone(),
            created_at: Utc::now(),
            status,
            tx_ref,
            error,
            amount: request.amount.clone(),
            recipient: request.recipient.clone(),
            signer: Principal::PaymentProcessor,
            signature: String::new(),
            protocol_tag: self.protocol_tag.clone(),
        };
        settlement.signature = self.identity.sign(&settlement.attested_payload()?);
        Ok(settlement)
    }
}

fn failure_message(error: ProtocolError) -> String {
    match error {
        ProtocolError::Validation(message) | ProtocolError::Execution(message) => message,
        other => other.to_string(),
    }
}

#[async_trait]
impl SettlementService for PaymentProcessor {
    async fn settle(&self, request: SettlementRequest) -> Result<SignedSettlement> {
        let slot = self.inner.cache.slot(&request.request_id).await;
        if let Some(prior) = slot.get() {
            if prior.amount != request.amount || prior.recipient != request.recipient {
                warn!(
                    request_id = %request.request_id,
                    "Replayed settlement request differs from the original; returning original outcome"
                );
            }
            info!(request_id = %request.request_id, "Returning cached settlement");
            return Ok(prior.clone());
        }

        let inner = Arc::clone(&self.inner);
        let task = tokio::spawn(async move {
            let settlement = slot.get_or_try_init(|| inner.execute(&request)).await?;
            Ok::<_, ProtocolError>(settlement.clone())
        });
        task.await
            .map_err(|e| ProtocolError::Execution(format!("Settlement task failed: {}", e)))?
    }
}
