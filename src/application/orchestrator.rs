use crate::application::credentials::CredentialsHandler;
use crate::application::merchant::MerchantHandler;
use crate::application::processor::PaymentProcessor;
use crate::application::receipt;
use crate::config::Config;
use crate::domain::amount::Amount;
use crate::domain::flow::{FlowState, FlowStep};
use crate::domain::messages::{
    ApprovalDecision, ApprovalRequest, CartRequest, PaymentIntent, Receipt, SettlementRequest,
    SignedAuthorization, SignedCart, SignedSettlement, new_id,
};
use crate::domain::ports::{
    CatalogHandle, CredentialsHandle, LedgerHandle, MerchantHandle, SettlementHandle,
};
use crate::domain::principal::Principal;
use crate::domain::signing::KeyDirectory;
use crate::error::{ProtocolError, Result};
use chrono::Utc;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

const SUMMARY_LIMIT: usize = 80;

/// User input for a new payment intent.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct IntentInput {
    pub prompt: String,
    /// Defaults to the prompt, shortened to 80 characters.
    pub summary: Option<String>,
    pub amount: String,
    pub recipient: String,
    pub memo: Option<String>,
}

fn settlement_request_id(authorization_id: &str) -> String {
    format!("req_settle_{}", authorization_id)
}

fn summarize(prompt: &str) -> String {
    let trimmed = prompt.trim();
    if trimmed.chars().count() > SUMMARY_LIMIT {
        let head: String = trimmed.chars().take(SUMMARY_LIMIT - 3).collect();
        format!("{}…", head)
    } else {
        trimmed.to_string()
    }
}

/// Drives one flow instance through Intent → Cart → Authorization →
/// Settlement → Receipt.
///
/// Holds no credentials: only handles to the other principals and their
/// public keys. Each transition takes the [`FlowState`] it advances, so one
/// orchestrator can serve many independent flows concurrently.
pub struct Orchestrator {
    merchant: MerchantHandle,
    credentials: CredentialsHandle,
    processor: SettlementHandle,
    keys: KeyDirectory,
    call_timeout: Duration,
}

impl Orchestrator {
    pub fn new(
        merchant: MerchantHandle,
        credentials: CredentialsHandle,
        processor: SettlementHandle,
        keys: KeyDirectory,
        config: &Config,
    ) -> Self {
        Self {
            merchant,
            credentials,
            processor,
            keys,
            call_timeout: config.call_timeout(),
        }
    }

    /// Wires all four principals in one process, each with a fresh key.
    pub fn in_process(
        config: &Config,
        ledger: LedgerHandle,
        catalog: Option<CatalogHandle>,
    ) -> Self {
        let mut merchant = MerchantHandler::new(config);
        if let Some(catalog) = catalog {
            merchant = merchant.with_catalog(catalog);
        }
        let credentials = CredentialsHandler::new();
        let processor = PaymentProcessor::new(ledger, credentials.verifying_key(), config);

        let mut keys = KeyDirectory::new();
        keys.register(Principal::Merchant.signer_id(), merchant.verifying_key());
        keys.register(
            Principal::CredentialsHolder.signer_id(),
            credentials.verifying_key(),
        );
        keys.register(
            Principal::PaymentProcessor.signer_id(),
            processor.verifying_key(),
        );

        Self::new(
            Arc::new(merchant),
            Arc::new(credentials),
            Arc::new(processor),
            keys,
            config,
        )
    }

    /// Runs a principal call on its own task under the call timeout.
    ///
    /// If the caller is dropped, or the timeout fires, the call still
    /// completes in the background and its result is discarded.
    async fn call<T, F>(&self, principal: Principal, call: F) -> Result<T>
    where
        F: Future<Output = Result<T>> + Send + 'static,
        T: Send + 'static,
    {
        debug!(principal = %principal, "Calling principal");
        let task = tokio::spawn(call);
        match tokio::time::timeout(self.call_timeout, task).await {
            Ok(Ok(result)) => result,
            Ok(Err(e)) if e.is_cancelled() => Err(ProtocolError::Cancelled),
            Ok(Err(e)) => Err(ProtocolError::Execution(format!(
                "Call to {} failed: {}",
                principal, e
            ))),
            Err(_) => {
                warn!(
                    principal = %principal,
                    timeout = ?self.call_timeout,
                    "Principal call timed out"
                );
                Err(ProtocolError::Timeout {
                    principal: principal.signer_id(),
                    after: self.call_timeout,
                })
            }
        }
    }

    /// Checks a signed response against the principal we expected it from.
    fn verify_response(
        &self,
        expected: Principal,
        signer: Principal,
        sent_request_id: &str,
        echoed_request_id: &str,
        payload: &str,
        signature: &str,
    ) -> Result<()> {
        let failure = if signer != expected {
            Some(format!("response signed by {} instead of {}", signer, expected))
        } else if echoed_request_id != sent_request_id {
            Some(format!(
                "response answers {} instead of {}",
                echoed_request_id, sent_request_id
            ))
        } else if !self.keys.verify(expected.signer_id(), payload, signature) {
            Some(format!("signature from {} does not verify", expected))
        } else {
            None
        };

        match failure {
            Some(reason) => {
                warn!(
                    principal = %expected,
                    request_id = %sent_request_id,
                    %reason,
                    "Integrity check failed"
                );
                Err(ProtocolError::Integrity(reason))
            }
            None => {
                debug!(principal = %expected, request_id = %sent_request_id, "Signature verified");
                Ok(())
            }
        }
    }

    /// Records the user's intent. Pure construction, no principal is called.
    pub fn submit_intent(&self, flow: &mut FlowState, input: IntentInput) -> Result<PaymentIntent> {
        flow.expect_step(FlowStep::Intent)?;
        Amount::parse(&input.amount)?;
        if input.recipient.trim().is_empty() {
            return Err(ProtocolError::Validation(
                "Recipient is required".to_string(),
            ));
        }

        let summary = match input.summary {
            Some(summary) if !summary.trim().is_empty() => summary.trim().to_string(),
            _ => summarize(&input.prompt),
        };
        let intent = PaymentIntent {
            id: new_id("intent"),
            created_at: Utc::now(),
            prompt: input.prompt,
            summary,
            amount: input.amount.trim().to_string(),
            recipient: input.recipient.trim().to_string(),
            memo: input.memo.filter(|m| !m.trim().is_empty()),
            created_by: Principal::Orchestrator,
        };

        info!(intent_id = %intent.id, amount = %intent.amount, "Intent submitted");
        flow.record_intent(intent.clone());
        Ok(intent)
    }

    /// Asks the merchant for a signed cart and verifies it.
    pub async fn request_cart(&self, flow: &mut FlowState) -> Result<SignedCart> {
        flow.expect_step(FlowStep::Cart)?;
        let intent = flow.intent().cloned().ok_or(ProtocolError::InvalidStep {
            expected: "cart",
            actual: "intent",
        })?;

        let request = CartRequest {
            request_id: new_id("req"),
            from: Principal::Orchestrator,
            intent_id: intent.id.clone(),
            summary: intent.summary.clone(),
            amount: intent.amount.clone(),
            recipient: intent.recipient.clone(),
            timestamp: Utc::now(),
        };
        let request_id = request.request_id.clone();

        let merchant = Arc::clone(&self.merchant);
        let cart = self
            .call(Principal::Merchant, async move {
                merchant.create_cart(request).await
            })
            .await?;

        let payload = cart.attested_payload()?;
        if payload != cart.signed_payload {
            return Err(ProtocolError::Integrity(format!(
                "Cart {} signed payload does not match its fields",
                cart.id
            )));
        }
        self.verify_response(
            Principal::Merchant,
            cart.signer,
            &request_id,
            &cart.request_id,
            &payload,
            &cart.signature,
        )?;
        if Amount::parse(&cart.total)? != Amount::parse(&intent.amount)? {
            return Err(ProtocolError::Integrity(format!(
                "Cart total {} differs from requested amount {}",
                cart.total, intent.amount
            )));
        }

        info!(cart_id = %cart.id, intent_id = %intent.id, "Cart accepted");
        flow.record_cart(cart.clone());
        Ok(cart)
    }

    /// Forwards the user's decision to the credentials holder and verifies
    /// the signed authorization. A rejection moves the flow straight to the
    /// receipt step.
    pub async fn request_approval(
        &self,
        flow: &mut FlowState,
        decision: ApprovalDecision,
    ) -> Result<SignedAuthorization> {
        flow.expect_step(FlowStep::Authorization)?;
        let (intent, cart) = match (flow.intent(), flow.cart()) {
            (Some(intent), Some(cart)) => (intent.clone(), cart.clone()),
            _ => {
                return Err(ProtocolError::InvalidStep {
                    expected: "authorization",
                    actual: "cart",
                });
            }
        };
        if cart.is_expired_at(Utc::now()) {
            return Err(ProtocolError::CartExpired(cart.id));
        }

        let request = ApprovalRequest {
            request_id: new_id("req"),
            from: Principal::Orchestrator,
            intent_id: intent.id.clone(),
            cart_id: cart.id.clone(),
            total: cart.total.clone(),
            recipient: intent.recipient.clone(),
            timestamp: Utc::now(),
        };
        let request_id = request.request_id.clone();

        let credentials = Arc::clone(&self.credentials);
        let authorization = self
            .call(Principal::CredentialsHolder, async move {
                credentials.decide_approval(request, decision).await
            })
            .await?;

        let payload = authorization.attested_payload()?;
        if payload != authorization.signed_payload {
            return Err(ProtocolError::Integrity(format!(
                "Authorization {} signed payload does not match its fields",
                authorization.id
            )));
        }
        self.verify_response(
            Principal::CredentialsHolder,
            authorization.signer,
            &request_id,
            &authorization.request_id,
            &payload,
            &authorization.signature,
        )?;
        if authorization.intent_id != intent.id {
            return Err(ProtocolError::Integrity(format!(
                "Authorization {} answers intent {}",
                authorization.id, authorization.intent_id
            )));
        }

        info!(
            auth_id = %authorization.id,
            status = authorization.status.as_str(),
            "Authorization received"
        );
        flow.record_authorization(authorization.clone());
        Ok(authorization)
    }

    /// Asks the processor to settle an approved authorization.
    ///
    /// Never builds a settlement request from a rejected authorization. A
    /// failed settlement is returned as data and still moves the flow to the
    /// receipt step.
    pub async fn request_settlement(&self, flow: &mut FlowState) -> Result<SignedSettlement> {
        if let Some(auth) = flow.authorization().filter(|a| !a.is_approved()) {
            return Err(ProtocolError::Declined(
                auth.reason
                    .clone()
                    .unwrap_or_else(|| "authorization rejected".to_string()),
            ));
        }
        flow.expect_step(FlowStep::Settlement)?;
        let (intent, authorization) = match (flow.intent(), flow.authorization()) {
            (Some(intent), Some(auth)) => (intent.clone(), auth.clone()),
            _ => {
                return Err(ProtocolError::InvalidStep {
                    expected: "settlement",
                    actual: "authorization",
                });
            }
        };

        // Retries of the same authorization reuse one request id, so the
        // processor answers them from its idempotency cache.
        let request = SettlementRequest {
            request_id: settlement_request_id(&authorization.id),
            from: Principal::Orchestrator,
            intent_id: intent.id.clone(),
            authorization_id: authorization.id.clone(),
            amount: intent.amount.clone(),
            recipient: intent.recipient.clone(),
            authorization_payload: authorization.signed_payload.clone(),
            authorization_proof: authorization.signature.clone(),
            timestamp: Utc::now(),
        };
        let request_id = request.request_id.clone();

        let processor = Arc::clone(&self.processor);
        let settlement = self
            .call(Principal::PaymentProcessor, async move {
                processor.settle(request).await
            })
            .await?;

        let payload = settlement.attested_payload()?;
        self.verify_response(
            Principal::PaymentProcessor,
            settlement.signer,
            &request_id,
            &settlement.request_id,
            &payload,
            &settlement.signature,
        )?;
        if settlement.authorization_id != authorization.id {
            return Err(ProtocolError::Integrity(format!(
                "Settlement {} references authorization {}",
                settlement.id, settlement.authorization_id
            )));
        }

        info!(
            settlement_id = %settlement.id,
            status = settlement.status.as_str(),
            "Settlement received"
        );
        flow.record_settlement(settlement.clone());
        Ok(settlement)
    }

    /// Assembles the receipt. Finalizing twice returns the same receipt.
    pub fn finalize(&self, flow: &mut FlowState) -> Result<Receipt> {
        flow.expect_step(FlowStep::Receipt)?;
        if let Some(existing) = flow.receipt() {
            return Ok(existing.clone());
        }
        let (intent, authorization) = match (flow.intent(), flow.authorization()) {
            (Some(intent), Some(auth)) => (intent, auth),
            _ => {
                return Err(ProtocolError::InvalidStep {
                    expected: "receipt",
                    actual: "authorization",
                });
            }
        };

        let receipt = receipt::assemble(intent, authorization, flow.settlement())?;
        info!(receipt_id = %receipt.id, summary = %receipt.human_summary, "Flow finalized");
        flow.record_receipt(receipt.clone());
        Ok(receipt)
    }

    /// Runs a whole flow from intent to receipt.
    pub async fn run(
        &self,
        flow: &mut FlowState,
        input: IntentInput,
        decision: ApprovalDecision,
    ) -> Result<Receipt> {
        self.submit_intent(flow, input)?;
        self.request_cart(flow).await?;
        let authorization = self.request_approval(flow, decision).await?;
        if authorization.is_approved() {
            self.request_settlement(flow).await?;
        }
        self.finalize(flow)
    }

    /// Runs a flow on its own task so the caller can abandon it.
    pub fn spawn_flow(
        self: &Arc<Self>,
        input: IntentInput,
        decision: ApprovalDecision,
    ) -> FlowHandle {
        let orchestrator = Arc::clone(self);
        let task = tokio::spawn(async move {
            let mut flow = FlowState::new();
            orchestrator.run(&mut flow, input, decision).await
        });
        FlowHandle { task }
    }
}

/// A flow running in the background.
pub struct FlowHandle {
    task: JoinHandle<Result<Receipt>>,
}

impl FlowHandle {
    /// Abandons the flow. A principal call already in flight runs to
    /// completion on its own task; its result is dropped.
    pub fn cancel(&self) {
        self.task.abort();
    }

    pub async fn join(self) -> Result<Receipt> {
        match self.task.await {
            Ok(result) => result,
            Err(e) if e.is_cancelled() => Err(ProtocolError::Cancelled),
            Err(e) => Err(ProtocolError::Execution(format!("Flow task failed: {}", e))),
        }
    }
}
