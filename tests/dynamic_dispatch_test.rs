mod common;

use ap2_protocol::application::credentials::CredentialsHandler;
use ap2_protocol::application::merchant::MerchantHandler;
use ap2_protocol::application::processor::PaymentProcessor;
use ap2_protocol::config::Config;
use ap2_protocol::domain::messages::{
    ApprovalDecision, ApprovalRequest, CartRequest, SettlementRequest,
};
use ap2_protocol::domain::ports::{
    CredentialsHandle, LedgerHandle, MerchantHandle, SettlementHandle,
};
use ap2_protocol::domain::principal::Principal;
use chrono::Utc;
use common::FixedLedger;
use std::sync::Arc;

#[tokio::test]
async fn test_principals_as_trait_objects() {
    let config = Config::default();
    let ledger: LedgerHandle = Arc::new(FixedLedger::new("tx-dyn"));
    let merchant: MerchantHandle = Arc::new(MerchantHandler::new(&config));
    let holder = CredentialsHandler::new();
    let processor: SettlementHandle = Arc::new(PaymentProcessor::new(
        ledger,
        holder.verifying_key(),
        &config,
    ));
    let credentials: CredentialsHandle = Arc::new(holder);

    // Verify Send + Sync by spawning tasks
    let cart_handle = tokio::spawn(async move {
        merchant
            .create_cart(CartRequest {
                request_id: "req_1".to_string(),
                from: Principal::Orchestrator,
                intent_id: "intent_1".to_string(),
                summary: "Coffee".to_string(),
                amount: "0.001".to_string(),
                recipient: "addr1".to_string(),
                timestamp: Utc::now(),
            })
            .await
            .unwrap()
    });

    let auth_handle = tokio::spawn(async move {
        credentials
            .decide_approval(
                ApprovalRequest {
                    request_id: "req_2".to_string(),
                    from: Principal::Orchestrator,
                    intent_id: "intent_1".to_string(),
                    cart_id: "cart_1".to_string(),
                    total: "0.001".to_string(),
                    recipient: "addr1".to_string(),
                    timestamp: Utc::now(),
                },
                ApprovalDecision::Approved,
            )
            .await
            .unwrap()
    });

    let cart = cart_handle.await.unwrap();
    assert_eq!(cart.request_id, "req_1");
    assert_eq!(cart.total, "0.001");

    let authorization = auth_handle.await.unwrap();
    assert_eq!(authorization.request_id, "req_2");
    assert!(authorization.is_approved());

    let settle_handle = tokio::spawn(async move {
        processor
            .settle(SettlementRequest {
                request_id: "req_3".to_string(),
                from: Principal::Orchestrator,
                intent_id: "intent_1".to_string(),
                authorization_id: authorization.id.clone(),
                amount: "0.001".to_string(),
                recipient: "addr1".to_string(),
                authorization_payload: authorization.signed_payload.clone(),
                authorization_proof: authorization.signature.clone(),
                timestamp: Utc::now(),
            })
            .await
            .unwrap()
    });

    let settlement = settle_handle.await.unwrap();
    assert!(settlement.is_success());
    assert_eq!(settlement.tx_ref.as_deref(), Some("tx-dyn"));
}
