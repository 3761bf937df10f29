use crate::config::{Config, ttl_from_secs};
use crate::domain::amount::Amount;
use crate::domain::messages::{CartItem, CartRequest, SignedCart, cart_payload, new_id};
use crate::domain::ports::{CatalogHandle, MerchantService};
use crate::domain::principal::Principal;
use crate::domain::signing::SigningIdentity;
use crate::error::{ProtocolError, Result};
use async_trait::async_trait;
use chrono::Utc;
use ed25519_dalek::VerifyingKey;
use rust_decimal::prelude::ToPrimitive;
use tracing::{debug, info};

/// Prices cart requests and signs the resulting cart.
///
/// Has no view of payment credentials or settlement.
pub struct MerchantHandler {
    identity: SigningIdentity,
    merchant_id: String,
    merchant_name: String,
    cart_ttl_secs: u64,
    catalog: Option<CatalogHandle>,
}

impl MerchantHandler {
    pub fn new(config: &Config) -> Self {
        Self::with_identity(
            SigningIdentity::generate(Principal::Merchant.signer_id()),
            config,
        )
    }

    pub fn with_identity(identity: SigningIdentity, config: &Config) -> Self {
        Self {
            identity,
            merchant_id: config.merchant_id.clone(),
            merchant_name: config.merchant_name.clone(),
            cart_ttl_secs: config.cart_ttl_secs,
            catalog: None,
        }
    }

    /// Plugs in order matching against a catalog.
    pub fn with_catalog(mut self, catalog: CatalogHandle) -> Self {
        self.catalog = Some(catalog);
        self
    }

    pub fn verifying_key(&self) -> VerifyingKey {
        self.identity.verifying_key()
    }

    fn line_item(&self, request: &CartRequest, total: Amount) -> CartItem {
        let matched = self
            .catalog
            .as_ref()
            .and_then(|catalog| catalog.find_match(&request.summary, total));

        match matched {
            Some(entry) => {
                // The requested total wins; quantity is how many units it covers.
                let quantity = total
                    .value()
                    .checked_div(entry.unit_price.value())
                    .and_then(|q| q.trunc().to_u32())
                    .unwrap_or(1)
                    .max(1);
                debug!(sku = %entry.sku, quantity, "Matched catalog entry");
                CartItem {
                    id: new_id("item"),
                    name: entry.name,
                    quantity,
                    unit_amount: entry.unit_price.to_string(),
                    total: request.amount.clone(),
                }
            }
            None => CartItem {
                id: new_id("item"),
                name: request.summary.clone(),
                quantity: 1,
                unit_amount: request.amount.clone(),
                total: request.amount.clone(),
            },
        }
    }

    /// Builds and signs a single-line cart for the request.
    pub fn build_cart(&self, request: &CartRequest) -> Result<SignedCart> {
        let total = Amount::parse(&request.amount)?;
        if request.summary.trim().is_empty() {
            return Err(ProtocolError::Validation(
                "Cart summary is empty".to_string(),
            ));
        }

        let ttl = ttl_from_secs(self.cart_ttl_secs)?;
        let created_at = Utc::now();
        let expires_at = created_at.checked_add_signed(ttl).ok_or_else(|| {
            ProtocolError::Validation("Cart expiry is out of range".to_string())
        })?;
        let id = new_id("cart");
        let item = self.line_item(request, total);

        let signed_payload = cart_payload(
            &id,
            &request.request_id,
            &self.merchant_id,
            &request.amount,
            &expires_at,
        )?;
        let signature = self.identity.sign(&signed_payload);

        info!(cart_id = %id, request_id = %request.request_id, total = %total, "Signed cart");
        Ok(SignedCart {
            id,
            request_id: request.request_id.clone(),
            merchant_id: self.merchant_id.clone(),
            merchant_name: self.merchant_name.clone(),
            created_at,
            expires_at,
            items: vec![item],
            total: request.amount.clone(),
            signer: Principal::Merchant,
            signature,
            signed_payload,
        })
    }
}

#[async_trait]
impl MerchantService for MerchantHandler {
    async fn create_cart(&self, request: CartRequest) -> Result<SignedCart> {
        self.build_cart(&request)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ports::CatalogEntry;
    use crate::domain::signing::verify;
    use crate::infrastructure::in_memory::StaticCatalog;
    use rust_decimal_macros::dec;
    use std::sync::Arc;

    fn request(amount: &str) -> CartRequest {
        CartRequest {
            request_id: "req_1".to_string(),
            from: Principal::Orchestrator,
            intent_id: "intent_1".to_string(),
            summary: "Coffee beans".to_string(),
            amount: amount.to_string(),
            recipient: "addr1".to_string(),
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn test_cart_is_signed_and_verifiable() {
        let merchant = MerchantHandler::new(&Config::default());
        let cart = merchant.build_cart(&request("0.001")).unwrap();

        assert_eq!(cart.request_id, "req_1");
        assert_eq!(cart.total, "0.001");
        assert_eq!(cart.items.len(), 1);
        assert_eq!(cart.items[0].name, "Coffee beans");
        assert_eq!(cart.signed_payload, cart.attested_payload().unwrap());
        assert!(verify(
            &merchant.verifying_key(),
            Principal::Merchant.signer_id(),
            &cart.signed_payload,
            &cart.signature
        ));
    }

    #[test]
    fn test_cart_expires_after_ttl() {
        let merchant = MerchantHandler::new(&Config::default());
        let cart = merchant.build_cart(&request("1")).unwrap();
        assert_eq!(cart.expires_at - cart.created_at, chrono::Duration::hours(1));
        assert!(!cart.is_expired_at(cart.created_at));
        assert!(cart.is_expired_at(cart.expires_at));
    }

    #[test]
    fn test_out_of_range_ttl_is_a_validation_error() {
        for cart_ttl_secs in [u64::MAX, i64::MAX as u64, 400_000 * 365 * 24 * 60 * 60] {
            let merchant = MerchantHandler::new(&Config {
                cart_ttl_secs,
                ..Config::default()
            });
            assert!(matches!(
                merchant.build_cart(&request("0.001")),
                Err(ProtocolError::Validation(_))
            ));
        }
    }

    #[test]
    fn test_invalid_amount_is_not_signed() {
        let merchant = MerchantHandler::new(&Config::default());
        for amount in ["0", "-1", "abc", ""] {
            assert!(matches!(
                merchant.build_cart(&request(amount)),
                Err(ProtocolError::Validation(_))
            ));
        }
    }

    #[test]
    fn test_catalog_match_preserves_total() {
        let catalog = StaticCatalog::new(vec![CatalogEntry {
            sku: "beans-250g".to_string(),
            name: "Single-origin beans 250g".to_string(),
            unit_price: Amount::new(dec!(0.0005)).unwrap(),
        }]);
        let merchant =
            MerchantHandler::new(&Config::default()).with_catalog(Arc::new(catalog));

        let cart = merchant.build_cart(&request("0.001")).unwrap();
        let item = &cart.items[0];
        assert_eq!(item.name, "Single-origin beans 250g");
        assert_eq!(item.unit_amount, "0.0005");
        assert_eq!(item.quantity, 2);
        assert_eq!(item.total, "0.001");
        assert_eq!(cart.total, "0.001");
    }
}
