use crate::domain::messages::{
    PaymentIntent, Receipt, SignedAuthorization, SignedCart, SignedSettlement,
};
use crate::error::{ProtocolError, Result};
use serde::Serialize;
use std::fmt;

/// Where a flow instance currently stands.
///
/// Steps are ordered; a flow only ever moves to a later step, except through
/// [`FlowState::reset`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum FlowStep {
    #[default]
    Intent,
    Cart,
    Authorization,
    Settlement,
    Receipt,
}

impl FlowStep {
    pub fn as_str(&self) -> &'static str {
        match self {
            FlowStep::Intent => "intent",
            FlowStep::Cart => "cart",
            FlowStep::Authorization => "authorization",
            FlowStep::Settlement => "settlement",
            FlowStep::Receipt => "receipt",
        }
    }
}

impl fmt::Display for FlowStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Session state of one flow instance.
///
/// Fields are only written through the orchestrator's transitions. The
/// state holds the signed artifacts by value and never edits them.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FlowState {
    current_step: FlowStep,
    intent: Option<PaymentIntent>,
    cart: Option<SignedCart>,
    authorization: Option<SignedAuthorization>,
    settlement: Option<SignedSettlement>,
    receipt: Option<Receipt>,
}

impl FlowState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current_step(&self) -> FlowStep {
        self.current_step
    }

    pub fn intent(&self) -> Option<&PaymentIntent> {
        self.intent.as_ref()
    }

    pub fn cart(&self) -> Option<&SignedCart> {
        self.cart.as_ref()
    }

    pub fn authorization(&self) -> Option<&SignedAuthorization> {
        self.authorization.as_ref()
    }

    pub fn settlement(&self) -> Option<&SignedSettlement> {
        self.settlement.as_ref()
    }

    pub fn receipt(&self) -> Option<&Receipt> {
        self.receipt.as_ref()
    }

    /// Clears everything and returns to [`FlowStep::Intent`]. Allowed from any step.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Fails unless the flow is exactly at `expected`.
    pub(crate) fn expect_step(&self, expected: FlowStep) -> Result<()> {
        if self.current_step == expected {
            Ok(())
        } else {
            Err(ProtocolError::InvalidStep {
                expected: expected.as_str(),
                actual: self.current_step.as_str(),
            })
        }
    }

    fn advance(&mut self, to: FlowStep) {
        debug_assert!(to >= self.current_step, "flow moved backwards");
        self.current_step = to;
    }

    pub(crate) fn record_intent(&mut self, intent: PaymentIntent) {
        self.intent = Some(intent);
        self.advance(FlowStep::Cart);
    }

    pub(crate) fn record_cart(&mut self, cart: SignedCart) {
        self.cart = Some(cart);
        self.advance(FlowStep::Authorization);
    }

    /// A rejected authorization short-circuits to the receipt step.
    pub(crate) fn record_authorization(&mut self, authorization: SignedAuthorization) {
        let next = if authorization.is_approved() {
            FlowStep::Settlement
        } else {
            FlowStep::Receipt
        };
        self.authorization = Some(authorization);
        self.advance(next);
    }

    pub(crate) fn record_settlement(&mut self, settlement: SignedSettlement) {
        self.settlement = Some(settlement);
        self.advance(FlowStep::Receipt);
    }

    pub(crate) fn record_receipt(&mut self, receipt: Receipt) {
        self.receipt = Some(receipt);
        self.advance(FlowStep::Receipt);
    }
}
