use serde::{Deserialize, Serialize};
use std::fmt;

/// The four parties of the protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Principal {
    #[serde(rename = "shopping-agent")]
    Orchestrator,
    #[serde(rename = "merchant-agent")]
    Merchant,
    #[serde(rename = "credentials-provider-agent")]
    CredentialsHolder,
    #[serde(rename = "merchant-payment-processor-agent")]
    PaymentProcessor,
}

impl Principal {
    pub const ALL: [Principal; 4] = [
        Principal::Orchestrator,
        Principal::Merchant,
        Principal::CredentialsHolder,
        Principal::PaymentProcessor,
    ];

    /// Canonical signer id, embedded in every signature this principal produces.
    pub fn signer_id(&self) -> &'static str {
        match self {
            Principal::Orchestrator => "shopping-agent",
            Principal::Merchant => "merchant-agent",
            Principal::CredentialsHolder => "credentials-provider-agent",
            Principal::PaymentProcessor => "merchant-payment-processor-agent",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Principal::Orchestrator => "Shopping Agent",
            Principal::Merchant => "Merchant Agent",
            Principal::CredentialsHolder => "Credentials Provider Agent",
            Principal::PaymentProcessor => "Merchant Payment Processor Agent",
        }
    }

    pub fn role(&self) -> &'static str {
        match self {
            Principal::Orchestrator => "Main orchestrator; handles user requests",
            Principal::Merchant => "Handles product queries; creates signed cart mandates",
            Principal::CredentialsHolder => {
                "Holds the user's payment credentials; signs approval decisions"
            }
            Principal::PaymentProcessor => "Settles approved payments through the ledger",
        }
    }
}

impl fmt::Display for Principal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.signer_id())
    }
}
