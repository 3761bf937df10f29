use crate::error::ProtocolError;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Recipient address format accepted by the payment processor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AddressPolicy {
    /// Any non-empty address without whitespace.
    #[default]
    Any,
    /// Legacy (`1`/`3`) or bech32 (`bc1`) Bitcoin mainnet-style addresses.
    Bitcoin,
}

impl AddressPolicy {
    pub fn validate(&self, address: &str) -> Result<(), ProtocolError> {
        if address.trim().is_empty() {
            return Err(ProtocolError::Validation(
                "Recipient address is empty".to_string(),
            ));
        }
        if address.chars().any(char::is_whitespace) {
            return Err(ProtocolError::Validation(format!(
                "Recipient address '{}' contains whitespace",
                address
            )));
        }
        match self {
            AddressPolicy::Any => Ok(()),
            AddressPolicy::Bitcoin if is_bitcoin_address(address) => Ok(()),
            AddressPolicy::Bitcoin => Err(ProtocolError::Validation(format!(
                "Recipient '{}' is not a valid Bitcoin address",
                address
            ))),
        }
    }
}

impl FromStr for AddressPolicy {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "any" => Ok(AddressPolicy::Any),
            "bitcoin" => Ok(AddressPolicy::Bitcoin),
            other => Err(ProtocolError::Validation(format!(
                "Unknown address policy '{}'",
                other
            ))),
        }
    }
}

fn is_bitcoin_address(address: &str) -> bool {
    let bech32 = address
        .get(..3)
        .is_some_and(|prefix| prefix.eq_ignore_ascii_case("bc1"));
    let body = if bech32 {
        &address[3..]
    } else if let Some(rest) = address.strip_prefix(['1', '3']) {
        rest
    } else {
        return false;
    };
    (25..=62).contains(&body.len())
        && body
            .chars()
            .all(|c| c.is_ascii_alphanumeric() && c != 'I' && c != 'O')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_any_policy() {
        assert!(AddressPolicy::Any.validate("addr1").is_ok());
        assert!(matches!(
            AddressPolicy::Any.validate("  "),
            Err(ProtocolError::Validation(_))
        ));
        assert!(AddressPolicy::Any.validate("addr 1").is_err());
    }

    #[test]
    fn test_bitcoin_policy() {
        let policy = AddressPolicy::Bitcoin;
        assert!(policy
            .validate("bc1qar0srrr7xfkvy5l643lydnw9re59gtzzwf5mdq")
            .is_ok());
        assert!(policy.validate("1BvBMSEYstWetqTFn5Au4m4GFg7xJaNVN2").is_ok());
        assert!(policy.validate("3J98t1WpEZ73CNmQviecrnyiWrnqRhWNLy").is_ok());
        assert!(policy.validate("addr1").is_err());
        assert!(policy.validate("1short").is_err());
        assert!(policy.validate("1BvBMSEYstWetqTFn5Au4m4GFg7xJaNVNO").is_err());
    }

    #[test]
    fn test_policy_from_str() {
        assert_eq!("Bitcoin".parse::<AddressPolicy>().unwrap(), AddressPolicy::Bitcoin);
        assert!("ethereum".parse::<AddressPolicy>().is_err());
    }
}
