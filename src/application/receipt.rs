use crate::domain::messages::{
    PaymentIntent, Receipt, SignedAuthorization, SignedSettlement, new_id,
};
use crate::error::{ProtocolError, Result};
use chrono::Utc;

/// One-line description of how a flow ended.
pub fn human_summary(
    intent: &PaymentIntent,
    authorization: &SignedAuthorization,
    settlement: Option<&SignedSettlement>,
) -> String {
    if !authorization.is_approved() {
        return format!(
            "Payment of {} BTC to {} rejected: {}",
            intent.amount,
            intent.recipient,
            authorization.reason.as_deref().unwrap_or("no reason given")
        );
    }
    match settlement {
        Some(s) if s.is_success() => format!(
            "Paid {} BTC to {} (tx: {})",
            intent.amount,
            intent.recipient,
            s.tx_ref.as_deref().unwrap_or("unknown")
        ),
        Some(s) => format!(
            "Settlement of {} BTC to {} failed: {}",
            intent.amount,
            intent.recipient,
            s.error.as_deref().unwrap_or("unknown error")
        ),
        None => format!(
            "Payment of {} BTC to {} approved, not settled",
            intent.amount, intent.recipient
        ),
    }
}

/// Bundles the artifacts of a flow into its receipt.
///
/// The artifacts must belong together: the authorization answers this
/// intent, and a settlement is present exactly when the authorization was
/// approved and references it.
pub fn assemble(
    intent: &PaymentIntent,
    authorization: &SignedAuthorization,
    settlement: Option<&SignedSettlement>,
) -> Result<Receipt> {
    if authorization.intent_id != intent.id {
        return Err(ProtocolError::Integrity(format!(
            "Authorization {} does not belong to intent {}",
            authorization.id, intent.id
        )));
    }

    match (authorization.is_approved(), settlement) {
        (true, None) => {
            return Err(ProtocolError::Validation(
                "An approved authorization needs a settlement before it can be finalized"
                    .to_string(),
            ));
        }
        (false, Some(_)) => {
            return Err(ProtocolError::Integrity(
                "A rejected authorization cannot have a settlement".to_string(),
            ));
        }
        (true, Some(s)) if s.authorization_id != authorization.id || s.intent_id != intent.id => {
            return Err(ProtocolError::Integrity(format!(
                "Settlement {} does not reference authorization {}",
                s.id, authorization.id
            )));
        }
        _ => {}
    }

    Ok(Receipt {
        id: new_id("receipt"),
        created_at: Utc::now(),
        intent: intent.clone(),
        authorization: authorization.clone(),
        settlement: settlement.cloned(),
        human_summary: human_summary(intent, authorization, settlement),
    })
}
