use crate::application::orchestrator::IntentInput;
use crate::domain::messages::ApprovalDecision;
use crate::error::{ProtocolError, Result};
use serde::Deserialize;
use std::io::Read;

/// One row of a batch file: an intent plus the user's approval decision.
#[derive(Debug, Deserialize, PartialEq, Clone)]
pub struct IntentRecord {
    pub prompt: String,
    #[serde(default)]
    pub summary: Option<String>,
    pub amount: String,
    pub recipient: String,
    #[serde(default)]
    pub memo: Option<String>,
    pub decision: DecisionKind,
    #[serde(default)]
    pub reason: Option<String>,
}

#[derive(Debug, Deserialize, PartialEq, Clone, Copy)]
#[serde(rename_all = "lowercase")]
pub enum DecisionKind {
    #[serde(alias = "approve")]
    Approved,
    #[serde(alias = "reject")]
    Rejected,
}

impl IntentRecord {
    pub fn into_parts(self) -> (IntentInput, ApprovalDecision) {
        let decision = match self.decision {
            DecisionKind::Approved => ApprovalDecision::Approved,
            DecisionKind::Rejected => ApprovalDecision::Rejected {
                reason: self.reason.unwrap_or_default(),
            },
        };
        let input = IntentInput {
            prompt: self.prompt,
            summary: self.summary,
            amount: self.amount,
            recipient: self.recipient,
            memo: self.memo,
        };
        (input, decision)
    }
}

/// Reads intent records from a CSV source.
///
/// Wraps `csv::Reader` with whitespace trimming and flexible record lengths,
/// so trailing optional columns may be left off.
pub struct IntentReader<R: Read> {
    reader: csv::Reader<R>,
}

impl<R: Read> IntentReader<R> {
    pub fn new(source: R) -> Self {
        let reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(source);
        Self { reader }
    }

    /// Lazily deserializes records, one `Result` per row.
    pub fn records(self) -> impl Iterator<Item = Result<IntentRecord>> {
        self.reader
            .into_deserialize()
            .map(|result| result.map_err(ProtocolError::from))
    }
}
