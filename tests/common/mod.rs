#![allow(dead_code)]

use ap2_protocol::application::orchestrator::IntentInput;
use ap2_protocol::domain::amount::Amount;
use ap2_protocol::domain::ports::LedgerClient;
use ap2_protocol::error::{ProtocolError, Result};
use async_trait::async_trait;
use std::fs::File;
use std::io::Error;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// Ledger that always answers with the same reference.
pub struct FixedLedger {
    pub tx_ref: String,
    pub latency: Duration,
    calls: AtomicUsize,
}

impl FixedLedger {
    pub fn new(tx_ref: &str) -> Self {
        Self {
            tx_ref: tx_ref.to_string(),
            latency: Duration::ZERO,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LedgerClient for FixedLedger {
    async fn transfer(&self, _recipient: &str, _amount: Amount) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        Ok(self.tx_ref.clone())
    }
}

/// Ledger that always fails with the given message.
pub struct FailingLedger(pub String);

#[async_trait]
impl LedgerClient for FailingLedger {
    async fn transfer(&self, _recipient: &str, _amount: Amount) -> Result<String> {
        Err(ProtocolError::Execution(self.0.clone()))
    }
}

pub fn intent(amount: &str, recipient: &str) -> IntentInput {
    IntentInput {
        prompt: format!("Pay {} BTC to {}", amount, recipient),
        amount: amount.to_string(),
        recipient: recipient.to_string(),
        ..IntentInput::default()
    }
}

pub fn write_intents(path: &Path, rows: &[[&str; 7]]) -> std::result::Result<(), Error> {
    let file = File::create(path)?;
    let mut wtr = csv::WriterBuilder::new().from_writer(file);
    wtr.write_record([
        "prompt",
        "summary",
        "amount",
        "recipient",
        "memo",
        "decision",
        "reason",
    ])?;
    for row in rows {
        wtr.write_record(row)?;
    }
    wtr.flush()?;
    Ok(())
}
