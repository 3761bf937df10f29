use crate::domain::messages::Receipt;
use crate::error::Result;
use serde::Serialize;
use std::io::Write;

#[derive(Serialize)]
struct ReceiptRow<'a> {
    receipt: &'a str,
    intent: &'a str,
    amount: &'a str,
    recipient: &'a str,
    authorization: &'a str,
    settlement: &'a str,
    tx_ref: &'a str,
    summary: &'a str,
}

/// Writes receipts as CSV rows, one per flow.
pub struct ReceiptWriter<W: Write> {
    writer: csv::Writer<W>,
}

impl<W: Write> ReceiptWriter<W> {
    pub fn new(sink: W) -> Self {
        Self {
            writer: csv::Writer::from_writer(sink),
        }
    }

    pub fn write_receipt(&mut self, receipt: &Receipt) -> Result<()> {
        let settlement = receipt.settlement.as_ref();
        self.writer.serialize(ReceiptRow {
            receipt: &receipt.id,
            intent: &receipt.intent.id,
            amount: &receipt.intent.amount,
            recipient: &receipt.intent.recipient,
            authorization: receipt.authorization.status.as_str(),
            settlement: settlement.map_or("none", |s| s.status.as_str()),
            tx_ref: settlement.and_then(|s| s.tx_ref.as_deref()).unwrap_or(""),
            summary: &receipt.human_summary,
        })?;
        Ok(())
    }

    pub fn flush(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }
}
