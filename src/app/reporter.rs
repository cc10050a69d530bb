//! Incident reporter: one ledger transaction per Safe → Danger edge.
//!
//! Each report is three suspension points, always in this order:
//!
//! 1. fetch the sender's sequence number (never cached, so a transaction
//!    sent through another path cannot collide with ours),
//! 2. submit `mintIncidentReport(device_id, gas_level)` with that nonce,
//! 3. wait for on-chain confirmation.
//!
//! Failures are returned, never retried.  The caller reports and discards
//! them; the danger flag is not rolled back.

use log::info;

use crate::app::ports::LedgerPort;
use crate::app::records::{Address, IncidentRecord, Receipt};
use crate::error::Result;

/// Submits incident records through a [`LedgerPort`].
pub struct IncidentReporter<L> {
    ledger: L,
    sender: Address,
}

impl<L: LedgerPort> IncidentReporter<L> {
    pub fn new(ledger: L, sender: Address) -> Self {
        Self { ledger, sender }
    }

    /// Report one incident and wait for it to be confirmed.
    pub async fn report(&self, device_id: &str, gas_level: f64) -> Result<Receipt> {
        let record = IncidentRecord::new(device_id, gas_level)?;

        let nonce = self.ledger.sequence_number(&self.sender).await?;
        let tx = self.ledger.submit_incident(&record, nonce).await?;
        info!(
            "INCIDENT | tx {} sent (device={} gas={} nonce={}), awaiting confirmation",
            tx, record.device_id, record.gas_level, nonce
        );

        let receipt = self.ledger.wait_for_confirmation(&tx).await?;
        Ok(receipt)
    }

    /// The underlying ledger adapter.
    pub fn ledger(&self) -> &L {
        &self.ledger
    }
}
