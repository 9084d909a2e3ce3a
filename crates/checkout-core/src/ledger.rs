//! # Processor Response Ledger
//!
//! Every payload exchanged with a payment gateway is recorded here,
//! keyed by processor name and the gateway's transaction id. The
//! callback flow uses the ledger to find its way back to the basket.

use crate::error::{PaymentError, PaymentResult};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::RwLock;

/// A recorded gateway payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessorResponseEntry {
    pub id: u64,

    pub processor_name: String,

    /// Gateway transaction id (payment link, payment or refund id)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transaction_id: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub basket_id: Option<u64>,

    /// Raw payload as received from (or sent by) the gateway
    pub response: serde_json::Value,

    pub created_at: DateTime<Utc>,
}

#[async_trait]
pub trait ProcessorResponseStore: Send + Sync {
    /// Append a payload to the ledger
    async fn record(
        &self,
        processor_name: &str,
        transaction_id: Option<&str>,
        basket_id: Option<u64>,
        response: serde_json::Value,
    ) -> PaymentResult<ProcessorResponseEntry>;

    /// All entries for a processor and transaction id, oldest first
    async fn find_by_transaction(
        &self,
        processor_name: &str,
        transaction_id: &str,
    ) -> PaymentResult<Vec<ProcessorResponseEntry>>;

    /// Resolve a transaction id to exactly one basket.
    ///
    /// Zero matches, or a match without a basket, is
    /// `TransactionNotFound`. Several matches is `DuplicateTransaction`.
    async fn basket_for_transaction(
        &self,
        processor_name: &str,
        transaction_id: &str,
    ) -> PaymentResult<u64> {
        let entries = self
            .find_by_transaction(processor_name, transaction_id)
            .await?;

        match entries.as_slice() {
            [] => Err(PaymentError::TransactionNotFound {
                transaction_id: transaction_id.to_string(),
            }),
            [entry] => entry
                .basket_id
                .ok_or_else(|| PaymentError::TransactionNotFound {
                    transaction_id: transaction_id.to_string(),
                }),
            many => Err(PaymentError::DuplicateTransaction {
                transaction_id: transaction_id.to_string(),
                count: many.len(),
            }),
        }
    }
}

#[derive(Debug)]
pub struct InMemoryProcessorResponseStore {
    entries: RwLock<Vec<ProcessorResponseEntry>>,
    next_id: AtomicU64,
}

impl InMemoryProcessorResponseStore {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(Vec::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Snapshot of every entry
    pub async fn entries(&self) -> Vec<ProcessorResponseEntry> {
        self.entries.read().await.clone()
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

impl Default for InMemoryProcessorResponseStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ProcessorResponseStore for InMemoryProcessorResponseStore {
    async fn record(
        &self,
        processor_name: &str,
        transaction_id: Option<&str>,
        basket_id: Option<u64>,
        response: serde_json::Value,
    ) -> PaymentResult<ProcessorResponseEntry> {
        let entry = ProcessorResponseEntry {
            id: self.next_id.fetch_add(1, Ordering::SeqCst),
            processor_name: processor_name.to_string(),
            transaction_id: transaction_id.map(String::from),
            basket_id,
            response,
            created_at: Utc::now(),
        };
        self.entries.write().await.push(entry.clone());
        Ok(entry)
    }

    async fn find_by_transaction(
        &self,
        processor_name: &str,
        transaction_id: &str,
    ) -> PaymentResult<Vec<ProcessorResponseEntry>> {
        Ok(self
            .entries
            .read()
            .await
            .iter()
            .filter(|e| {
                e.processor_name == processor_name
                    && e.transaction_id.as_deref() == Some(transaction_id)
            })
            .cloned()
            .collect())
    }
}
