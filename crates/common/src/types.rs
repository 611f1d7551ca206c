use std::collections::BTreeMap;

use alloy::primitives::{Address, B256, Bytes};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Alert severity levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Unknown,
    Info,
    Low,
    Medium,
    High,
    Critical,
}

/// Category of a finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FindingType {
    Info,
    Suspicious,
    Exploit,
    Degraded,
    Unknown,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Unknown => write!(f, "unknown"),
            Severity::Info => write!(f, "info"),
            Severity::Low => write!(f, "low"),
            Severity::Medium => write!(f, "medium"),
            Severity::High => write!(f, "high"),
            Severity::Critical => write!(f, "critical"),
        }
    }
}

impl std::fmt::Display for FindingType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FindingType::Info => write!(f, "info"),
            FindingType::Suspicious => write!(f, "suspicious"),
            FindingType::Exploit => write!(f, "exploit"),
            FindingType::Degraded => write!(f, "degraded"),
            FindingType::Unknown => write!(f, "unknown"),
        }
    }
}

/// A structured alert produced by a monitor.
///
/// Metadata is kept in a `BTreeMap` so the serialized form is identical for
/// identical inputs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Finding {
    pub name: String,
    pub description: String,
    pub alert_id: String,
    pub severity: Severity,
    #[serde(rename = "type")]
    pub finding_type: FindingType,
    pub metadata: BTreeMap<String, String>,
}

/// A raw log entry as emitted by a contract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    pub address: Address,
    pub topics: Vec<B256>,
    pub data: Bytes,
    pub log_index: Option<u64>,
}

/// A call into a contract with its raw calldata (selector + arguments).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionCall {
    pub to: Address,
    pub input: Bytes,
}

/// Everything a monitor sees about a single transaction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransactionEvent {
    pub hash: B256,
    pub block_number: u64,
    pub block_timestamp: DateTime<Utc>,
    pub from: Address,
    pub to: Option<Address>,
    pub logs: Vec<LogEntry>,
    pub calls: Vec<FunctionCall>,
}

impl TransactionEvent {
    /// Create an empty transaction event with no logs or calls.
    pub fn new(hash: B256, block_number: u64, from: Address, to: Option<Address>) -> Self {
        Self {
            hash,
            block_number,
            block_timestamp: DateTime::<Utc>::default(),
            from,
            to,
            logs: Vec::new(),
            calls: Vec::new(),
        }
    }

    /// Append a log entry with the next log index.
    pub fn with_log(mut self, address: Address, topics: Vec<B256>, data: impl Into<Bytes>) -> Self {
        let log_index = Some(self.logs.len() as u64);
        self.logs.push(LogEntry {
            address,
            topics,
            data: data.into(),
            log_index,
        });
        self
    }

    /// Append a contract call.
    pub fn with_call(mut self, to: Address, input: impl Into<Bytes>) -> Self {
        self.calls.push(FunctionCall {
            to,
            input: input.into(),
        });
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_assigns_log_indices() {
        let tx = TransactionEvent::new(B256::ZERO, 1, Address::ZERO, None)
            .with_log(Address::ZERO, vec![], Bytes::new())
            .with_log(Address::ZERO, vec![], Bytes::new())
            .with_call(Address::ZERO, Bytes::new());

        assert_eq!(tx.logs[0].log_index, Some(0));
        assert_eq!(tx.logs[1].log_index, Some(1));
        assert_eq!(tx.calls.len(), 1);
    }

    #[test]
    fn test_finding_serializes_type_field() {
        let finding = Finding {
            name: "n".to_string(),
            description: "d".to_string(),
            alert_id: "A-1".to_string(),
            severity: Severity::High,
            finding_type: FindingType::Suspicious,
            metadata: BTreeMap::new(),
        };
        let json = serde_json::to_value(&finding).unwrap();
        assert_eq!(json["type"], "suspicious");
        assert_eq!(json["severity"], "high");
    }
}
