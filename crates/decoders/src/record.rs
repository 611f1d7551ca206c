use alloy::primitives::{Address, B256, U256};

use crate::value::Value;

/// Where a decoded record came from inside its transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordSource {
    Log { log_index: Option<u64> },
    Call { call_index: usize },
}

/// Arguments decoded from one log or call, one value per declared parameter
/// in declaration order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedRecord {
    /// Name of the interface that produced this record.
    pub interface: String,
    pub source: RecordSource,
    /// Emitting address for logs, called address for calls.
    pub address: Address,
    pub tx_hash: B256,
    pub block_number: u64,
    pub(crate) fields: Vec<(String, Value)>,
}

impl DecodedRecord {
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields
            .iter()
            .find(|(field, _)| field == name)
            .map(|(_, value)| value)
    }

    pub fn uint(&self, name: &str) -> Option<U256> {
        self.get(name).and_then(Value::as_uint)
    }

    pub fn address(&self, name: &str) -> Option<Address> {
        self.get(name).and_then(Value::as_address)
    }

    pub fn fields(&self) -> &[(String, Value)] {
        &self.fields
    }
}
