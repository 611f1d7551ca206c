use alloy::dyn_abi::{DynSolType, DynSolValue};
use alloy::primitives::{Address, B256, Bytes};

use chainwatch_common::error::{MonitorError, Result};
use chainwatch_common::types::{FunctionCall, LogEntry, TransactionEvent};

use crate::interface::{InterfaceKind, InterfaceSpec};
use crate::record::{DecodedRecord, RecordSource};
use crate::value::Value;

/// Transaction-level context stamped onto every decoded record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordContext {
    pub tx_hash: B256,
    pub block_number: u64,
}

impl RecordContext {
    pub fn of(tx: &TransactionEvent) -> Self {
        Self {
            tx_hash: tx.hash,
            block_number: tx.block_number,
        }
    }
}

/// Indexed value types are stored in the topic as their ABI word; every other
/// indexed type is stored as the keccak256 hash of its encoding.
fn is_value_type(ty: &DynSolType) -> bool {
    matches!(
        ty,
        DynSolType::Address
            | DynSolType::Bool
            | DynSolType::Int(_)
            | DynSolType::Uint(_)
            | DynSolType::FixedBytes(_)
            | DynSolType::Function
    )
}

impl InterfaceSpec {
    /// Decode a log entry against this interface.
    ///
    /// Returns `Ok(None)` when the log was emitted by an address outside
    /// `targets` or its topic0 is not this event's hash. A log that does match
    /// but carries malformed topics or data is an error.
    pub fn decode_log(
        &self,
        log: &LogEntry,
        targets: &[Address],
        ctx: RecordContext,
    ) -> Result<Option<DecodedRecord>> {
        let InterfaceKind::Event { topic0 } = self.kind() else {
            return Ok(None);
        };
        if !targets.contains(&log.address) || log.topics.first() != Some(&topic0) {
            return Ok(None);
        }

        let indexed_count = self.params().iter().filter(|p| p.indexed).count();
        if log.topics.len() != indexed_count + 1 {
            return Err(MonitorError::decode(
                self.name(),
                format!(
                    "expected {} topics, log has {}",
                    indexed_count + 1,
                    log.topics.len()
                ),
            ));
        }

        let body_types: Vec<DynSolType> = self
            .params()
            .iter()
            .filter(|p| !p.indexed)
            .map(|p| p.ty.clone())
            .collect();
        let mut body = decode_sequence(self.name(), body_types, &log.data)?.into_iter();
        let mut topics = log.topics[1..].iter();

        let mut fields = Vec::with_capacity(self.params().len());
        for param in self.params() {
            let value = if param.indexed {
                let topic = topics
                    .next()
                    .ok_or_else(|| MonitorError::decode(self.name(), "missing topic"))?;
                if is_value_type(&param.ty) {
                    param
                        .ty
                        .abi_decode(topic.as_slice())
                        .map(Value::from)
                        .map_err(|e| {
                            MonitorError::decode(self.name(), format!("topic `{}`: {e}", param.name))
                        })?
                } else {
                    Value::Bytes(Bytes::copy_from_slice(topic.as_slice()))
                }
            } else {
                body.next()
                    .map(Value::from)
                    .ok_or_else(|| MonitorError::decode(self.name(), "missing body value"))?
            };
            fields.push((param.name.clone(), value));
        }

        Ok(Some(DecodedRecord {
            interface: self.name().to_string(),
            source: RecordSource::Log {
                log_index: log.log_index,
            },
            address: log.address,
            tx_hash: ctx.tx_hash,
            block_number: ctx.block_number,
            fields,
        }))
    }

    /// Decode a contract call against this interface.
    ///
    /// Returns `Ok(None)` when the call targets another address or its
    /// selector differs. Calldata shorter than a selector never matches.
    pub fn decode_call(
        &self,
        call: &FunctionCall,
        call_index: usize,
        targets: &[Address],
        ctx: RecordContext,
    ) -> Result<Option<DecodedRecord>> {
        let InterfaceKind::Function { selector } = self.kind() else {
            return Ok(None);
        };
        if !targets.contains(&call.to) || call.input.len() < 4 || call.input[..4] != selector[..] {
            return Ok(None);
        }

        let types: Vec<DynSolType> = self.params().iter().map(|p| p.ty.clone()).collect();
        let values = decode_sequence(self.name(), types, &call.input[4..])?;

        let fields = self
            .params()
            .iter()
            .zip(values)
            .map(|(param, value)| (param.name.clone(), Value::from(value)))
            .collect();

        Ok(Some(DecodedRecord {
            interface: self.name().to_string(),
            source: RecordSource::Call { call_index },
            address: call.to,
            tx_hash: ctx.tx_hash,
            block_number: ctx.block_number,
            fields,
        }))
    }
}

fn decode_sequence(interface: &str, types: Vec<DynSolType>, data: &[u8]) -> Result<Vec<DynSolValue>> {
    if types.is_empty() {
        return Ok(Vec::new());
    }
    let expected = types.len();

    match DynSolType::Tuple(types)
        .abi_decode_sequence(data)
        .map_err(|e| MonitorError::decode(interface, e))?
    {
        DynSolValue::Tuple(values) if values.len() == expected => Ok(values),
        other => Err(MonitorError::decode(
            interface,
            format!("unexpected decoded shape: {other:?}"),
        )),
    }
}
