pub mod decode;
pub mod interface;
pub mod record;
pub mod value;

#[cfg(test)]
mod decoder_tests;

use alloy::primitives::Address;
use chainwatch_common::error::Result;
use chainwatch_common::types::TransactionEvent;

pub use decode::RecordContext;
pub use interface::{InterfaceKind, InterfaceSpec, ParamSpec};
pub use record::{DecodedRecord, RecordSource};
pub use value::Value;

/// The interfaces a monitor listens to, tried in declaration order.
#[derive(Debug, Clone, Default)]
pub struct InterfaceSet {
    interfaces: Vec<InterfaceSpec>,
}

impl InterfaceSet {
    pub fn new(interfaces: Vec<InterfaceSpec>) -> Self {
        Self { interfaces }
    }

    pub fn iter(&self) -> impl Iterator<Item = &InterfaceSpec> {
        self.interfaces.iter()
    }

    pub fn get(&self, name: &str) -> Option<&InterfaceSpec> {
        self.interfaces.iter().find(|i| i.name() == name)
    }

    pub fn is_empty(&self) -> bool {
        self.interfaces.is_empty()
    }

    /// Decode every record of a transaction that targets one of `targets`.
    ///
    /// Logs are visited in log order, then calls in call order. A record yields
    /// at most one entry (the first interface that matches it); records no
    /// interface matches are dropped. Decode failures are returned in place so
    /// the caller can isolate them to their record.
    pub fn decode_transaction(
        &self,
        tx: &TransactionEvent,
        targets: &[Address],
    ) -> Vec<Result<DecodedRecord>> {
        let ctx = RecordContext::of(tx);
        let mut out = Vec::new();

        for log in &tx.logs {
            for interface in self.interfaces.iter().filter(|i| i.is_event()) {
                match interface.decode_log(log, targets, ctx) {
                    Ok(None) => continue,
                    Ok(Some(record)) => {
                        tracing::debug!(
                            interface = interface.name(),
                            address = %record.address,
                            log_index = ?log.log_index,
                            "Decoded log"
                        );
                        out.push(Ok(record));
                    }
                    Err(e) => out.push(Err(e)),
                }
                break;
            }
        }

        for (call_index, call) in tx.calls.iter().enumerate() {
            for interface in self.interfaces.iter().filter(|i| !i.is_event()) {
                match interface.decode_call(call, call_index, targets, ctx) {
                    Ok(None) => continue,
                    Ok(Some(record)) => {
                        tracing::debug!(
                            interface = interface.name(),
                            address = %record.address,
                            call_index,
                            "Decoded call"
                        );
                        out.push(Ok(record));
                    }
                    Err(e) => out.push(Err(e)),
                }
                break;
            }
        }

        out
    }
}
