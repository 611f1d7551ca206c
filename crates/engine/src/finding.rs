//! Finding builder: renders a fired rule into a `Finding`.
//!
//! Rendering is pure: the same rule, record and fetched value always give the
//! same finding, down to the order and formatting of metadata.

use std::collections::BTreeMap;

use alloy::primitives::U256;

use chainwatch_common::error::{MonitorError, Result};
use chainwatch_common::types::{Finding, FindingType, Severity};
use chainwatch_decoders::{DecodedRecord, InterfaceSpec};

/// Where a metadata value comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MetadataSource {
    /// A decoded parameter, by name.
    Field(&'static str),
    /// The address that emitted the log or received the call.
    Address,
    /// The transaction hash.
    TxHash,
    /// The value fetched by the rule's external read.
    Fetched,
    /// A constant.
    Literal(&'static str),
}

/// Static part of a finding plus its metadata schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FindingTemplate {
    pub name: &'static str,
    /// May reference metadata keys as `{key}`.
    pub description: &'static str,
    pub alert_id: &'static str,
    pub severity: Severity,
    pub finding_type: FindingType,
    pub metadata: Vec<(&'static str, MetadataSource)>,
}

impl FindingTemplate {
    pub fn new(name: &'static str, description: &'static str, alert_id: &'static str) -> Self {
        Self {
            name,
            description,
            alert_id,
            severity: Severity::Info,
            finding_type: FindingType::Info,
            metadata: Vec::new(),
        }
    }

    pub fn severity(mut self, severity: Severity) -> Self {
        self.severity = severity;
        self
    }

    pub fn finding_type(mut self, finding_type: FindingType) -> Self {
        self.finding_type = finding_type;
        self
    }

    /// Copy a decoded parameter into metadata under `key`.
    pub fn field(mut self, key: &'static str, param: &'static str) -> Self {
        self.metadata.push((key, MetadataSource::Field(param)));
        self
    }

    /// Copy the emitting / called address into metadata under `key`.
    pub fn address(mut self, key: &'static str) -> Self {
        self.metadata.push((key, MetadataSource::Address));
        self
    }

    pub fn tx_hash(mut self, key: &'static str) -> Self {
        self.metadata.push((key, MetadataSource::TxHash));
        self
    }

    pub fn fetched(mut self, key: &'static str) -> Self {
        self.metadata.push((key, MetadataSource::Fetched));
        self
    }

    pub fn literal(mut self, key: &'static str, value: &'static str) -> Self {
        self.metadata.push((key, MetadataSource::Literal(value)));
        self
    }

    pub fn uses_fetched(&self) -> bool {
        self.metadata
            .iter()
            .any(|(_, source)| *source == MetadataSource::Fetched)
    }

    /// Check the schema against the interface it will be rendered from.
    pub fn validate(&self, interface: &InterfaceSpec) -> Result<()> {
        for (key, source) in &self.metadata {
            if let MetadataSource::Field(param) = source
                && !interface.has_param(param)
            {
                return Err(MonitorError::Config(format!(
                    "finding `{}`: metadata `{key}` references unknown parameter `{param}` of {}",
                    self.name,
                    interface.signature()
                )));
            }
        }

        let mut keys: Vec<&str> = self.metadata.iter().map(|(k, _)| *k).collect();
        keys.sort_unstable();
        if let Some(dup) = keys.windows(2).find(|w| w[0] == w[1]) {
            return Err(MonitorError::Config(format!(
                "finding `{}`: duplicate metadata key `{}`",
                self.name, dup[0]
            )));
        }

        Ok(())
    }

    /// Render the finding for one record.
    pub fn build(&self, decoded: &DecodedRecord, fetched: Option<U256>) -> Result<Finding> {
        let mut metadata = BTreeMap::new();

        for (key, source) in &self.metadata {
            let value = match source {
                MetadataSource::Field(param) => decoded
                    .get(param)
                    .ok_or_else(|| {
                        MonitorError::Config(format!(
                            "finding `{}`: `{param}` missing from decoded {}",
                            self.name, decoded.interface
                        ))
                    })?
                    .to_string(),
                MetadataSource::Address => format!("{:#x}", decoded.address),
                MetadataSource::TxHash => format!("{:#x}", decoded.tx_hash),
                MetadataSource::Fetched => fetched
                    .ok_or_else(|| {
                        MonitorError::Config(format!(
                            "finding `{}`: rule fetched no value for `{key}`",
                            self.name
                        ))
                    })?
                    .to_string(),
                MetadataSource::Literal(value) => value.to_string(),
            };
            metadata.insert(key.to_string(), value);
        }

        Ok(Finding {
            name: self.name.to_string(),
            description: interpolate(self.description, &metadata),
            alert_id: self.alert_id.to_string(),
            severity: self.severity,
            finding_type: self.finding_type,
            metadata,
        })
    }
}

/// Replace `{key}` placeholders with metadata values in a single pass.
///
/// Substituted values are copied verbatim and never scanned again. Unknown
/// keys and unmatched braces are left as is.
fn interpolate(template: &str, metadata: &BTreeMap<String, String>) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(open) = rest.find('{') {
        let Some(close) = rest[open..].find('}').map(|i| open + i) else {
            break;
        };
        out.push_str(&rest[..open]);
        match metadata.get(&rest[open + 1..close]) {
            Some(value) => out.push_str(value),
            None => out.push_str(&rest[open..=close]),
        }
        rest = &rest[close + 1..];
    }

    out.push_str(rest);
    out
}
