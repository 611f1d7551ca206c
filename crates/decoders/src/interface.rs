use alloy::dyn_abi::{DynSolType, Specifier};
use alloy::json_abi::{Event, Function};
use alloy::primitives::{B256, Selector};

use chainwatch_common::error::{MonitorError, Result};

/// What a record must carry to be recognised by an interface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InterfaceKind {
    /// Event log, recognised by topic0.
    Event { topic0: B256 },
    /// Contract call, recognised by the 4-byte selector.
    Function { selector: Selector },
}

/// A single declared parameter of an interface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParamSpec {
    pub name: String,
    pub ty: DynSolType,
    /// Only meaningful for events.
    pub indexed: bool,
}

/// Typed description of an event or function used to recognise and decode
/// matching records.
///
/// Built from a human-readable Solidity declaration:
///
/// ```
/// use chainwatch_decoders::InterfaceSpec;
///
/// let transfer = InterfaceSpec::event(
///     "event Transfer(address indexed from, address indexed to, uint256 amount)",
/// ).unwrap();
/// assert_eq!(transfer.signature(), "Transfer(address,address,uint256)");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterfaceSpec {
    name: String,
    signature: String,
    kind: InterfaceKind,
    params: Vec<ParamSpec>,
}

impl InterfaceSpec {
    /// Parse an event declaration such as
    /// `event Kill(uint256 indexed id, address owner)`.
    ///
    /// Anonymous events and unnamed parameters are rejected: every decoded
    /// field has to be addressable by name.
    pub fn event(declaration: &str) -> Result<Self> {
        let event = Event::parse(declaration)
            .map_err(|e| MonitorError::Config(format!("invalid event `{declaration}`: {e}")))?;

        if event.anonymous {
            return Err(MonitorError::Config(format!(
                "anonymous event `{}` has no topic0 to match on",
                event.name
            )));
        }

        let params = event
            .inputs
            .iter()
            .map(|input| {
                let ty = input.resolve().map_err(|e| {
                    MonitorError::Config(format!("event {}: bad type {}: {e}", event.name, input.ty))
                })?;
                Ok(ParamSpec {
                    name: input.name.clone(),
                    ty,
                    indexed: input.indexed,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Self::checked(
            event.name.clone(),
            event.signature(),
            InterfaceKind::Event {
                topic0: event.selector(),
            },
            params,
        )
    }

    /// Parse a function declaration such as
    /// `function set(uint256 _pid, uint256 _allocPoint, bool _withUpdate)`.
    pub fn function(declaration: &str) -> Result<Self> {
        let function = Function::parse(declaration)
            .map_err(|e| MonitorError::Config(format!("invalid function `{declaration}`: {e}")))?;

        let params = function
            .inputs
            .iter()
            .map(|input| {
                let ty = input.resolve().map_err(|e| {
                    MonitorError::Config(format!(
                        "function {}: bad type {}: {e}",
                        function.name, input.ty
                    ))
                })?;
                Ok(ParamSpec {
                    name: input.name.clone(),
                    ty,
                    indexed: false,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Self::checked(
            function.name.clone(),
            function.signature(),
            InterfaceKind::Function {
                selector: function.selector(),
            },
            params,
        )
    }

    fn checked(
        name: String,
        signature: String,
        kind: InterfaceKind,
        params: Vec<ParamSpec>,
    ) -> Result<Self> {
        for (i, param) in params.iter().enumerate() {
            if param.name.is_empty() {
                return Err(MonitorError::Config(format!(
                    "{signature}: parameter {i} is unnamed"
                )));
            }
            if params[..i].iter().any(|p| p.name == param.name) {
                return Err(MonitorError::Config(format!(
                    "{signature}: duplicate parameter `{}`",
                    param.name
                )));
            }
        }

        Ok(Self {
            name,
            signature,
            kind,
            params,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Canonical signature, e.g. `Kill(uint256,address,address,uint256,uint256,uint256,uint256)`.
    pub fn signature(&self) -> &str {
        &self.signature
    }

    pub fn kind(&self) -> InterfaceKind {
        self.kind
    }

    pub fn params(&self) -> &[ParamSpec] {
        &self.params
    }

    /// Whether a parameter with this name is declared.
    pub fn has_param(&self, name: &str) -> bool {
        self.params.iter().any(|p| p.name == name)
    }

    pub fn param(&self, name: &str) -> Option<&ParamSpec> {
        self.params.iter().find(|p| p.name == name)
    }

    pub fn is_event(&self) -> bool {
        matches!(self.kind, InterfaceKind::Event { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::keccak256;

    #[test]
    fn test_event_topic0_matches_keccak_of_signature() {
        let spec = InterfaceSpec::event(
            "event Transfer(address indexed from, address indexed to, uint256 amount)",
        )
        .unwrap();

        assert_eq!(spec.name(), "Transfer");
        assert_eq!(
            spec.kind(),
            InterfaceKind::Event {
                topic0: keccak256("Transfer(address,address,uint256)")
            }
        );
        assert_eq!(spec.params().iter().filter(|p| p.indexed).count(), 2);
    }

    #[test]
    fn test_function_selector() {
        let spec = InterfaceSpec::function(
            "function swap(uint256 amount0Out, uint256 amount1Out, address to, bytes data)",
        )
        .unwrap();

        // swap(uint256,uint256,address,bytes) => 0x022c0d9f
        assert_eq!(
            spec.kind(),
            InterfaceKind::Function {
                selector: Selector::from([0x02, 0x2c, 0x0d, 0x9f])
            }
        );
        assert_eq!(spec.params()[3].ty, DynSolType::Bytes);
    }

    #[test]
    fn test_unnamed_parameter_rejected() {
        let err = InterfaceSpec::event("event Ping(uint256)").unwrap_err();
        assert!(matches!(err, MonitorError::Config(_)));
    }

    #[test]
    fn test_garbage_declaration_rejected() {
        assert!(InterfaceSpec::function("not a function").is_err());
    }
}
