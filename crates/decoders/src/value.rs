use alloy::dyn_abi::DynSolValue;
use alloy::primitives::{Address, Bytes, I256, U256};

/// A decoded ABI value.
///
/// Integers are kept at full 256-bit width so threshold comparisons never
/// truncate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    Address(Address),
    Uint(U256),
    Int(I256),
    Bool(bool),
    Bytes(Bytes),
    String(String),
    List(Vec<Value>),
}

impl Value {
    pub fn as_uint(&self) -> Option<U256> {
        match self {
            Value::Uint(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_address(&self) -> Option<Address> {
        match self {
            Value::Address(a) => Some(*a),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Whether the value is numerically zero (signed or unsigned).
    pub fn is_zero(&self) -> bool {
        match self {
            Value::Uint(v) => v.is_zero(),
            Value::Int(v) => v.is_zero(),
            _ => false,
        }
    }

    /// Length in bytes for byte and string values, element count for lists.
    pub fn len(&self) -> Option<usize> {
        match self {
            Value::Bytes(b) => Some(b.len()),
            Value::String(s) => Some(s.len()),
            Value::List(items) => Some(items.len()),
            _ => None,
        }
    }
}

/// Canonical string form used in finding metadata: base-10 integers,
/// lowercase `0x` hex for addresses and bytes.
impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Address(a) => write!(f, "{:#x}", a),
            Value::Uint(v) => write!(f, "{}", v),
            Value::Int(v) => write!(f, "{}", v),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Bytes(b) => write!(f, "0x{}", alloy::hex::encode(b.as_ref())),
            Value::String(s) => f.write_str(s),
            Value::List(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(",")?;
                    }
                    write!(f, "{}", item)?;
                }
                f.write_str("]")
            }
        }
    }
}

impl From<DynSolValue> for Value {
    fn from(value: DynSolValue) -> Self {
        match value {
            DynSolValue::Address(a) => Value::Address(a),
            DynSolValue::Uint(v, _) => Value::Uint(v),
            DynSolValue::Int(v, _) => Value::Int(v),
            DynSolValue::Bool(b) => Value::Bool(b),
            DynSolValue::FixedBytes(word, size) => {
                Value::Bytes(Bytes::copy_from_slice(&word.as_slice()[..size]))
            }
            DynSolValue::Bytes(b) => Value::Bytes(Bytes::from(b)),
            DynSolValue::String(s) => Value::String(s),
            DynSolValue::Array(items)
            | DynSolValue::FixedArray(items)
            | DynSolValue::Tuple(items) => Value::List(items.into_iter().map(Value::from).collect()),
            other => Value::Bytes(Bytes::from(other.abi_encode())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uint_display_is_plain_base10() {
        let big = U256::from(10u64).pow(U256::from(30u64));
        assert_eq!(Value::Uint(big).to_string(), "1000000000000000000000000000000");
        assert_eq!(Value::Uint(U256::ZERO).to_string(), "0");
    }

    #[test]
    fn test_address_display_lowercase_prefixed() {
        let value = Value::Address(Address::repeat_byte(0xAB));
        assert_eq!(value.to_string(), format!("0x{}", "ab".repeat(20)));
    }

    #[test]
    fn test_bytes_and_list_display() {
        assert_eq!(Value::Bytes(Bytes::from(vec![0xde, 0xad])).to_string(), "0xdead");
        assert_eq!(Value::Bytes(Bytes::new()).to_string(), "0x");
        let list = Value::List(vec![Value::Bool(true), Value::Uint(U256::from(7))]);
        assert_eq!(list.to_string(), "[true,7]");
    }

    #[test]
    fn test_fixed_bytes_truncated_to_size() {
        let value = Value::from(DynSolValue::FixedBytes(alloy::primitives::B256::repeat_byte(0x11), 4));
        assert_eq!(value, Value::Bytes(Bytes::from(vec![0x11; 4])));
    }

    #[test]
    fn test_is_zero() {
        assert!(Value::Uint(U256::ZERO).is_zero());
        assert!(!Value::Uint(U256::from(1)).is_zero());
        assert!(!Value::Bool(false).is_zero());
    }
}
