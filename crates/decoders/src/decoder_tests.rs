//! Tests for log and call decoding and `InterfaceSet` routing.
//!
//! Logs are built the way the EVM lays them out: topic0 is the event hash,
//! indexed value types are left-padded words, and the body is the ABI
//! encoding of the non-indexed parameters.

use alloy::primitives::{Address, B256, Bytes, U256, keccak256};
use alloy::sol_types::SolValue;

use chainwatch_common::error::MonitorError;
use chainwatch_common::types::{LogEntry, TransactionEvent};

use crate::{InterfaceSet, InterfaceSpec, RecordContext, RecordSource, Value};

// ───────────────────────────── helpers ──────────────────────────────

const KILL: &str = "event Kill(uint256 indexed id, address indexed killer, address owner, uint256 posVal, uint256 debt, uint256 prize, uint256 left)";
const SWAP: &str = "function swap(uint256 amount0Out, uint256 amount1Out, address to, bytes data)";

const VAULT: Address = Address::repeat_byte(0x43);
const OTHER: Address = Address::repeat_byte(0x11);

fn address_to_topic(addr: Address) -> B256 {
    addr.into_word()
}

fn u256_topic(val: u64) -> B256 {
    B256::from(U256::from(val).to_be_bytes::<32>())
}

fn ctx() -> RecordContext {
    RecordContext {
        tx_hash: B256::repeat_byte(0x01),
        block_number: 42_000,
    }
}

fn kill_log(address: Address, left: U256) -> LogEntry {
    let owner = Address::repeat_byte(0x02);
    let data = (
        owner,
        U256::from(100_000u64),
        U256::from(10_000u64),
        U256::from(5_000u64),
        left,
    )
        .abi_encode_params();

    LogEntry {
        address,
        topics: vec![
            keccak256("Kill(uint256,address,address,uint256,uint256,uint256,uint256)"),
            u256_topic(1),
            address_to_topic(Address::repeat_byte(0x01)),
        ],
        data: Bytes::from(data),
        log_index: Some(3),
    }
}

fn swap_input(data: Vec<u8>) -> Bytes {
    let mut input = vec![0x02, 0x2c, 0x0d, 0x9f];
    input.extend(
        (
            U256::from(7u64),
            U256::ZERO,
            Address::repeat_byte(0x99),
            Bytes::from(data),
        )
            .abi_encode_params(),
    );
    Bytes::from(input)
}

// ═══════════════════════════════════════════════════════════════════
//  Event logs
// ═══════════════════════════════════════════════════════════════════

#[test]
fn test_kill_log_decodes_every_parameter() {
    let spec = InterfaceSpec::event(KILL).unwrap();
    let record = spec
        .decode_log(&kill_log(VAULT, U256::from(85_000u64)), &[VAULT], ctx())
        .unwrap()
        .expect("log should match");

    assert_eq!(record.interface, "Kill");
    assert_eq!(record.address, VAULT);
    assert_eq!(record.source, RecordSource::Log { log_index: Some(3) });
    assert_eq!(record.block_number, 42_000);

    assert_eq!(record.uint("id"), Some(U256::from(1)));
    assert_eq!(record.address("killer"), Some(Address::repeat_byte(0x01)));
    assert_eq!(record.address("owner"), Some(Address::repeat_byte(0x02)));
    assert_eq!(record.uint("posVal"), Some(U256::from(100_000u64)));
    assert_eq!(record.uint("debt"), Some(U256::from(10_000u64)));
    assert_eq!(record.uint("prize"), Some(U256::from(5_000u64)));
    assert_eq!(record.uint("left"), Some(U256::from(85_000u64)));

    // Declaration order is preserved
    let names: Vec<&str> = record.fields().iter().map(|(n, _)| n.as_str()).collect();
    assert_eq!(names, ["id", "killer", "owner", "posVal", "debt", "prize", "left"]);
}

#[test]
fn test_values_beyond_u128_are_not_truncated() {
    let spec = InterfaceSpec::event(KILL).unwrap();
    let huge = U256::MAX - U256::from(1);
    let record = spec
        .decode_log(&kill_log(VAULT, huge), &[VAULT], ctx())
        .unwrap()
        .unwrap();
    assert_eq!(record.uint("left"), Some(huge));
}

#[test]
fn test_log_from_other_address_is_no_match() {
    let spec = InterfaceSpec::event(KILL).unwrap();
    let result = spec
        .decode_log(&kill_log(OTHER, U256::ZERO), &[VAULT], ctx())
        .unwrap();
    assert!(result.is_none());
}

#[test]
fn test_log_with_other_topic0_is_no_match() {
    let spec = InterfaceSpec::event(KILL).unwrap();
    let mut log = kill_log(VAULT, U256::ZERO);
    log.topics[0] = keccak256("badSig");
    assert!(spec.decode_log(&log, &[VAULT], ctx()).unwrap().is_none());
}

#[test]
fn test_log_without_topics_is_no_match() {
    let spec = InterfaceSpec::event(KILL).unwrap();
    let mut log = kill_log(VAULT, U256::ZERO);
    log.topics.clear();
    assert!(spec.decode_log(&log, &[VAULT], ctx()).unwrap().is_none());
}

#[test]
fn test_truncated_body_is_decode_error() {
    let spec = InterfaceSpec::event(KILL).unwrap();
    let mut log = kill_log(VAULT, U256::ZERO);
    log.data = Bytes::from(log.data[..64].to_vec());

    let err = spec.decode_log(&log, &[VAULT], ctx()).unwrap_err();
    assert!(matches!(err, MonitorError::Decode { ref interface, .. } if interface == "Kill"));
}

#[test]
fn test_wrong_topic_count_is_decode_error() {
    let spec = InterfaceSpec::event(KILL).unwrap();
    let mut log = kill_log(VAULT, U256::ZERO);
    log.topics.pop();
    assert!(spec.decode_log(&log, &[VAULT], ctx()).is_err());
}

#[test]
fn test_indexed_dynamic_param_keeps_topic_hash() {
    let spec = InterfaceSpec::event("event Named(string indexed label, uint256 value)").unwrap();
    let hash = keccak256("hello");
    let log = LogEntry {
        address: VAULT,
        topics: vec![keccak256("Named(string,uint256)"), hash],
        data: Bytes::from(U256::from(5u64).abi_encode()),
        log_index: None,
    };

    let record = spec.decode_log(&log, &[VAULT], ctx()).unwrap().unwrap();
    assert_eq!(
        record.get("label"),
        Some(&Value::Bytes(Bytes::copy_from_slice(hash.as_slice())))
    );
    assert_eq!(record.uint("value"), Some(U256::from(5u64)));
}

#[test]
fn test_address_set_membership() {
    let spec = InterfaceSpec::event(KILL).unwrap();
    let log = kill_log(OTHER, U256::ZERO);
    assert!(spec.decode_log(&log, &[VAULT, OTHER], ctx()).unwrap().is_some());
}

// ═══════════════════════════════════════════════════════════════════
//  Function calls
// ═══════════════════════════════════════════════════════════════════

#[test]
fn test_swap_call_decodes_bytes_payload() {
    let spec = InterfaceSpec::function(SWAP).unwrap();
    let call = chainwatch_common::types::FunctionCall {
        to: VAULT,
        input: swap_input(vec![0xaa, 0xbb]),
    };

    let record = spec.decode_call(&call, 0, &[VAULT], ctx()).unwrap().unwrap();
    assert_eq!(record.source, RecordSource::Call { call_index: 0 });
    assert_eq!(record.uint("amount0Out"), Some(U256::from(7u64)));
    assert_eq!(record.uint("amount1Out"), Some(U256::ZERO));
    assert_eq!(record.address("to"), Some(Address::repeat_byte(0x99)));
    assert_eq!(record.get("data").and_then(Value::len), Some(2));
}

#[test]
fn test_call_with_short_input_is_no_match() {
    let spec = InterfaceSpec::function(SWAP).unwrap();
    let call = chainwatch_common::types::FunctionCall {
        to: VAULT,
        input: Bytes::from(vec![0x02, 0x2c]),
    };
    assert!(spec.decode_call(&call, 0, &[VAULT], ctx()).unwrap().is_none());
}

#[test]
fn test_call_with_matching_selector_but_garbage_args_fails() {
    let spec = InterfaceSpec::function(SWAP).unwrap();
    let call = chainwatch_common::types::FunctionCall {
        to: VAULT,
        input: Bytes::from(vec![0x02, 0x2c, 0x0d, 0x9f, 0x00]),
    };
    assert!(spec.decode_call(&call, 0, &[VAULT], ctx()).is_err());
}

// ═══════════════════════════════════════════════════════════════════
//  InterfaceSet
// ═══════════════════════════════════════════════════════════════════

#[test]
fn test_set_preserves_record_order_and_isolates_failures() {
    let set = InterfaceSet::new(vec![
        InterfaceSpec::event(KILL).unwrap(),
        InterfaceSpec::function(SWAP).unwrap(),
    ]);

    let mut broken = kill_log(VAULT, U256::ZERO);
    broken.data = Bytes::new();

    let mut tx = TransactionEvent::new(B256::repeat_byte(0x05), 7, OTHER, Some(VAULT));
    tx.logs.push(kill_log(VAULT, U256::from(1)));
    tx.logs.push(kill_log(OTHER, U256::from(2)));
    tx.logs.push(broken);
    tx.logs.push(kill_log(VAULT, U256::from(4)));
    tx = tx.with_call(VAULT, swap_input(vec![]));

    let out = set.decode_transaction(&tx, &[VAULT]);
    assert_eq!(out.len(), 4);
    assert_eq!(out[0].as_ref().unwrap().uint("left"), Some(U256::from(1)));
    assert!(out[1].is_err());
    assert_eq!(out[2].as_ref().unwrap().uint("left"), Some(U256::from(4)));
    assert_eq!(out[3].as_ref().unwrap().interface, "swap");
    assert_eq!(out[3].as_ref().unwrap().tx_hash, B256::repeat_byte(0x05));
}

#[test]
fn test_set_lookup_by_name() {
    let set = InterfaceSet::new(vec![InterfaceSpec::function(SWAP).unwrap()]);
    assert!(set.get("swap").is_some());
    assert!(set.get("Kill").is_none());
    assert!(!set.is_empty());
}
