#![forbid(unsafe_code)]

use ksv_core::{DepType, HashType};
use serde_json::Value;

// SDK spellings that differ from dataset record names.
const NAME_ALIASES: &[(&str, &str)] = &[
    ("omnilock", "omni_lock"),
    ("dao", "nervos_dao"),
    ("secp256k1_multisig", "secp256k1_blake160_multisig"),
    ("secp256k1_blake160_multisig_all", "secp256k1_blake160_multisig"),
];

/// `Secp256k1Blake160` -> `secp256k1_blake160`, `XUdt` -> `xudt`.
pub(super) fn camel_to_snake(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len() + 4);
    let mut prev: Option<char> = None;
    for ch in raw.chars() {
        if ch.is_ascii_uppercase()
            && prev.is_some_and(|p| p.is_ascii_lowercase() || p.is_ascii_digit())
        {
            out.push('_');
        }
        out.push(ch.to_ascii_lowercase());
        prev = Some(ch);
    }
    out
}

pub(super) fn canonical_script_name(snake: &str) -> String {
    NAME_ALIASES
        .iter()
        .find(|(from, _)| *from == snake)
        .map(|(_, to)| (*to).to_string())
        .unwrap_or_else(|| snake.to_string())
}

/// SDKs already use the on-chain lowercase names; anything else is an SDK
/// bug worth surfacing rather than papering over.
pub(super) fn hash_type(raw: &str) -> Result<HashType, String> {
    raw.parse::<HashType>()
        .map_err(|_| format!("unrecognized hashType {raw:?}"))
}

pub(super) fn dep_type(raw: &str) -> Result<DepType, String> {
    match raw {
        "code" => Ok(DepType::Code),
        "depGroup" | "dep_group" => Ok(DepType::DepGroup),
        other => Err(format!("unrecognized depType {other:?}")),
    }
}

/// Out-point indexes show up as hex strings, decimal strings or JSON numbers.
pub(super) fn index(value: &Value) -> Result<String, String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Ok(s.trim().to_string()),
        Value::Number(n) => n
            .as_u64()
            .map(|n| n.to_string())
            .ok_or_else(|| format!("index {n} is not an unsigned integer")),
        other => Err(format!("unusable index {other}")),
    }
}

pub(super) fn str_field<'a>(obj: &'a Value, key: &str) -> Result<&'a str, String> {
    obj.get(key)
        .and_then(Value::as_str)
        .ok_or_else(|| format!("missing string field {key:?}"))
}
