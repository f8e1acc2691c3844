#![forbid(unsafe_code)]

use crate::model::CellDep;

pub(crate) fn hex_eq(expected: &str, actual: &str) -> bool {
    expected.eq_ignore_ascii_case(actual)
}

/// Parses an out-point index written either as `0x`-prefixed hex or decimal.
pub(crate) fn parse_index(raw: &str) -> Option<u64> {
    let s = raw.trim();
    if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        if hex.is_empty() || !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
            return None;
        }
        return u64::from_str_radix(hex, 16).ok();
    }
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    s.parse::<u64>().ok()
}

pub(crate) fn index_eq(expected: &str, actual: &str) -> bool {
    match (parse_index(expected), parse_index(actual)) {
        (Some(e), Some(a)) => e == a,
        // Unparseable on either side: fall back to the literal text.
        _ => expected == actual,
    }
}

/// Appends one error per differing field per position. Caller guarantees
/// equal lengths.
pub(crate) fn diff_cell_deps(expected: &[CellDep], actual: &[CellDep], errors: &mut Vec<String>) {
    for (i, (e, a)) in expected.iter().zip(actual).enumerate() {
        if e.dep_type != a.dep_type {
            errors.push(format!(
                "CellDep[{i}] depType mismatch: expected {}, got {}",
                e.dep_type, a.dep_type
            ));
        }
        if !hex_eq(&e.out_point.tx_hash, &a.out_point.tx_hash) {
            errors.push(format!(
                "CellDep[{i}] txHash mismatch: expected {}, got {}",
                e.out_point.tx_hash, a.out_point.tx_hash
            ));
        }
        if !index_eq(&e.out_point.index, &a.out_point.index) {
            errors.push(format!(
                "CellDep[{i}] index mismatch: expected {}, got {}",
                e.out_point.index, a.out_point.index
            ));
        }
    }
}
