//! Small collection contracts shared across the configuration model
//!
//! Name lists keep insertion order and never hold the same value twice.
//! Status-code maps hold one such list per code, created on first insert.

use crate::errors::{Error, Result};

use std::collections::BTreeMap;
use std::ops::Range;

/// Status code → ordered, duplicate-free list of paths or targets
pub type CodeMap = BTreeMap<u16, Vec<String>>;

/// Append `value` to `list` unless it is already there.
///
/// Returns `true` if the list changed.
pub fn insert_unique(list: &mut Vec<String>, value: &str) -> bool {
    if list.iter().any(|v| v == value) {
        return false;
    }
    list.push(value.to_owned());
    true
}

/// Remove the first entry equal to `value`, if any.
pub fn remove_first(list: &mut Vec<String>, value: &str) -> bool {
    match list.iter().position(|v| v == value) {
        Some(pos) => {
            list.remove(pos);
            true
        }
        None => false,
    }
}

/// Add `value` to the list for `code`, creating the list for a new code.
pub fn insert_code(map: &mut CodeMap, code: u16, value: &str) -> bool {
    insert_unique(map.entry(code).or_default(), value)
}

/// Remove `value` from the list for `code`. Missing codes are a no-op.
pub fn remove_code_value(map: &mut CodeMap, code: u16, value: &str) -> bool {
    match map.get_mut(&code) {
        Some(list) => remove_first(list, value),
        None => false,
    }
}

/// Make sure `range` can be drained from a sequence of length `len`.
pub fn check_range(range: &Range<usize>, len: usize) -> Result<()> {
    if range.start > range.end || range.end > len {
        return Err(Error::RangeOutOfBounds {
            start: range.start,
            end: range.end,
            len,
        });
    }
    Ok(())
}
