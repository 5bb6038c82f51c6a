//! Column-name standardization for historical bar data.
//!
//! Upstream endpoints label the same field many ways (`day`, `日期`, `dt`).
//! Adapters whose payloads carry named fields rename them through this table
//! so downstream consumers always see the canonical bar schema. The realtime
//! endpoints are positional text formats, so their adapters emit canonical
//! names directly.

use crate::DataTable;

/// Aliases accepted for historical bar columns.
const BAR_ALIASES: &[(&str, &str)] = &[
    ("date", "timestamp"),
    ("day", "timestamp"),
    ("dt", "timestamp"),
    ("time", "timestamp"),
    ("日期", "timestamp"),
    ("时间", "timestamp"),
    ("open", "open"),
    ("开", "open"),
    ("开盘", "open"),
    ("开盘价", "open"),
    ("high", "high"),
    ("高", "high"),
    ("最高", "high"),
    ("最高价", "high"),
    ("low", "low"),
    ("低", "low"),
    ("最低", "low"),
    ("最低价", "low"),
    ("close", "close"),
    ("收", "close"),
    ("收盘", "close"),
    ("收盘价", "close"),
    ("vol", "volume"),
    ("volume", "volume"),
    ("成交", "volume"),
    ("成交量", "volume"),
    ("amount", "amount"),
    ("成交额", "amount"),
];

/// Canonical name for a historical bar column, if the spelling is known.
pub fn canonical_bar_column(name: &str) -> Option<&'static str> {
    let lowered = name.trim().to_lowercase();
    BAR_ALIASES
        .iter()
        .find(|(alias, _)| *alias == lowered)
        .map(|(_, canonical)| *canonical)
}

/// Rename known historical bar columns in place; unknown columns are kept.
pub fn standardize_bar_columns(table: &mut DataTable) {
    table.rename_columns(|name| canonical_bar_column(name));
}
