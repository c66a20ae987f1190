// ==========================================
// 仓库容量与审计引擎 - 列值编解码
// ==========================================
// 说明: ID 以 UUID 文本存储;重量以小数文本存储
// ==========================================

use rusqlite::types::Type;
use rusqlite::Row;
use rust_decimal::Decimal;
use std::str::FromStr;
use uuid::Uuid;

fn conversion_error<E>(idx: usize, err: E) -> rusqlite::Error
where
    E: std::error::Error + Send + Sync + 'static,
{
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(err))
}

/// 读取 UUID 列
pub fn get_uuid(row: &Row<'_>, idx: usize) -> rusqlite::Result<Uuid> {
    let raw: String = row.get(idx)?;
    Uuid::parse_str(&raw).map_err(|e| conversion_error(idx, e))
}

/// 读取可空 UUID 列
pub fn get_opt_uuid(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<Uuid>> {
    let raw: Option<String> = row.get(idx)?;
    raw.map(|s| Uuid::parse_str(&s).map_err(|e| conversion_error(idx, e)))
        .transpose()
}

/// 读取小数列
pub fn get_decimal(row: &Row<'_>, idx: usize) -> rusqlite::Result<Decimal> {
    let raw: String = row.get(idx)?;
    Decimal::from_str(&raw).map_err(|e| conversion_error(idx, e))
}

/// 读取可空小数列
pub fn get_opt_decimal(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<Decimal>> {
    let raw: Option<String> = row.get(idx)?;
    raw.map(|s| Decimal::from_str(&s).map_err(|e| conversion_error(idx, e)))
        .transpose()
}

/// 小数写入文本
pub fn decimal_text(value: Decimal) -> String {
    value.normalize().to_string()
}
