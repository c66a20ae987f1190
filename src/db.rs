// ==========================================
// 仓库容量与审计引擎 - SQLite 连接初始化
// ==========================================
// 目标:
// - 统一所有 Connection::open 的 PRAGMA 行为
// - 统一 busy_timeout,减少并发写入时的偶发 busy 错误
// - 提供建表脚本 (幂等)
// ==========================================

use rusqlite::Connection;
use rusqlite::OptionalExtension;
use std::path::PathBuf;
use std::time::Duration;

/// 默认 busy_timeout(毫秒)
pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

/// 数据库路径环境变量
pub const DB_PATH_ENV: &str = "WAREHOUSE_CAPACITY_DB_PATH";

/// 默认数据库文件名
pub const DEFAULT_DB_FILE: &str = "warehouse_capacity.db";

/// 当前代码所期望的 schema_version
pub const CURRENT_SCHEMA_VERSION: i64 = 1;

/// 建表脚本
///
/// 说明:
/// - 重量/容量以 TEXT 存储,避免浮点误差
/// - history_record 不声明外键: 被引用的场地/落位删除后,历史记录仍须保留
const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS schema_version (
    version INTEGER PRIMARY KEY,
    applied_at TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE TABLE IF NOT EXISTS config_kv (
    scope_id TEXT NOT NULL,
    key TEXT NOT NULL,
    value TEXT NOT NULL,
    updated_at TEXT NOT NULL DEFAULT (datetime('now')),
    PRIMARY KEY (scope_id, key)
);

CREATE TABLE IF NOT EXISTS warehouse (
    warehouse_id TEXT PRIMARY KEY,
    number TEXT NOT NULL UNIQUE
);

CREATE TABLE IF NOT EXISTS cargo (
    cargo_id TEXT PRIMARY KEY,
    name TEXT NOT NULL UNIQUE
);

CREATE TABLE IF NOT EXISTS site (
    site_id TEXT PRIMARY KEY,
    warehouse_id TEXT REFERENCES warehouse(warehouse_id)
);

CREATE TABLE IF NOT EXISTS picket (
    picket_id TEXT PRIMARY KEY,
    warehouse_id TEXT NOT NULL REFERENCES warehouse(warehouse_id),
    site_id TEXT REFERENCES site(site_id),
    local_number TEXT NOT NULL,
    UNIQUE (warehouse_id, local_number)
);

CREATE TABLE IF NOT EXISTS placement (
    placement_id TEXT PRIMARY KEY,
    picket_id TEXT NOT NULL REFERENCES picket(picket_id),
    cargo_id TEXT NOT NULL REFERENCES cargo(cargo_id),
    weight TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS history_record (
    history_id TEXT PRIMARY KEY,
    seq INTEGER NOT NULL,
    changed_at TEXT NOT NULL,
    action_type TEXT NOT NULL,
    actor TEXT NOT NULL,
    site_id TEXT,
    warehouse_id TEXT,
    placement_id TEXT,
    weight_change TEXT,
    current_total_weight TEXT,
    detail TEXT NOT NULL,
    picket_info TEXT
);

CREATE INDEX IF NOT EXISTS idx_history_site ON history_record(site_id);
CREATE INDEX IF NOT EXISTS idx_history_warehouse ON history_record(warehouse_id);
CREATE INDEX IF NOT EXISTS idx_history_placement ON history_record(placement_id);
"#;

/// 配置 SQLite 连接的统一 PRAGMA
///
/// 说明:
/// - foreign_keys 需要"每个连接"单独开启
/// - busy_timeout 需要"每个连接"单独配置
pub fn configure_sqlite_connection(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    conn.busy_timeout(Duration::from_millis(DEFAULT_BUSY_TIMEOUT_MS))?;
    Ok(())
}

/// 打开 SQLite 连接并应用统一配置
pub fn open_sqlite_connection(db_path: &str) -> rusqlite::Result<Connection> {
    let conn = Connection::open(db_path)?;
    configure_sqlite_connection(&conn)?;
    Ok(conn)
}

/// 打开内存数据库 (测试/临时场景)
pub fn open_in_memory_connection() -> rusqlite::Result<Connection> {
    let conn = Connection::open_in_memory()?;
    configure_sqlite_connection(&conn)?;
    Ok(conn)
}

/// 建表并写入 schema_version (幂等)
pub fn init_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(SCHEMA_SQL)?;
    conn.execute(
        "INSERT OR IGNORE INTO schema_version (version) VALUES (?1)",
        [CURRENT_SCHEMA_VERSION],
    )?;
    Ok(())
}

/// 读取 schema_version(若表不存在则返回 None)
pub fn read_schema_version(conn: &Connection) -> rusqlite::Result<Option<i64>> {
    let has_table: bool = conn
        .query_row(
            "SELECT 1 FROM sqlite_master WHERE type='table' AND name='schema_version' LIMIT 1",
            [],
            |_row| Ok(true),
        )
        .optional()?
        .unwrap_or(false);

    if !has_table {
        return Ok(None);
    }

    let v: Option<i64> =
        conn.query_row("SELECT MAX(version) FROM schema_version", [], |row| row.get(0))?;
    Ok(v)
}

/// 默认数据库路径
///
/// 优先使用环境变量 `WAREHOUSE_CAPACITY_DB_PATH`;否则放在用户数据目录下,
/// 拿不到数据目录时回退到当前目录。
pub fn default_db_path() -> String {
    if let Ok(path) = std::env::var(DB_PATH_ENV) {
        let trimmed = path.trim();
        if !trimmed.is_empty() {
            return trimmed.to_string();
        }
    }

    let mut path = PathBuf::from(DEFAULT_DB_FILE);
    if let Some(data_dir) = dirs::data_dir() {
        let dir = data_dir.join("warehouse-capacity");
        // 目录创建失败时交给打开数据库时报错
        std::fs::create_dir_all(&dir).ok();
        path = dir.join(DEFAULT_DB_FILE);
    }
    path.to_string_lossy().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_db_path() {
        let path = default_db_path();
        assert!(path.ends_with(".db"));
    }

    #[test]
    fn test_init_schema_is_idempotent() {
        let conn = open_in_memory_connection().unwrap();
        assert_eq!(read_schema_version(&conn).unwrap(), None);

        init_schema(&conn).unwrap();
        init_schema(&conn).unwrap();

        assert_eq!(read_schema_version(&conn).unwrap(), Some(CURRENT_SCHEMA_VERSION));
    }
}
