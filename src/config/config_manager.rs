// ==========================================
// 仓库容量与审计引擎 - 配置管理器
// ==========================================
// 职责: 配置加载、查询、覆写
// 存储: config_kv 表 (key-value + scope)
// ==========================================

use crate::config::engine_config::EngineConfig;
use crate::db::open_sqlite_connection;
use crate::repository::error::{RepositoryError, RepositoryResult};
use rusqlite::{params, Connection, OptionalExtension};
use rust_decimal::Decimal;
use serde_json::json;
use std::collections::BTreeMap;
use std::str::FromStr;
use std::sync::{Arc, Mutex};

/// 配置键
pub mod config_keys {
    pub const PICKET_CAPACITY: &str = "picket_capacity";
    pub const FALLBACK_ACTOR: &str = "fallback_actor";
}

const GLOBAL_SCOPE: &str = "global";

// ==========================================
// ConfigManager - 配置管理器
// ==========================================
pub struct ConfigManager {
    conn: Arc<Mutex<Connection>>,
}

impl ConfigManager {
    /// 创建新的 ConfigManager 实例
    ///
    /// # 参数
    /// - db_path: 数据库文件路径
    pub fn new(db_path: &str) -> RepositoryResult<Self> {
        let conn = open_sqlite_connection(db_path)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// 从已有连接创建 ConfigManager
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 从 config_kv 表读取配置值(scope_id='global')
    ///
    /// # 返回
    /// - Some(String): 配置值
    /// - None: 配置不存在
    pub fn get_global_config_value(&self, key: &str) -> RepositoryResult<Option<String>> {
        let conn = self.get_conn()?;
        let value = conn
            .query_row(
                "SELECT value FROM config_kv WHERE scope_id = ?1 AND key = ?2",
                params![GLOBAL_SCOPE, key],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        Ok(value)
    }

    /// 写入配置值(存在则覆盖)
    pub fn set_global_config_value(&self, key: &str, value: &str) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            "INSERT INTO config_kv (scope_id, key, value) VALUES (?1, ?2, ?3)
             ON CONFLICT(scope_id, key) DO UPDATE SET value = ?3, updated_at = datetime('now')",
            params![GLOBAL_SCOPE, key, value],
        )?;
        Ok(())
    }

    /// 加载引擎配置,缺失的键使用默认值
    ///
    /// # 错误
    /// - picket_capacity 不是合法小数或为负数: InvalidConfigValue
    pub fn load_engine_config(&self) -> RepositoryResult<EngineConfig> {
        let mut config = EngineConfig::default();

        if let Some(raw) = self.get_global_config_value(config_keys::PICKET_CAPACITY)? {
            let capacity = Decimal::from_str(raw.trim()).map_err(|e| {
                RepositoryError::InvalidConfigValue {
                    key: config_keys::PICKET_CAPACITY.to_string(),
                    message: format!("无法解析 '{}': {}", raw, e),
                }
            })?;
            if capacity.is_sign_negative() {
                return Err(RepositoryError::InvalidConfigValue {
                    key: config_keys::PICKET_CAPACITY.to_string(),
                    message: format!("容量不能为负数: {}", capacity),
                });
            }
            config.picket_capacity = capacity;
        }

        if let Some(actor) = self.get_global_config_value(config_keys::FALLBACK_ACTOR)? {
            if !actor.trim().is_empty() {
                config.fallback_actor = actor.trim().to_string();
            }
        }

        Ok(config)
    }

    /// 保存引擎配置
    pub fn save_engine_config(&self, config: &EngineConfig) -> RepositoryResult<()> {
        self.set_global_config_value(
            config_keys::PICKET_CAPACITY,
            &config.picket_capacity.to_string(),
        )?;
        self.set_global_config_value(config_keys::FALLBACK_ACTOR, &config.fallback_actor)?;
        Ok(())
    }

    /// 获取所有配置的快照(JSON格式)
    pub fn get_config_snapshot(&self) -> RepositoryResult<String> {
        let conn = self.get_conn()?;
        let mut stmt =
            conn.prepare("SELECT key, value FROM config_kv WHERE scope_id = ?1 ORDER BY key")?;

        let rows = stmt.query_map(params![GLOBAL_SCOPE], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;

        let mut config_map: BTreeMap<String, String> = BTreeMap::new();
        for row in rows {
            let (key, value) = row?;
            config_map.insert(key, value);
        }

        Ok(serde_json::to_string(&json!(config_map))?)
    }
}
