// ==========================================
// 仓库容量与审计引擎 - 仓储层错误类型
// ==========================================
// 工具: thiserror 派生宏
// 约束错误由 rusqlite 错误消息分类;变更集落库失败额外携带步骤与实体
// ==========================================

use std::fmt;
use thiserror::Error;

// ==========================================
// FlushStep - 变更集落库步骤
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlushStep {
    DeletePlacement,
    DeletePicket,
    DetachPickets,
    DeleteSite,
    DeleteCargo,
    DeleteWarehouse,
    UpsertWarehouse,
    UpsertCargo,
    UpsertSite,
    UpsertPicket,
    UpsertPlacement,
    AppendHistory,
}

impl FlushStep {
    pub fn as_str(&self) -> &'static str {
        match self {
            FlushStep::DeletePlacement => "delete placement",
            FlushStep::DeletePicket => "delete picket",
            FlushStep::DetachPickets => "detach pickets",
            FlushStep::DeleteSite => "delete site",
            FlushStep::DeleteCargo => "delete cargo",
            FlushStep::DeleteWarehouse => "delete warehouse",
            FlushStep::UpsertWarehouse => "upsert warehouse",
            FlushStep::UpsertCargo => "upsert cargo",
            FlushStep::UpsertSite => "upsert site",
            FlushStep::UpsertPicket => "upsert picket",
            FlushStep::UpsertPlacement => "upsert placement",
            FlushStep::AppendHistory => "append history",
        }
    }
}

impl fmt::Display for FlushStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 仓储层错误类型
#[derive(Error, Debug)]
pub enum RepositoryError {
    // ===== 数据库错误 =====
    #[error("数据库锁获取失败: {0}")]
    LockError(String),

    #[error("数据库查询失败: {0}")]
    DatabaseQueryError(String),

    #[error("唯一约束违反: {0}")]
    UniqueConstraintViolation(String),

    #[error("外键约束违反: {0}")]
    ForeignKeyViolation(String),

    // ===== 落库错误 =====
    #[error("变更集落库失败 ({step}, {entity}): {source}")]
    FlushFailed {
        step: FlushStep,
        entity: String,
        #[source]
        source: Box<RepositoryError>,
    },

    // ===== 配置错误 =====
    #[error("配置值无效 (key={key}): {message}")]
    InvalidConfigValue { key: String, message: String },

    #[error("配置序列化失败: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl RepositoryError {
    /// 包装为落库失败
    pub fn flush(step: FlushStep, entity: impl Into<String>, source: RepositoryError) -> Self {
        RepositoryError::FlushFailed {
            step,
            entity: entity.into(),
            source: Box::new(source),
        }
    }

    /// 去掉落库上下文后的底层错误
    pub fn root_cause(&self) -> &RepositoryError {
        match self {
            RepositoryError::FlushFailed { source, .. } => source.root_cause(),
            other => other,
        }
    }

    /// 失败的落库步骤 (非落库错误为 None)
    pub fn flush_step(&self) -> Option<FlushStep> {
        match self {
            RepositoryError::FlushFailed { step, .. } => Some(*step),
            _ => None,
        }
    }
}

// 实现 From<rusqlite::Error>
impl From<rusqlite::Error> for RepositoryError {
    fn from(err: rusqlite::Error) -> Self {
        match err {
            rusqlite::Error::SqliteFailure(_, Some(msg)) => {
                if msg.contains("UNIQUE") {
                    RepositoryError::UniqueConstraintViolation(msg)
                } else if msg.contains("FOREIGN KEY") {
                    RepositoryError::ForeignKeyViolation(msg)
                } else {
                    RepositoryError::DatabaseQueryError(msg)
                }
            }
            _ => RepositoryError::DatabaseQueryError(err.to_string()),
        }
    }
}

/// Result 类型别名
pub type RepositoryResult<T> = Result<T, RepositoryError>;
