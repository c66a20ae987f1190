// ==========================================
// 仓库容量与审计引擎 - 校验错误类型
// ==========================================
// 红线: 所有错误必须携带足够上下文 (上限、实际值、对象)
// 工具: thiserror 派生宏
// ==========================================

use crate::domain::types::{EntityKind, SiteId};
use rust_decimal::Decimal;
use thiserror::Error;

/// 校验错误
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// 超出桩位容量: 拒绝保存,不产生任何写入
    #[error(
        "超出容量: 桩位 {picket} 最大容量 {capacity:.3}, 尝试总重 {attempted:.3}, 超出 {overflow:.3}"
    )]
    OverCapacity {
        picket: String,
        capacity: Decimal,
        attempted: Decimal,
        overflow: Decimal,
    },

    /// 桩位与场地不属于同一仓库: 拒绝,桩位场地保持未设置
    #[error(
        "跨仓库挂接: 桩位 {picket} 属于仓库 {picket_warehouse}, 场地属于仓库 {site_warehouse}"
    )]
    CrossWarehouseAssignment {
        picket: String,
        picket_warehouse: String,
        site_warehouse: String,
    },

    /// 锁定字段不可修改
    #[error("字段不可修改: {entity}.{field}")]
    ImmutableField { entity: EntityKind, field: String },

    /// 场地内桩位编号不连续: 场地下全部桩位已被解绑
    #[error("桩位编号不连续或重复: 场地 {site}, 编号 {numbers:?}, 已解绑 {detached} 个桩位")]
    NonContiguousGrouping {
        site: SiteId,
        numbers: Vec<i64>,
        detached: usize,
    },

    #[error("必填字段缺失: {entity}.{field}")]
    RequiredFieldMissing { entity: EntityKind, field: String },

    #[error("唯一性冲突: {entity}.{field} = '{value}'")]
    UniquenessViolation {
        entity: EntityKind,
        field: String,
        value: String,
    },

    #[error("字段值无效: {entity}.{field}: {message}")]
    InvalidValue {
        entity: EntityKind,
        field: String,
        message: String,
    },

    /// 仍被其它对象引用,不可删除
    #[error("仍被引用: {entity} 被 {count} 个 {referenced_by} 引用")]
    StillReferenced {
        entity: EntityKind,
        referenced_by: EntityKind,
        count: usize,
    },
}

/// Result 类型别名
pub type ValidationResult<T> = Result<T, ValidationError>;
