// ==========================================
// 仓库容量与审计引擎 - 桩位领域模型
// ==========================================
// 红线: 桩位仓库必须与其场地仓库一致
// 红线: 完整编号 (full number) 全局唯一
// 说明: 容量为策略常量 (EngineConfig::picket_capacity),不是实例字段
// ==========================================

use crate::domain::types::{PicketId, SiteId, WarehouseId};
use serde::{Deserialize, Serialize};

/// 完整编号中仓库编号与桩位编号之间的分隔符
pub const FULL_NUMBER_SEPARATOR: char = '/';

// ==========================================
// Picket - 桩位
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Picket {
    pub id: PicketId,
    pub warehouse: WarehouseId,  // 所属仓库 (必填)
    pub site: Option<SiteId>,    // 所属场地 (可选)
    pub local_number: String,    // 仓库内编号
}

impl Picket {
    pub fn new(warehouse: WarehouseId, local_number: impl Into<String>) -> Self {
        Self {
            id: PicketId::new(),
            warehouse,
            site: None,
            local_number: local_number.into(),
        }
    }

    /// 仓库内编号解析为整数 (场地编号计算使用)
    pub fn numeric_number(&self) -> Option<i64> {
        self.local_number.trim().parse::<i64>().ok()
    }
}

/// 拼接完整编号: `{仓库编号}/{桩位编号}`
pub fn full_number(warehouse_number: &str, local_number: &str) -> String {
    format!("{}{}{}", warehouse_number, FULL_NUMBER_SEPARATOR, local_number)
}
