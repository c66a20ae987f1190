// ==========================================
// 仓库容量与审计引擎 - 仓库 / 货物领域模型
// ==========================================
// 红线: 仓库编号、货物名称必填且唯一 (保存时校验)
// ==========================================

use crate::domain::types::{CargoId, WarehouseId};
use serde::{Deserialize, Serialize};

// ==========================================
// Warehouse - 仓库
// ==========================================
// 拥有: 场地 (Site)、桩位 (Picket)、历史记录
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Warehouse {
    pub id: WarehouseId,
    pub number: String, // 仓库编号 (唯一)
}

impl Warehouse {
    pub fn new(number: impl Into<String>) -> Self {
        Self {
            id: WarehouseId::new(),
            number: number.into(),
        }
    }
}

// ==========================================
// Cargo - 货物
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cargo {
    pub id: CargoId,
    pub name: String, // 货物名称 (唯一)
}

impl Cargo {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: CargoId::new(),
            name: name.into(),
        }
    }
}
