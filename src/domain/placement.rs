// ==========================================
// 仓库容量与审计引擎 - 货物落位领域模型
// ==========================================
// 红线: 同一桩位上所有落位重量之和 <= 桩位容量 (提交后任意时刻)
// ==========================================

use crate::domain::types::{CargoId, PicketId, PlacementId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

// ==========================================
// Placement - 货物落位 (货物放在某个桩位上)
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Placement {
    pub id: PlacementId,
    pub picket: PicketId, // 所在桩位
    pub cargo: CargoId,   // 货物
    pub weight: Decimal,  // 重量 (>= 0)
}

impl Placement {
    pub fn new(picket: PicketId, cargo: CargoId, weight: Decimal) -> Self {
        Self {
            id: PlacementId::new(),
            picket,
            cargo,
            weight,
        }
    }
}
