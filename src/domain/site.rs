// ==========================================
// 仓库容量与审计引擎 - 场地领域模型
// ==========================================
// 红线: 场地所属仓库一经设定不可更改 (新建/加载/删除中除外)
// 说明: 场地编号 (display number) 为派生值,不存储,见 engine::grouping
// ==========================================

use crate::domain::types::{SiteId, WarehouseId};
use serde::{Deserialize, Serialize};

// ==========================================
// Site - 场地
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Site {
    pub id: SiteId,
    /// 所属仓库
    ///
    /// 保存时必填。`None` 只出现在历史遗留数据中 (数据库允许 NULL)。
    pub warehouse: Option<WarehouseId>,
}

impl Site {
    pub fn new(warehouse: WarehouseId) -> Self {
        Self {
            id: SiteId::new(),
            warehouse: Some(warehouse),
        }
    }
}
