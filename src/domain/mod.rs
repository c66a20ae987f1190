// ==========================================
// 仓库容量与审计引擎 - 领域模型层
// ==========================================
// 职责: 定义实体、实体标识、实体图
// 红线: 不含数据访问逻辑,不含引擎逻辑
// ==========================================

pub mod graph;
pub mod history;
pub mod picket;
pub mod placement;
pub mod site;
pub mod types;
pub mod warehouse;

// 重导出核心类型
pub use graph::WarehouseGraph;
pub use history::{HistoryAction, HistoryRecord};
pub use picket::{full_number, Picket};
pub use placement::Placement;
pub use site::Site;
pub use types::{
    CargoId, EntityKind, EntityRef, HistoryId, PicketId, PlacementId, SiteId, WarehouseId,
};
pub use warehouse::{Cargo, Warehouse};
