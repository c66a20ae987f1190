// ==========================================
// 仓库容量与审计引擎 - 核心库
// ==========================================
// 层级: 仓库 -> 场地 -> 桩位 -> 货物落位
// 职责: 容量校验、层级一致性、场地编号连续性、变更审计
// 技术栈: Rust + SQLite
// ==========================================

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 实体与类型
pub mod domain;

// 引擎层 - 聚合、校验、守卫、审计
pub mod engine;

// 数据访问层 - 工作单元、会话、存储
pub mod store;

// 数据仓储层 - SQLite 持久化
pub mod repository;

// 配置层
pub mod config;

// 数据库基础设施(连接初始化/PRAGMA/建表)
pub mod db;

// 日志系统
pub mod logging;

// 报表
pub mod report;

// ==========================================
// 重导出核心类型
// ==========================================

pub use config::{ConfigManager, EngineConfig};
pub use domain::{
    Cargo, CargoId, EntityKind, EntityRef, HistoryAction, HistoryRecord, Picket, PicketId,
    Placement, PlacementId, Site, SiteId, Warehouse, WarehouseGraph, WarehouseId,
};
pub use engine::{
    ActorProvider, ConsistencyEngine, EngineStatsSnapshot, FixedActor, SaveHooks, SessionView,
    SystemActor, TxContext, ValidationError,
};
pub use report::{ReportPolicy, WarehouseReport};
pub use store::{Session, Store, StoreError, StoreResult};

// ==========================================
// 常量定义
// ==========================================

// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// 系统名称
pub const APP_NAME: &str = "warehouse-capacity";
