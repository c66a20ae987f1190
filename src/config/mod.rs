// ==========================================
// 仓库容量与审计引擎 - 配置层
// ==========================================
// 职责: 引擎策略配置 (桩位容量、默认操作人)
// 存储: config_kv 表
// ==========================================

pub mod config_manager;
pub mod engine_config;

// 重导出核心配置
pub use config_manager::{config_keys, ConfigManager};
pub use engine_config::{EngineConfig, DEFAULT_FALLBACK_ACTOR, DEFAULT_PICKET_CAPACITY};
