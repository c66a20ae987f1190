// ==========================================
// 仓库容量与审计引擎 - 引擎策略配置
// ==========================================
// 说明: 桩位容量是全局策略常量,不是桩位的可写字段
// ==========================================

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

/// 默认桩位容量
pub const DEFAULT_PICKET_CAPACITY: Decimal = dec!(5000);

/// 取不到当前操作人时记录的名字
pub const DEFAULT_FALLBACK_ACTOR: &str = "System";

// ==========================================
// EngineConfig - 引擎配置
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    pub picket_capacity: Decimal, // 每个桩位的容量
    pub fallback_actor: String,   // 默认操作人
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            picket_capacity: DEFAULT_PICKET_CAPACITY,
            fallback_actor: DEFAULT_FALLBACK_ACTOR.to_string(),
        }
    }
}

impl EngineConfig {
    pub fn with_picket_capacity(mut self, capacity: Decimal) -> Self {
        self.picket_capacity = capacity;
        self
    }

    pub fn with_fallback_actor(mut self, actor: impl Into<String>) -> Self {
        self.fallback_actor = actor.into();
        self
    }
}
