// ==========================================
// 仓库容量与审计引擎 - 变更历史领域模型
// ==========================================
// 红线: 只追加,应用逻辑不更新、不删除
// 红线: 每个逻辑变更恰好一条记录
// 对齐: history_record 表
// ==========================================

use crate::domain::types::{HistoryId, PlacementId, SiteId, WarehouseId};
use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

// ==========================================
// HistoryRecord - 变更历史记录
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryRecord {
    // ===== 主键 =====
    pub id: HistoryId,
    pub timestamp: NaiveDateTime, // 变更时间
    pub action_type: String,      // 操作类型 (存储为字符串)
    pub actor: String,            // 操作人

    // ===== 关联对象 (只保存 ID,被引用对象删除后记录仍保留) =====
    pub site: Option<SiteId>,
    pub warehouse: Option<WarehouseId>,
    pub placement: Option<PlacementId>,

    // ===== 重量 =====
    pub weight_change: Option<Decimal>,        // 本次重量变化
    pub current_total_weight: Option<Decimal>, // 变更后场地总重

    // ===== 描述 =====
    pub detail: String,              // 可读描述
    pub picket_info: Option<String>, // 桩位信息
}

// ==========================================
// HistoryAction - 操作类型
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HistoryAction {
    Add,          // 货物放上桩位
    WeightChange, // 重量修改
    Remove,       // 货物移出桩位
    SiteCreated,  // 新建场地
    SiteRemoved,  // 删除场地
    SiteTransfer, // 场地转移仓库
}

impl HistoryAction {
    /// 转换为字符串 (用于数据库存储)
    pub fn as_str(&self) -> &'static str {
        match self {
            HistoryAction::Add => "add",
            HistoryAction::WeightChange => "weight change",
            HistoryAction::Remove => "remove",
            HistoryAction::SiteCreated => "site created",
            HistoryAction::SiteRemoved => "site removed",
            HistoryAction::SiteTransfer => "site transfer",
        }
    }

    /// 从字符串解析
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "add" => Some(HistoryAction::Add),
            "weight change" => Some(HistoryAction::WeightChange),
            "remove" => Some(HistoryAction::Remove),
            "site created" => Some(HistoryAction::SiteCreated),
            "site removed" => Some(HistoryAction::SiteRemoved),
            "site transfer" => Some(HistoryAction::SiteTransfer),
            _ => None,
        }
    }

    /// 是否为货物落位相关操作
    pub fn is_placement_action(&self) -> bool {
        matches!(
            self,
            HistoryAction::Add | HistoryAction::WeightChange | HistoryAction::Remove
        )
    }
}

impl HistoryRecord {
    /// 创建新的历史记录 (时间戳取当前时间)
    pub fn new(action: HistoryAction, actor: String, detail: String) -> Self {
        Self {
            id: HistoryId::new(),
            timestamp: chrono::Utc::now().naive_utc(),
            action_type: action.as_str().to_string(),
            actor,
            site: None,
            warehouse: None,
            placement: None,
            weight_change: None,
            current_total_weight: None,
            detail,
            picket_info: None,
        }
    }

    /// 设置关联场地与仓库
    pub fn with_site(mut self, site: SiteId, warehouse: Option<WarehouseId>) -> Self {
        self.site = Some(site);
        self.warehouse = warehouse;
        self
    }

    /// 设置来源落位
    pub fn with_placement(mut self, placement: PlacementId) -> Self {
        self.placement = Some(placement);
        self
    }

    /// 设置重量变化与变更后总重
    pub fn with_weights(mut self, weight_change: Decimal, current_total_weight: Decimal) -> Self {
        self.weight_change = Some(weight_change);
        self.current_total_weight = Some(current_total_weight);
        self
    }

    pub fn with_picket_info(mut self, info: String) -> Self {
        self.picket_info = Some(info);
        self
    }

    /// 解析操作类型 (未知类型返回 None)
    pub fn action(&self) -> Option<HistoryAction> {
        HistoryAction::from_str(&self.action_type)
    }
}
