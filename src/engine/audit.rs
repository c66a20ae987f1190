// ==========================================
// 仓库容量与审计引擎 - 审计记录器
// ==========================================
// 红线: 每个逻辑变更恰好一条历史记录
// 规则:
// - 新建落位: "add",      重量变化 = 重量
// - 修改落位: "weight change", 重量变化 = 新重量 - 上次持久化重量
// - 删除落位: "remove",   重量变化 = -重量
// - 落位没有桩位或桩位没有场地: 无可归属对象,不记录 (不是错误)
// - 场地新建 / 删除 / 转移仓库: 各记录一条
// ==========================================

use crate::domain::history::{HistoryAction, HistoryRecord};
use crate::domain::types::{HistoryId, PicketId, PlacementId, SiteId};
use crate::engine::aggregation::site_weight;
use crate::engine::grouping::display_number;
use crate::engine::view::{SessionView, SessionWriter};
use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::{debug, info};

// ==========================================
// ActorProvider - 当前操作人
// ==========================================
pub trait ActorProvider: Send + Sync {
    /// 当前操作人 (不可用时返回 None)
    fn current_actor(&self) -> Option<String>;
}

/// 没有用户身份的场景 (批处理、服务)
#[derive(Debug, Clone, Default)]
pub struct SystemActor;

impl ActorProvider for SystemActor {
    fn current_actor(&self) -> Option<String> {
        None
    }
}

/// 固定操作人
#[derive(Debug, Clone)]
pub struct FixedActor(pub String);

impl ActorProvider for FixedActor {
    fn current_actor(&self) -> Option<String> {
        Some(self.0.clone())
    }
}

// ==========================================
// AuditRecorder - 审计记录器
// ==========================================
#[derive(Clone)]
pub struct AuditRecorder {
    actor: Arc<dyn ActorProvider>,
    fallback_actor: String,
}

impl AuditRecorder {
    pub fn new(actor: Arc<dyn ActorProvider>, fallback_actor: impl Into<String>) -> Self {
        Self {
            actor,
            fallback_actor: fallback_actor.into(),
        }
    }

    /// 当前操作人,取不到时为默认操作人
    pub fn current_actor(&self) -> String {
        self.actor
            .current_actor()
            .filter(|name| !name.trim().is_empty())
            .unwrap_or_else(|| self.fallback_actor.clone())
    }

    /// 记录落位保存 (新建或改重)
    ///
    /// 调用时工作副本已包含新重量,场地总重即变更后的值。
    pub fn record_placement_save<W: SessionWriter + ?Sized>(
        &self,
        writer: &mut W,
        placement: PlacementId,
        is_new: bool,
    ) -> Option<HistoryId> {
        let current = writer.graph().placements.get(&placement)?.weight;
        let (action, weight_change) = if is_new {
            (HistoryAction::Add, current)
        } else {
            let persisted = writer.persisted_weight(placement).unwrap_or(current);
            (HistoryAction::WeightChange, current - persisted)
        };
        self.record_placement_event(writer, placement, action, weight_change, Decimal::ZERO)
    }

    /// 记录落位删除
    ///
    /// 在落位被标记删除之前调用: 场地总重仍包含该落位,需要减去。
    /// 重量变化取上一次持久化的重量 (本事务内的改重不落库)。
    pub fn record_placement_removal<W: SessionWriter + ?Sized>(
        &self,
        writer: &mut W,
        placement: PlacementId,
    ) -> Option<HistoryId> {
        let weight = writer.graph().placements.get(&placement)?.weight;
        let persisted = writer.persisted_weight(placement).unwrap_or(weight);
        self.record_placement_event(writer, placement, HistoryAction::Remove, -persisted, weight)
    }

    fn record_placement_event<W: SessionWriter + ?Sized>(
        &self,
        writer: &mut W,
        placement: PlacementId,
        action: HistoryAction,
        weight_change: Decimal,
        pending_removal: Decimal,
    ) -> Option<HistoryId> {
        let graph = writer.graph();
        let placement_ref = graph.placements.get(&placement)?;
        let picket = graph.pickets.get(&placement_ref.picket)?;
        let Some(site_id) = picket.site else {
            debug!(placement = %placement, "桩位未挂场地,跳过历史记录");
            return None;
        };
        let site = graph.sites.get(&site_id)?;

        let cargo_name = graph
            .cargos
            .get(&placement_ref.cargo)
            .map(|c| c.name.clone())
            .unwrap_or_default();
        let current_total = site_weight(&*writer, site_id) - pending_removal;
        let info_text = picket_info(&*writer, picket.id);

        let record = HistoryRecord::new(
            action,
            self.current_actor(),
            format!("{}: {}", action.as_str(), cargo_name),
        )
        .with_site(site_id, site.warehouse)
        .with_placement(placement)
        .with_weights(weight_change, current_total)
        .with_picket_info(info_text);

        let id = record.id;
        info!(
            action = action.as_str(),
            placement = %placement,
            weight_change = %weight_change,
            current_total_weight = %current_total,
            "写入历史记录"
        );
        writer.append_history(record);
        Some(id)
    }

    /// 记录场地事件 (新建 / 删除 / 转移仓库)
    pub fn record_site_event<W: SessionWriter + ?Sized>(
        &self,
        writer: &mut W,
        site: SiteId,
        action: HistoryAction,
        detail: String,
    ) -> Option<HistoryId> {
        let warehouse = writer.graph().sites.get(&site)?.warehouse;
        let record = HistoryRecord::new(action, self.current_actor(), detail).with_site(site, warehouse);
        let id = record.id;
        info!(action = action.as_str(), site = %site, "写入历史记录");
        writer.append_history(record);
        Some(id)
    }
}

/// 桩位描述: `picket {完整编号} (site {场地编号})`
pub fn picket_info<V: SessionView + ?Sized>(view: &V, picket: PicketId) -> String {
    let graph = view.graph();
    let Some(p) = graph.pickets.get(&picket) else {
        return String::new();
    };
    let site_number = p
        .site
        .and_then(|site| display_number(view, site))
        .unwrap_or_default();
    format!("picket {} (site {})", graph.picket_full_number(p), site_number)
}

/// 场地转移描述
pub fn transfer_detail(from: Option<&str>, to: Option<&str>) -> String {
    format!(
        "site transfer from '{}' to '{}'",
        from.unwrap_or_default(),
        to.unwrap_or_default()
    )
}
