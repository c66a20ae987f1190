// ==========================================
// 仓库容量与审计引擎 - 会话只读视图
// ==========================================
// 职责: 引擎依赖的持久层查询契约
// - 实体是否为本事务新建
// - 实体是否已在本事务中标记删除
// - 字段的上一次持久化值
// ==========================================

use crate::domain::graph::WarehouseGraph;
use crate::domain::history::HistoryRecord;
use crate::domain::types::{EntityRef, PicketId, PlacementId, SiteId};
use rust_decimal::Decimal;

/// 会话只读视图
///
/// `graph()` 返回包含未提交变更的工作副本。
pub trait SessionView {
    fn graph(&self) -> &WarehouseGraph;

    fn is_new(&self, entity: EntityRef) -> bool;

    fn is_marked_deleted(&self, entity: EntityRef) -> bool;

    /// 落位重量的上一次持久化值 (新建落位返回 None)
    fn persisted_weight(&self, placement: PlacementId) -> Option<Decimal>;
}

/// 已提交的实体图本身就是一个没有在途变更的视图
impl SessionView for WarehouseGraph {
    fn graph(&self) -> &WarehouseGraph {
        self
    }

    fn is_new(&self, _entity: EntityRef) -> bool {
        false
    }

    fn is_marked_deleted(&self, _entity: EntityRef) -> bool {
        false
    }

    fn persisted_weight(&self, placement: PlacementId) -> Option<Decimal> {
        self.placements.get(&placement).map(|p| p.weight)
    }
}

/// 会话可写视图
///
/// 引擎只通过这里列出的动作修改工作副本: 桩位挂接/解绑,追加历史记录。
pub trait SessionWriter: SessionView {
    /// 设置桩位所属场地 (None 表示解绑)
    fn set_picket_site(&mut self, picket: PicketId, site: Option<SiteId>);

    fn append_history(&mut self, record: HistoryRecord);
}
