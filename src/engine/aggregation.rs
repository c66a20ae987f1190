// ==========================================
// 仓库容量与审计引擎 - 聚合计算
// ==========================================
// 职责: 计算派生量 (桩位重量、场地重量/容量、仓库重量/容量)
// 红线: 纯函数,无副作用;读取工作副本 (含未提交变更)
// 红线: 已标记删除的实体不计入
// ==========================================

use crate::domain::types::{EntityRef, PicketId, SiteId, WarehouseId};
use crate::engine::view::SessionView;
use rust_decimal::Decimal;

/// 桩位当前重量: 未删除落位的重量之和
///
/// 正在保存的落位使用其在途新重量 (工作副本中的值)。
pub fn picket_weight<V: SessionView + ?Sized>(view: &V, picket: PicketId) -> Decimal {
    view.graph()
        .placements_of_picket(picket)
        .into_iter()
        .filter(|p| !view.is_marked_deleted(EntityRef::Placement(p.id)))
        .map(|p| p.weight)
        .sum()
}

/// 场地下未删除的桩位 ID
fn live_pickets_of_site<V: SessionView + ?Sized>(view: &V, site: SiteId) -> Vec<PicketId> {
    view.graph()
        .pickets_of_site(site)
        .into_iter()
        .filter(|p| !view.is_marked_deleted(EntityRef::Picket(p.id)))
        .map(|p| p.id)
        .collect()
}

/// 场地重量: 各桩位重量之和
pub fn site_weight<V: SessionView + ?Sized>(view: &V, site: SiteId) -> Decimal {
    live_pickets_of_site(view, site)
        .into_iter()
        .map(|p| picket_weight(view, p))
        .sum()
}

/// 场地容量: 各桩位容量之和
pub fn site_capacity<V: SessionView + ?Sized>(
    view: &V,
    site: SiteId,
    picket_capacity: Decimal,
) -> Decimal {
    picket_capacity * Decimal::from(live_pickets_of_site(view, site).len())
}

/// 仓库重量: 所属场地重量 + 未挂场地桩位重量
pub fn warehouse_weight<V: SessionView + ?Sized>(view: &V, warehouse: WarehouseId) -> Decimal {
    let graph = view.graph();
    let sites: Decimal = graph
        .sites_of_warehouse(warehouse)
        .into_iter()
        .filter(|s| !view.is_marked_deleted(EntityRef::Site(s.id)))
        .map(|s| site_weight(view, s.id))
        .sum();
    let loose: Decimal = graph
        .unattached_pickets(warehouse)
        .into_iter()
        .filter(|p| !view.is_marked_deleted(EntityRef::Picket(p.id)))
        .map(|p| picket_weight(view, p.id))
        .sum();
    sites + loose
}

/// 仓库容量: 所属场地容量 + 未挂场地桩位容量
pub fn warehouse_capacity<V: SessionView + ?Sized>(
    view: &V,
    warehouse: WarehouseId,
    picket_capacity: Decimal,
) -> Decimal {
    let graph = view.graph();
    let sites: Decimal = graph
        .sites_of_warehouse(warehouse)
        .into_iter()
        .filter(|s| !view.is_marked_deleted(EntityRef::Site(s.id)))
        .map(|s| site_capacity(view, s.id, picket_capacity))
        .sum();
    let loose = graph
        .unattached_pickets(warehouse)
        .into_iter()
        .filter(|p| !view.is_marked_deleted(EntityRef::Picket(p.id)))
        .count();
    sites + picket_capacity * Decimal::from(loose)
}
