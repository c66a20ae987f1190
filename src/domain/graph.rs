// ==========================================
// 仓库容量与审计引擎 - 实体图 (Arena)
// ==========================================
// 职责: 以 ID 为键保存全部实体,提供关系查询
// 红线: 不含校验逻辑,不含派生量计算 (见 engine::aggregation)
// ==========================================

use crate::domain::history::HistoryRecord;
use crate::domain::picket::{full_number, Picket};
use crate::domain::placement::Placement;
use crate::domain::site::Site;
use crate::domain::types::{
    CargoId, EntityRef, HistoryId, PicketId, PlacementId, SiteId, WarehouseId,
};
use crate::domain::warehouse::{Cargo, Warehouse};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

// ==========================================
// WarehouseGraph - 实体图
// ==========================================
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WarehouseGraph {
    pub warehouses: HashMap<WarehouseId, Warehouse>,
    pub sites: HashMap<SiteId, Site>,
    pub pickets: HashMap<PicketId, Picket>,
    pub cargos: HashMap<CargoId, Cargo>,
    pub placements: HashMap<PlacementId, Placement>,
    pub history: Vec<HistoryRecord>, // 按写入顺序
}

impl WarehouseGraph {
    pub fn new() -> Self {
        Self::default()
    }

    // ==========================================
    // 存在性
    // ==========================================

    pub fn contains(&self, entity: EntityRef) -> bool {
        match entity {
            EntityRef::Warehouse(id) => self.warehouses.contains_key(&id),
            EntityRef::Site(id) => self.sites.contains_key(&id),
            EntityRef::Picket(id) => self.pickets.contains_key(&id),
            EntityRef::Cargo(id) => self.cargos.contains_key(&id),
            EntityRef::Placement(id) => self.placements.contains_key(&id),
        }
    }

    /// 删除实体本身 (不级联,级联由调用方显式处理)
    pub fn remove(&mut self, entity: EntityRef) {
        match entity {
            EntityRef::Warehouse(id) => {
                self.warehouses.remove(&id);
            }
            EntityRef::Site(id) => {
                self.sites.remove(&id);
            }
            EntityRef::Picket(id) => {
                self.pickets.remove(&id);
            }
            EntityRef::Cargo(id) => {
                self.cargos.remove(&id);
            }
            EntityRef::Placement(id) => {
                self.placements.remove(&id);
            }
        }
    }

    // ==========================================
    // 关系查询
    // ==========================================

    /// 场地下的桩位 (按编号排序,便于稳定输出)
    pub fn pickets_of_site(&self, site: SiteId) -> Vec<&Picket> {
        let mut pickets: Vec<&Picket> = self
            .pickets
            .values()
            .filter(|p| p.site == Some(site))
            .collect();
        sort_pickets(&mut pickets);
        pickets
    }

    /// 仓库下的全部桩位
    pub fn pickets_of_warehouse(&self, warehouse: WarehouseId) -> Vec<&Picket> {
        let mut pickets: Vec<&Picket> = self
            .pickets
            .values()
            .filter(|p| p.warehouse == warehouse)
            .collect();
        sort_pickets(&mut pickets);
        pickets
    }

    /// 仓库下未挂场地的桩位
    pub fn unattached_pickets(&self, warehouse: WarehouseId) -> Vec<&Picket> {
        self.pickets_of_warehouse(warehouse)
            .into_iter()
            .filter(|p| p.site.is_none())
            .collect()
    }

    /// 仓库下的场地
    pub fn sites_of_warehouse(&self, warehouse: WarehouseId) -> Vec<&Site> {
        let mut sites: Vec<&Site> = self
            .sites
            .values()
            .filter(|s| s.warehouse == Some(warehouse))
            .collect();
        sites.sort_by_key(|s| s.id);
        sites
    }

    /// 桩位上的落位
    pub fn placements_of_picket(&self, picket: PicketId) -> Vec<&Placement> {
        let mut placements: Vec<&Placement> = self
            .placements
            .values()
            .filter(|p| p.picket == picket)
            .collect();
        placements.sort_by_key(|p| p.id);
        placements
    }

    /// 引用某货物的落位数量
    pub fn placements_of_cargo(&self, cargo: CargoId) -> Vec<&Placement> {
        self.placements
            .values()
            .filter(|p| p.cargo == cargo)
            .collect()
    }

    /// 桩位完整编号 (仓库缺失时退化为仓库内编号)
    pub fn picket_full_number(&self, picket: &Picket) -> String {
        match self.warehouses.get(&picket.warehouse) {
            Some(wh) => full_number(&wh.number, &picket.local_number),
            None => picket.local_number.clone(),
        }
    }

    // ==========================================
    // 历史记录
    // ==========================================

    pub fn push_history(&mut self, record: HistoryRecord) {
        self.history.push(record);
    }

    pub fn find_history(&self, id: HistoryId) -> Option<&HistoryRecord> {
        self.history.iter().find(|h| h.id == id)
    }
}

/// 数字编号按数值排序,其余按字典序排在后面
fn sort_pickets(pickets: &mut [&Picket]) {
    pickets.sort_by(|a, b| match (a.numeric_number(), b.numeric_number()) {
        (Some(x), Some(y)) => x.cmp(&y).then_with(|| a.id.cmp(&b.id)),
        (Some(_), None) => std::cmp::Ordering::Less,
        (None, Some(_)) => std::cmp::Ordering::Greater,
        (None, None) => a
            .local_number
            .cmp(&b.local_number)
            .then_with(|| a.id.cmp(&b.id)),
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn sample() -> (WarehouseGraph, WarehouseId, SiteId) {
        let mut graph = WarehouseGraph::new();
        let wh = Warehouse::new("W1");
        let wh_id = wh.id;
        graph.warehouses.insert(wh.id, wh);
        let site = Site::new(wh_id);
        let site_id = site.id;
        graph.sites.insert(site.id, site);
        for n in ["10", "2", "x", "1"] {
            let mut p = Picket::new(wh_id, n);
            if n != "x" {
                p.site = Some(site_id);
            }
            graph.pickets.insert(p.id, p);
        }
        (graph, wh_id, site_id)
    }

    #[test]
    fn test_pickets_of_site_sorted_numerically() {
        let (graph, _, site) = sample();
        let numbers: Vec<&str> = graph
            .pickets_of_site(site)
            .iter()
            .map(|p| p.local_number.as_str())
            .collect();
        assert_eq!(numbers, vec!["1", "2", "10"]);
    }

    #[test]
    fn test_unattached_pickets() {
        let (graph, wh, _) = sample();
        let loose = graph.unattached_pickets(wh);
        assert_eq!(loose.len(), 1);
        assert_eq!(loose[0].local_number, "x");
        assert_eq!(graph.picket_full_number(loose[0]), "W1/x");
    }

    #[test]
    fn test_placements_of_picket() {
        let (mut graph, wh, _) = sample();
        let picket = Picket::new(wh, "99");
        let picket_id = picket.id;
        graph.pickets.insert(picket.id, picket);
        let cargo = Cargo::new("coal");
        let a = Placement::new(picket_id, cargo.id, dec!(1));
        let b = Placement::new(picket_id, cargo.id, dec!(2));
        graph.cargos.insert(cargo.id, cargo);
        graph.placements.insert(a.id, a);
        graph.placements.insert(b.id, b);

        assert_eq!(graph.placements_of_picket(picket_id).len(), 2);
        graph.remove(EntityRef::Picket(picket_id));
        assert!(!graph.contains(EntityRef::Picket(picket_id)));
    }
}
