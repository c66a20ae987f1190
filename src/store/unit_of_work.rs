// ==========================================
// 仓库容量与审计引擎 - 工作单元 (变更跟踪)
// ==========================================
// 职责:
// - 持有实体图的工作副本 (含未提交变更)
// - 跟踪新建 / 修改 / 标记删除的实体
// - 记住落位重量的上一次持久化值
// - 提交时生成变更集 (ChangeSet) 交给仓储层落库
// 红线: 不含校验与审计逻辑 (由保存钩子负责)
// ==========================================

use crate::domain::graph::WarehouseGraph;
use crate::domain::history::HistoryRecord;
use crate::domain::picket::Picket;
use crate::domain::placement::Placement;
use crate::domain::site::Site;
use crate::domain::types::{
    CargoId, EntityRef, PicketId, PlacementId, SiteId, WarehouseId,
};
use crate::domain::warehouse::{Cargo, Warehouse};
use crate::engine::view::{SessionView, SessionWriter};
use rust_decimal::Decimal;
use std::collections::{HashMap, HashSet};

// ==========================================
// ChangeSet - 待落库的变更集
// ==========================================
// 落库顺序见 HierarchyRepository::apply: 先删除 (子对象在前),
// 再 upsert (父对象在前)
#[derive(Debug, Clone, Default)]
pub struct ChangeSet {
    pub upsert_warehouses: Vec<Warehouse>,
    pub upsert_cargos: Vec<Cargo>,
    pub upsert_sites: Vec<Site>,
    pub upsert_pickets: Vec<Picket>,
    pub upsert_placements: Vec<Placement>,
    pub delete_placements: Vec<PlacementId>,
    pub delete_pickets: Vec<PicketId>,
    pub delete_sites: Vec<SiteId>,
    pub delete_cargos: Vec<CargoId>,
    pub delete_warehouses: Vec<WarehouseId>,
    pub new_history: Vec<HistoryRecord>,
}

impl ChangeSet {
    pub fn is_empty(&self) -> bool {
        self.upsert_warehouses.is_empty()
            && self.upsert_cargos.is_empty()
            && self.upsert_sites.is_empty()
            && self.upsert_pickets.is_empty()
            && self.upsert_placements.is_empty()
            && self.delete_placements.is_empty()
            && self.delete_pickets.is_empty()
            && self.delete_sites.is_empty()
            && self.delete_cargos.is_empty()
            && self.delete_warehouses.is_empty()
            && self.new_history.is_empty()
    }
}

// ==========================================
// UnitOfWork - 工作单元
// ==========================================
#[derive(Debug, Clone)]
pub struct UnitOfWork {
    work: WarehouseGraph,
    new: HashSet<EntityRef>,
    deleted: HashSet<EntityRef>,
    dirty: Vec<EntityRef>, // 首次修改顺序,不重复
    layers: Vec<Vec<EntityRef>>, // 嵌套层内修改过的实体
    persisted_weights: HashMap<PlacementId, Decimal>,
    history_start: usize,
}

impl UnitOfWork {
    /// 基于已提交的实体图开启工作单元
    pub fn new(committed: &WarehouseGraph) -> Self {
        Self {
            work: committed.clone(),
            new: HashSet::new(),
            deleted: HashSet::new(),
            dirty: Vec::new(),
            layers: Vec::new(),
            persisted_weights: HashMap::new(),
            history_start: committed.history.len(),
        }
    }

    fn touch(&mut self, entity: EntityRef) {
        if !self.dirty.contains(&entity) {
            self.dirty.push(entity);
        }
        if let Some(layer) = self.layers.last_mut() {
            if !layer.contains(&entity) {
                layer.push(entity);
            }
        }
    }

    // ==========================================
    // 嵌套层
    // ==========================================

    /// 开启一个嵌套层
    pub fn push_layer(&mut self) {
        self.layers.push(Vec::new());
    }

    /// 结束最内层,返回该层修改过的实体;这些实体并入外层
    pub fn pop_layer(&mut self) -> Vec<EntityRef> {
        let entities = self.layers.pop().unwrap_or_default();
        if let Some(parent) = self.layers.last_mut() {
            for entity in &entities {
                if !parent.contains(entity) {
                    parent.push(*entity);
                }
            }
        }
        entities
    }

    /// 当前嵌套层数
    pub fn layer_depth(&self) -> usize {
        self.layers.len()
    }

    fn insert_new(&mut self, entity: EntityRef) {
        self.new.insert(entity);
        self.touch(entity);
    }

    // ==========================================
    // 新建
    // ==========================================

    pub fn add_warehouse(&mut self, warehouse: Warehouse) -> WarehouseId {
        let id = warehouse.id;
        self.work.warehouses.insert(id, warehouse);
        self.insert_new(EntityRef::Warehouse(id));
        id
    }

    pub fn add_cargo(&mut self, cargo: Cargo) -> CargoId {
        let id = cargo.id;
        self.work.cargos.insert(id, cargo);
        self.insert_new(EntityRef::Cargo(id));
        id
    }

    pub fn add_site(&mut self, site: Site) -> SiteId {
        let id = site.id;
        self.work.sites.insert(id, site);
        self.insert_new(EntityRef::Site(id));
        id
    }

    pub fn add_picket(&mut self, picket: Picket) -> PicketId {
        let id = picket.id;
        self.work.pickets.insert(id, picket);
        self.insert_new(EntityRef::Picket(id));
        id
    }

    pub fn add_placement(&mut self, placement: Placement) -> PlacementId {
        let id = placement.id;
        self.work.placements.insert(id, placement);
        self.insert_new(EntityRef::Placement(id));
        id
    }

    // ==========================================
    // 修改 (取可变引用即视为修改)
    // ==========================================

    pub fn warehouse_mut(&mut self, id: WarehouseId) -> Option<&mut Warehouse> {
        if !self.work.warehouses.contains_key(&id) {
            return None;
        }
        self.touch(EntityRef::Warehouse(id));
        self.work.warehouses.get_mut(&id)
    }

    pub fn cargo_mut(&mut self, id: CargoId) -> Option<&mut Cargo> {
        if !self.work.cargos.contains_key(&id) {
            return None;
        }
        self.touch(EntityRef::Cargo(id));
        self.work.cargos.get_mut(&id)
    }

    pub fn site_mut(&mut self, id: SiteId) -> Option<&mut Site> {
        if !self.work.sites.contains_key(&id) {
            return None;
        }
        self.touch(EntityRef::Site(id));
        self.work.sites.get_mut(&id)
    }

    pub fn picket_mut(&mut self, id: PicketId) -> Option<&mut Picket> {
        if !self.work.pickets.contains_key(&id) {
            return None;
        }
        self.touch(EntityRef::Picket(id));
        self.work.pickets.get_mut(&id)
    }

    /// 落位可变引用;首次修改已持久化的落位时记住其原重量
    pub fn placement_mut(&mut self, id: PlacementId) -> Option<&mut Placement> {
        let current = self.work.placements.get(&id)?.weight;
        let entity = EntityRef::Placement(id);
        if !self.new.contains(&entity) {
            self.persisted_weights.entry(id).or_insert(current);
        }
        self.touch(entity);
        self.work.placements.get_mut(&id)
    }

    // ==========================================
    // 删除
    // ==========================================

    /// 标记删除 (实体仍留在工作副本中,直到提交)
    pub fn mark_deleted(&mut self, entity: EntityRef) {
        self.deleted.insert(entity);
        self.touch(entity);
    }

    // ==========================================
    // 查询
    // ==========================================

    /// 本事务中修改过的实体 (按首次修改顺序)
    pub fn dirty_entities(&self) -> Vec<EntityRef> {
        self.dirty.clone()
    }

    /// 第 index 个脏实体;钩子执行期间新变脏的实体追加在末尾
    pub fn dirty_at(&self, index: usize) -> Option<EntityRef> {
        self.dirty.get(index).copied()
    }

    /// 本事务中新增的历史记录
    pub fn pending_history(&self) -> &[HistoryRecord] {
        &self.work.history[self.history_start..]
    }

    /// 是否存在且未被标记删除
    pub fn is_live(&self, entity: EntityRef) -> bool {
        self.work.contains(entity) && !self.deleted.contains(&entity)
    }

    // ==========================================
    // 提交
    // ==========================================

    /// 生成变更集
    ///
    /// 新建后又删除的实体不落库;历史记录全部落库。
    pub fn change_set(&self) -> ChangeSet {
        let mut changes = ChangeSet {
            new_history: self.pending_history().to_vec(),
            ..ChangeSet::default()
        };

        for entity in &self.dirty {
            let deleted = self.deleted.contains(entity);
            let is_new = self.new.contains(entity);
            if deleted {
                if is_new {
                    continue;
                }
                match *entity {
                    EntityRef::Warehouse(id) => changes.delete_warehouses.push(id),
                    EntityRef::Cargo(id) => changes.delete_cargos.push(id),
                    EntityRef::Site(id) => changes.delete_sites.push(id),
                    EntityRef::Picket(id) => changes.delete_pickets.push(id),
                    EntityRef::Placement(id) => changes.delete_placements.push(id),
                }
                continue;
            }

            match *entity {
                EntityRef::Warehouse(id) => {
                    if let Some(w) = self.work.warehouses.get(&id) {
                        changes.upsert_warehouses.push(w.clone());
                    }
                }
                EntityRef::Cargo(id) => {
                    if let Some(c) = self.work.cargos.get(&id) {
                        changes.upsert_cargos.push(c.clone());
                    }
                }
                EntityRef::Site(id) => {
                    if let Some(s) = self.work.sites.get(&id) {
                        changes.upsert_sites.push(s.clone());
                    }
                }
                EntityRef::Picket(id) => {
                    if let Some(p) = self.work.pickets.get(&id) {
                        changes.upsert_pickets.push(p.clone());
                    }
                }
                EntityRef::Placement(id) => {
                    if let Some(p) = self.work.placements.get(&id) {
                        changes.upsert_placements.push(p.clone());
                    }
                }
            }
        }

        changes
    }

    /// 提交后的实体图: 移除标记删除的实体
    ///
    /// 历史记录已随变更集落库,已提交实体图不再保留。
    pub fn into_graph(mut self) -> WarehouseGraph {
        for entity in &self.deleted {
            self.work.remove(*entity);
        }
        self.work.history.clear();
        self.work
    }
}

impl SessionView for UnitOfWork {
    fn graph(&self) -> &WarehouseGraph {
        &self.work
    }

    fn is_new(&self, entity: EntityRef) -> bool {
        self.new.contains(&entity)
    }

    fn is_marked_deleted(&self, entity: EntityRef) -> bool {
        self.deleted.contains(&entity)
    }

    fn persisted_weight(&self, placement: PlacementId) -> Option<Decimal> {
        if self.new.contains(&EntityRef::Placement(placement)) {
            return None;
        }
        self.persisted_weights
            .get(&placement)
            .copied()
            .or_else(|| self.work.placements.get(&placement).map(|p| p.weight))
    }
}

impl SessionWriter for UnitOfWork {
    fn set_picket_site(&mut self, picket: PicketId, site: Option<SiteId>) {
        if let Some(p) = self.picket_mut(picket) {
            p.site = site;
        }
    }

    fn append_history(&mut self, record: HistoryRecord) {
        self.work.push_history(record);
    }
}
