// ==========================================
// 仓库容量与审计引擎 - 会话 (逻辑事务)
// ==========================================
// 职责:
// - 在工作副本上执行变更 (新建 / 修改 / 删除)
// - 嵌套事务层: begin_nested / commit / rollback
// - 提交管线: 每层提交对每个脏实体调用 before_save;
//   最外层提交后整体落库并发布为新的已提交实体图
// 红线: 会话存活期间持有实体图锁,容量校验不会读到过期总重
// 红线: 钩子或落库失败时,已提交实体图与数据库均保持不变
// ==========================================

use crate::domain::graph::WarehouseGraph;
use crate::domain::history::{HistoryAction, HistoryRecord};
use crate::domain::picket::Picket;
use crate::domain::placement::Placement;
use crate::domain::site::Site;
use crate::domain::types::{
    CargoId, EntityRef, PicketId, PlacementId, SiteId, WarehouseId,
};
use crate::domain::warehouse::{Cargo, Warehouse};
use crate::engine::aggregation;
use crate::engine::audit::transfer_detail;
use crate::engine::grouping;
use crate::engine::guard::TxContext;
use crate::engine::hooks::SaveHooks;
use crate::engine::view::{SessionView, SessionWriter};
use crate::store::store::{Store, StoreError, StoreResult};
use crate::store::unit_of_work::UnitOfWork;
use rust_decimal::Decimal;
use std::sync::MutexGuard;
use tracing::{debug, info, instrument, warn};

/// 嵌套事务层
struct Layer {
    ctx: TxContext,
    snapshot: UnitOfWork, // 开启本层前的工作单元,回滚时恢复
}

// ==========================================
// Session - 会话
// ==========================================
pub struct Session<'s> {
    store: &'s Store,
    committed: MutexGuard<'s, WarehouseGraph>,
    uow: UnitOfWork,
    root: TxContext,
    layers: Vec<Layer>,
}

impl<'s> Session<'s> {
    pub(crate) fn new(store: &'s Store, committed: MutexGuard<'s, WarehouseGraph>) -> Self {
        let uow = UnitOfWork::new(&committed);
        let root = TxContext::root();
        debug!(tx_id = %root.tx_id(), "会话开始");
        Self {
            store,
            committed,
            uow,
            root,
            layers: Vec::new(),
        }
    }

    /// 当前事务层上下文
    pub fn context(&self) -> TxContext {
        self.layers.last().map(|l| l.ctx).unwrap_or(self.root)
    }

    /// 当前嵌套深度 (0 = 最外层)
    pub fn depth(&self) -> usize {
        self.layers.len()
    }

    /// 本事务中尚未落库的历史记录
    pub fn pending_history(&self) -> &[HistoryRecord] {
        self.uow.pending_history()
    }

    fn require(&self, entity: EntityRef) -> StoreResult<()> {
        if self.uow.is_live(entity) {
            Ok(())
        } else {
            Err(StoreError::not_found(entity.kind().as_str(), entity.uuid()))
        }
    }

    /// 删除请求: 先调用删除钩子 (此时实体尚未标记删除),再标记删除
    fn delete_entity(&mut self, entity: EntityRef) -> StoreResult<()> {
        self.require(entity)?;
        let store = self.store;
        let ctx = self.context();
        store.engine().before_delete(&mut self.uow, entity, &ctx)?;
        self.uow.mark_deleted(entity);
        debug!(entity = %entity, "已标记删除");
        Ok(())
    }

    // ==========================================
    // 仓库
    // ==========================================

    pub fn create_warehouse(&mut self, number: impl Into<String>) -> StoreResult<WarehouseId> {
        Ok(self.uow.add_warehouse(Warehouse::new(number)))
    }

    pub fn rename_warehouse(&mut self, id: WarehouseId, number: impl Into<String>) -> StoreResult<()> {
        self.require(EntityRef::Warehouse(id))?;
        if let Some(warehouse) = self.uow.warehouse_mut(id) {
            warehouse.number = number.into();
        }
        Ok(())
    }

    pub fn delete_warehouse(&mut self, id: WarehouseId) -> StoreResult<()> {
        self.delete_entity(EntityRef::Warehouse(id))
    }

    // ==========================================
    // 货物
    // ==========================================

    pub fn create_cargo(&mut self, name: impl Into<String>) -> StoreResult<CargoId> {
        Ok(self.uow.add_cargo(Cargo::new(name)))
    }

    pub fn rename_cargo(&mut self, id: CargoId, name: impl Into<String>) -> StoreResult<()> {
        self.require(EntityRef::Cargo(id))?;
        if let Some(cargo) = self.uow.cargo_mut(id) {
            cargo.name = name.into();
        }
        Ok(())
    }

    pub fn delete_cargo(&mut self, id: CargoId) -> StoreResult<()> {
        self.delete_entity(EntityRef::Cargo(id))
    }

    // ==========================================
    // 场地
    // ==========================================

    pub fn create_site(&mut self, warehouse: WarehouseId) -> StoreResult<SiteId> {
        self.require(EntityRef::Warehouse(warehouse))?;
        Ok(self.uow.add_site(Site::new(warehouse)))
    }

    /// 设置场地所属仓库
    ///
    /// 新建场地可随意修改;已持久化的场地只允许从"无仓库"设置一次,
    /// 并写入一条转移记录。
    pub fn set_site_warehouse(&mut self, site: SiteId, warehouse: WarehouseId) -> StoreResult<()> {
        self.require(EntityRef::Site(site))?;
        self.require(EntityRef::Warehouse(warehouse))?;

        let store = self.store;
        let engine = store.engine();
        engine
            .validator()
            .check_site_warehouse_change(&self.uow, site, warehouse)?;

        let graph = self.uow.graph();
        let current = graph.sites.get(&site).and_then(|s| s.warehouse);
        if current == Some(warehouse) {
            return Ok(());
        }
        engine
            .validator()
            .check_members_warehouse(&self.uow, site, warehouse)?;

        let from = current
            .and_then(|id| graph.warehouses.get(&id))
            .map(|w| w.number.clone());
        let to = graph.warehouses.get(&warehouse).map(|w| w.number.clone());

        if let Some(s) = self.uow.site_mut(site) {
            s.warehouse = Some(warehouse);
        }

        if !self.uow.is_new(EntityRef::Site(site)) {
            let written = engine
                .recorder()
                .record_site_event(
                    &mut self.uow,
                    site,
                    HistoryAction::SiteTransfer,
                    transfer_detail(from.as_deref(), to.as_deref()),
                )
                .is_some();
            engine.note_history(written);
        }
        Ok(())
    }

    /// 删除场地: 桩位解绑保留,写入删除记录
    pub fn delete_site(&mut self, site: SiteId) -> StoreResult<()> {
        self.delete_entity(EntityRef::Site(site))
    }

    /// 重新校验场地编号连续性,返回场地编号
    pub fn revalidate_site(&mut self, site: SiteId) -> StoreResult<Option<String>> {
        self.require(EntityRef::Site(site))?;
        let store = self.store;
        Ok(store.engine().validator().revalidate_grouping(&mut self.uow, site)?)
    }

    fn revalidate_if_live(&mut self, site: Option<SiteId>) -> StoreResult<()> {
        match site {
            Some(site) if self.uow.is_live(EntityRef::Site(site)) => {
                self.revalidate_site(site)?;
                Ok(())
            }
            _ => Ok(()),
        }
    }

    // ==========================================
    // 桩位
    // ==========================================

    /// 新建桩位,可选直接挂到场地
    ///
    /// 跨仓库挂接时不创建桩位;编号不连续时桩位已创建,场地全部桩位被解绑。
    pub fn create_picket(
        &mut self,
        warehouse: WarehouseId,
        local_number: impl Into<String>,
        site: Option<SiteId>,
    ) -> StoreResult<PicketId> {
        self.require(EntityRef::Warehouse(warehouse))?;
        let mut picket = Picket::new(warehouse, local_number);
        if let Some(site) = site {
            self.require(EntityRef::Site(site))?;
            let store = self.store;
            store
                .engine()
                .validator()
                .check_picket_site(&self.uow, &picket, site)?;
            picket.site = Some(site);
        }
        let id = self.uow.add_picket(picket);
        self.revalidate_if_live(site)?;
        Ok(id)
    }

    pub fn set_picket_number(&mut self, picket: PicketId, number: impl Into<String>) -> StoreResult<()> {
        self.require(EntityRef::Picket(picket))?;
        let mut site = None;
        if let Some(p) = self.uow.picket_mut(picket) {
            p.local_number = number.into();
            site = p.site;
        }
        self.revalidate_if_live(site)
    }

    /// 挂接 (或解绑) 桩位;原场地与新场地都重新校验编号
    pub fn assign_picket_to_site(&mut self, picket: PicketId, site: Option<SiteId>) -> StoreResult<()> {
        self.require(EntityRef::Picket(picket))?;
        if let Some(site) = site {
            self.require(EntityRef::Site(site))?;
            let store = self.store;
            store
                .engine()
                .validator()
                .check_assignment(&self.uow, picket, site)?;
        }

        let previous = self.uow.graph().pickets.get(&picket).and_then(|p| p.site);
        if previous == site {
            return Ok(());
        }
        self.uow.set_picket_site(picket, site);

        self.revalidate_if_live(previous)?;
        self.revalidate_if_live(site)
    }

    /// 删除桩位: 先移除其上全部落位 (各写一条移除记录),再解绑并删除
    pub fn delete_picket(&mut self, picket: PicketId) -> StoreResult<()> {
        self.require(EntityRef::Picket(picket))?;

        let placements: Vec<PlacementId> = self
            .uow
            .graph()
            .placements_of_picket(picket)
            .into_iter()
            .map(|p| p.id)
            .filter(|id| !self.uow.is_marked_deleted(EntityRef::Placement(*id)))
            .collect();
        for placement in placements {
            self.delete_entity(EntityRef::Placement(placement))?;
        }

        let previous = self.uow.graph().pickets.get(&picket).and_then(|p| p.site);
        if previous.is_some() {
            self.uow.set_picket_site(picket, None);
        }
        self.delete_entity(EntityRef::Picket(picket))?;
        self.revalidate_if_live(previous)
    }

    // ==========================================
    // 落位
    // ==========================================

    /// 货物放上桩位;容量在提交时校验
    pub fn add_placement(
        &mut self,
        picket: PicketId,
        cargo: CargoId,
        weight: Decimal,
    ) -> StoreResult<PlacementId> {
        self.require(EntityRef::Picket(picket))?;
        self.require(EntityRef::Cargo(cargo))?;
        Ok(self.uow.add_placement(Placement::new(picket, cargo, weight)))
    }

    pub fn set_placement_weight(&mut self, placement: PlacementId, weight: Decimal) -> StoreResult<()> {
        self.require(EntityRef::Placement(placement))?;
        if let Some(p) = self.uow.placement_mut(placement) {
            p.weight = weight;
        }
        Ok(())
    }

    pub fn delete_placement(&mut self, placement: PlacementId) -> StoreResult<()> {
        self.delete_entity(EntityRef::Placement(placement))
    }

    // ==========================================
    // 只读计算 (包含在途变更)
    // ==========================================

    pub fn display_number(&self, site: SiteId) -> Option<String> {
        grouping::display_number(&self.uow, site)
    }

    pub fn picket_weight(&self, picket: PicketId) -> Decimal {
        aggregation::picket_weight(&self.uow, picket)
    }

    pub fn site_weight(&self, site: SiteId) -> Decimal {
        aggregation::site_weight(&self.uow, site)
    }

    pub fn site_capacity(&self, site: SiteId) -> Decimal {
        aggregation::site_capacity(&self.uow, site, self.store.config().picket_capacity)
    }

    pub fn warehouse_weight(&self, warehouse: WarehouseId) -> Decimal {
        aggregation::warehouse_weight(&self.uow, warehouse)
    }

    pub fn warehouse_capacity(&self, warehouse: WarehouseId) -> Decimal {
        aggregation::warehouse_capacity(&self.uow, warehouse, self.store.config().picket_capacity)
    }

    // ==========================================
    // 事务层
    // ==========================================

    /// 开启嵌套事务层
    pub fn begin_nested(&mut self) {
        let ctx = self.context().child();
        let snapshot = self.uow.clone();
        self.uow.push_layer();
        self.layers.push(Layer { ctx, snapshot });
        debug!(depth = ctx.depth(), "开启嵌套事务层");
    }

    /// 提交最内层
    ///
    /// 嵌套层提交只把变更并入外层;最外层提交执行校验、审计并落库。
    #[instrument(skip_all, fields(depth = self.layers.len()))]
    pub fn commit(&mut self) -> StoreResult<()> {
        match self.layers.pop() {
            Some(layer) => self.commit_nested(layer),
            None => self.commit_root(),
        }
    }

    fn commit_nested(&mut self, layer: Layer) -> StoreResult<()> {
        let store = self.store;
        let entities = self.uow.pop_layer();
        for entity in &entities {
            if let Err(err) = store.engine().before_save(&mut self.uow, *entity, &layer.ctx) {
                warn!(entity = %entity, error = %err, "嵌套层提交被拒绝,本层变更已撤销");
                self.uow = layer.snapshot;
                return Err(err.into());
            }
        }
        debug!(depth = layer.ctx.depth(), entities = entities.len(), "嵌套层已并入外层");
        Ok(())
    }

    fn commit_root(&mut self) -> StoreResult<()> {
        let store = self.store;
        let backup = self.uow.clone();

        // 钩子执行中新变脏的实体 (如被解绑的桩位) 同样经过钩子
        let mut index = 0;
        while let Some(entity) = self.uow.dirty_at(index) {
            if let Err(err) = store.engine().before_save(&mut self.uow, entity, &self.root) {
                warn!(entity = %entity, error = %err, "提交被拒绝");
                self.uow = backup;
                return Err(err.into());
            }
            index += 1;
        }

        let changes = self.uow.change_set();
        if !changes.is_empty() {
            if let Err(err) = store.hierarchy().apply(&changes) {
                warn!(error = %err, "落库失败,提交已撤销");
                self.uow = backup;
                return Err(err.into());
            }
        }

        let finished = std::mem::replace(&mut self.uow, UnitOfWork::new(&WarehouseGraph::new()));
        *self.committed = finished.into_graph();
        self.uow = UnitOfWork::new(&self.committed);

        info!(
            tx_id = %self.root.tx_id(),
            upserts = changes.upsert_warehouses.len()
                + changes.upsert_cargos.len()
                + changes.upsert_sites.len()
                + changes.upsert_pickets.len()
                + changes.upsert_placements.len(),
            deletes = changes.delete_placements.len()
                + changes.delete_pickets.len()
                + changes.delete_sites.len()
                + changes.delete_cargos.len()
                + changes.delete_warehouses.len(),
            history = changes.new_history.len(),
            "事务已提交"
        );
        self.root = TxContext::root();
        Ok(())
    }

    /// 回滚最内层;在最外层时放弃全部未提交变更
    pub fn rollback(&mut self) {
        match self.layers.pop() {
            Some(layer) => {
                debug!(depth = layer.ctx.depth(), "回滚嵌套事务层");
                self.uow = layer.snapshot;
            }
            None => {
                debug!(tx_id = %self.root.tx_id(), "回滚事务");
                self.uow = UnitOfWork::new(&self.committed);
                self.root = TxContext::root();
            }
        }
    }
}

impl SessionView for Session<'_> {
    fn graph(&self) -> &WarehouseGraph {
        self.uow.graph()
    }

    fn is_new(&self, entity: EntityRef) -> bool {
        self.uow.is_new(entity)
    }

    fn is_marked_deleted(&self, entity: EntityRef) -> bool {
        self.uow.is_marked_deleted(entity)
    }

    fn persisted_weight(&self, placement: PlacementId) -> Option<Decimal> {
        self.uow.persisted_weight(placement)
    }
}

#[cfg(test)]
mod tests;
