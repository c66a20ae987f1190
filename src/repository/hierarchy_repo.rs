// ==========================================
// 仓库容量与审计引擎 - 层级数据仓储
// ==========================================
// 对齐: warehouse / cargo / site / picket / placement 表
// 红线: Repository 不含业务逻辑,只做数据映射
// 红线: 一次提交的全部变更在同一个 SQL 事务中落库
// ==========================================

use crate::domain::graph::WarehouseGraph;
use crate::domain::picket::Picket;
use crate::domain::placement::Placement;
use crate::domain::site::Site;
use crate::domain::types::{CargoId, PicketId, PlacementId, SiteId, WarehouseId};
use crate::domain::warehouse::{Cargo, Warehouse};
use crate::repository::codec::{decimal_text, get_decimal, get_opt_uuid, get_uuid};
use crate::repository::error::{FlushStep, RepositoryError, RepositoryResult};
use crate::repository::history_repo::HistoryRecordRepository;
use crate::store::ChangeSet;
use rusqlite::{params, Connection, Params, Result as SqliteResult, Transaction};
use std::sync::{Arc, Mutex};
use tracing::debug;

// ==========================================
// HierarchyRepository - 层级仓储
// ==========================================
pub struct HierarchyRepository {
    conn: Arc<Mutex<Connection>>,
}

impl HierarchyRepository {
    /// 从已有连接创建仓储实例
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    /// 获取数据库连接
    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    // ==========================================
    // 加载
    // ==========================================

    /// 加载全部已提交实体 (不含历史记录,历史按需查询)
    pub fn load_graph(&self) -> RepositoryResult<WarehouseGraph> {
        let conn = self.get_conn()?;
        let mut graph = WarehouseGraph::new();

        let mut stmt = conn.prepare("SELECT warehouse_id, number FROM warehouse")?;
        let warehouses = stmt
            .query_map([], |row| {
                Ok(Warehouse {
                    id: WarehouseId(get_uuid(row, 0)?),
                    number: row.get(1)?,
                })
            })?
            .collect::<SqliteResult<Vec<_>>>()?;
        for w in warehouses {
            graph.warehouses.insert(w.id, w);
        }

        let mut stmt = conn.prepare("SELECT cargo_id, name FROM cargo")?;
        let cargos = stmt
            .query_map([], |row| {
                Ok(Cargo {
                    id: CargoId(get_uuid(row, 0)?),
                    name: row.get(1)?,
                })
            })?
            .collect::<SqliteResult<Vec<_>>>()?;
        for c in cargos {
            graph.cargos.insert(c.id, c);
        }

        let mut stmt = conn.prepare("SELECT site_id, warehouse_id FROM site")?;
        let sites = stmt
            .query_map([], |row| {
                Ok(Site {
                    id: SiteId(get_uuid(row, 0)?),
                    warehouse: get_opt_uuid(row, 1)?.map(WarehouseId),
                })
            })?
            .collect::<SqliteResult<Vec<_>>>()?;
        for s in sites {
            graph.sites.insert(s.id, s);
        }

        let mut stmt =
            conn.prepare("SELECT picket_id, warehouse_id, site_id, local_number FROM picket")?;
        let pickets = stmt
            .query_map([], |row| {
                Ok(Picket {
                    id: PicketId(get_uuid(row, 0)?),
                    warehouse: WarehouseId(get_uuid(row, 1)?),
                    site: get_opt_uuid(row, 2)?.map(SiteId),
                    local_number: row.get(3)?,
                })
            })?
            .collect::<SqliteResult<Vec<_>>>()?;
        for p in pickets {
            graph.pickets.insert(p.id, p);
        }

        let mut stmt =
            conn.prepare("SELECT placement_id, picket_id, cargo_id, weight FROM placement")?;
        let placements = stmt
            .query_map([], |row| {
                Ok(Placement {
                    id: PlacementId(get_uuid(row, 0)?),
                    picket: PicketId(get_uuid(row, 1)?),
                    cargo: CargoId(get_uuid(row, 2)?),
                    weight: get_decimal(row, 3)?,
                })
            })?
            .collect::<SqliteResult<Vec<_>>>()?;
        for p in placements {
            graph.placements.insert(p.id, p);
        }

        debug!(
            warehouses = graph.warehouses.len(),
            sites = graph.sites.len(),
            pickets = graph.pickets.len(),
            placements = graph.placements.len(),
            "实体图加载完成"
        );
        Ok(graph)
    }

    // ==========================================
    // 写入
    // ==========================================

    /// 在一个事务中落库变更集
    ///
    /// 顺序: 删除 落位/桩位 -> 解绑待删场地的桩位 -> 删除 场地/货物/仓库
    ///       -> upsert 仓库/货物/场地/桩位/落位 -> 追加历史
    ///
    /// 删除先于 upsert: 同一事务中删除后以相同编号/名称新建不会撞唯一约束。
    pub fn apply(&self, changes: &ChangeSet) -> RepositoryResult<()> {
        let mut conn = self.get_conn()?;
        let tx = conn.transaction()?;

        for id in &changes.delete_placements {
            execute(
                &tx,
                FlushStep::DeletePlacement,
                id.to_string(),
                "DELETE FROM placement WHERE placement_id = ?1",
                params![id.to_string()],
            )?;
        }
        for id in &changes.delete_pickets {
            execute(
                &tx,
                FlushStep::DeletePicket,
                id.to_string(),
                "DELETE FROM picket WHERE picket_id = ?1",
                params![id.to_string()],
            )?;
        }
        for id in &changes.delete_sites {
            execute(
                &tx,
                FlushStep::DetachPickets,
                id.to_string(),
                "UPDATE picket SET site_id = NULL WHERE site_id = ?1",
                params![id.to_string()],
            )?;
            execute(
                &tx,
                FlushStep::DeleteSite,
                id.to_string(),
                "DELETE FROM site WHERE site_id = ?1",
                params![id.to_string()],
            )?;
        }
        for id in &changes.delete_cargos {
            execute(
                &tx,
                FlushStep::DeleteCargo,
                id.to_string(),
                "DELETE FROM cargo WHERE cargo_id = ?1",
                params![id.to_string()],
            )?;
        }
        for id in &changes.delete_warehouses {
            execute(
                &tx,
                FlushStep::DeleteWarehouse,
                id.to_string(),
                "DELETE FROM warehouse WHERE warehouse_id = ?1",
                params![id.to_string()],
            )?;
        }

        for w in &changes.upsert_warehouses {
            execute(
                &tx,
                FlushStep::UpsertWarehouse,
                w.number.clone(),
                "INSERT INTO warehouse (warehouse_id, number) VALUES (?1, ?2)
                 ON CONFLICT(warehouse_id) DO UPDATE SET number = excluded.number",
                params![w.id.to_string(), w.number],
            )?;
        }
        for c in &changes.upsert_cargos {
            execute(
                &tx,
                FlushStep::UpsertCargo,
                c.name.clone(),
                "INSERT INTO cargo (cargo_id, name) VALUES (?1, ?2)
                 ON CONFLICT(cargo_id) DO UPDATE SET name = excluded.name",
                params![c.id.to_string(), c.name],
            )?;
        }
        for s in &changes.upsert_sites {
            execute(
                &tx,
                FlushStep::UpsertSite,
                s.id.to_string(),
                "INSERT INTO site (site_id, warehouse_id) VALUES (?1, ?2)
                 ON CONFLICT(site_id) DO UPDATE SET warehouse_id = excluded.warehouse_id",
                params![s.id.to_string(), s.warehouse.map(|w| w.to_string())],
            )?;
        }
        for p in &changes.upsert_pickets {
            execute(
                &tx,
                FlushStep::UpsertPicket,
                p.local_number.clone(),
                "INSERT INTO picket (picket_id, warehouse_id, site_id, local_number)
                 VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT(picket_id) DO UPDATE SET
                    warehouse_id = excluded.warehouse_id,
                    site_id = excluded.site_id,
                    local_number = excluded.local_number",
                params![
                    p.id.to_string(),
                    p.warehouse.to_string(),
                    p.site.map(|s| s.to_string()),
                    p.local_number,
                ],
            )?;
        }
        for p in &changes.upsert_placements {
            execute(
                &tx,
                FlushStep::UpsertPlacement,
                p.id.to_string(),
                "INSERT INTO placement (placement_id, picket_id, cargo_id, weight)
                 VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT(placement_id) DO UPDATE SET
                    picket_id = excluded.picket_id,
                    cargo_id = excluded.cargo_id,
                    weight = excluded.weight",
                params![
                    p.id.to_string(),
                    p.picket.to_string(),
                    p.cargo.to_string(),
                    decimal_text(p.weight),
                ],
            )?;
        }

        HistoryRecordRepository::append_all(&tx, &changes.new_history).map_err(|e| {
            RepositoryError::flush(
                FlushStep::AppendHistory,
                format!("{} records", changes.new_history.len()),
                e,
            )
        })?;

        tx.commit()?;
        Ok(())
    }
}

/// 执行单条落库语句,失败时附带步骤与实体
fn execute<P: Params>(
    tx: &Transaction<'_>,
    step: FlushStep,
    entity: String,
    sql: &str,
    params: P,
) -> RepositoryResult<()> {
    tx.execute(sql, params)
        .map(|_| ())
        .map_err(|e| RepositoryError::flush(step, entity, e.into()))
}
