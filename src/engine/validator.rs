// ==========================================
// 仓库容量与审计引擎 - 约束校验器
// ==========================================
// 职责:
// - 容量规则: 桩位落位总重不得超过桩位容量
// - 层级规则: 跨仓库挂接、场地仓库不可变、场地编号连续
// - 字段规则: 必填、唯一、取值范围
// - 删除规则: 仍被引用的对象不可删除
// 红线: 校验失败必须输出上下文 (上限、实际值、对象)
// ==========================================

use crate::domain::graph::WarehouseGraph;
use crate::domain::picket::Picket;
use crate::domain::types::{
    CargoId, EntityKind, EntityRef, PicketId, PlacementId, SiteId, WarehouseId,
};
use crate::engine::aggregation::picket_weight;
use crate::engine::error::{ValidationError, ValidationResult};
use crate::engine::grouping::{site_grouping, SiteGrouping};
use crate::engine::view::{SessionView, SessionWriter};
use rust_decimal::Decimal;
use tracing::{instrument, warn};

// ==========================================
// ConstraintValidator - 约束校验器
// ==========================================
#[derive(Debug, Clone)]
pub struct ConstraintValidator {
    picket_capacity: Decimal,
}

impl ConstraintValidator {
    pub fn new(picket_capacity: Decimal) -> Self {
        Self { picket_capacity }
    }

    pub fn picket_capacity(&self) -> Decimal {
        self.picket_capacity
    }

    // ==========================================
    // 容量规则
    // ==========================================

    /// 校验落位所在桩位的容量
    ///
    /// 总重取工作副本中该桩位全部未删除落位的重量之和:
    /// - 已持久化的落位按当前值计入,标记删除的不计入
    /// - 正在保存的落位按在途新重量计入 (更新时即"以新重量替换旧重量")
    /// - 同一事务中新建的其它落位同样计入,保证提交后总重不超限
    #[instrument(skip_all, fields(placement = %placement))]
    pub fn check_capacity<V: SessionView + ?Sized>(
        &self,
        view: &V,
        placement: PlacementId,
    ) -> ValidationResult<()> {
        let graph = view.graph();
        let Some(placement) = graph.placements.get(&placement) else {
            return Ok(());
        };
        let Some(picket) = graph.pickets.get(&placement.picket) else {
            return Ok(());
        };

        let total = picket_weight(view, picket.id);
        if total > self.picket_capacity {
            let err = ValidationError::OverCapacity {
                picket: graph.picket_full_number(picket),
                capacity: self.picket_capacity,
                attempted: total,
                overflow: total - self.picket_capacity,
            };
            warn!(error = %err, "容量校验未通过");
            return Err(err);
        }
        Ok(())
    }

    // ==========================================
    // 层级规则
    // ==========================================

    /// 校验桩位挂接到场地时两者属于同一仓库
    pub fn check_assignment<V: SessionView + ?Sized>(
        &self,
        view: &V,
        picket: PicketId,
        site: SiteId,
    ) -> ValidationResult<()> {
        match view.graph().pickets.get(&picket) {
            Some(picket) => self.check_picket_site(view, picket, site),
            None => Ok(()),
        }
    }

    /// 同上,桩位可以尚未进入实体图 (新建时先校验再插入)
    pub fn check_picket_site<V: SessionView + ?Sized>(
        &self,
        view: &V,
        picket: &Picket,
        site: SiteId,
    ) -> ValidationResult<()> {
        let graph = view.graph();
        match graph.sites.get(&site).and_then(|s| s.warehouse) {
            Some(site_warehouse) if site_warehouse != picket.warehouse => {
                Err(ValidationError::CrossWarehouseAssignment {
                    picket: graph.picket_full_number(picket),
                    picket_warehouse: warehouse_number(graph, picket.warehouse),
                    site_warehouse: warehouse_number(graph, site_warehouse),
                })
            }
            _ => Ok(()),
        }
    }

    /// 场地改挂仓库前,已挂接的桩位必须属于目标仓库
    pub fn check_members_warehouse<V: SessionView + ?Sized>(
        &self,
        view: &V,
        site: SiteId,
        warehouse: WarehouseId,
    ) -> ValidationResult<()> {
        let graph = view.graph();
        let stray = graph
            .pickets_of_site(site)
            .into_iter()
            .filter(|p| !view.is_marked_deleted(EntityRef::Picket(p.id)))
            .find(|p| p.warehouse != warehouse);
        match stray {
            Some(picket) => Err(ValidationError::CrossWarehouseAssignment {
                picket: graph.picket_full_number(picket),
                picket_warehouse: warehouse_number(graph, picket.warehouse),
                site_warehouse: warehouse_number(graph, warehouse),
            }),
            None => Ok(()),
        }
    }

    /// 校验场地仓库变更
    ///
    /// 新建场地可任意设置;已持久化且已有仓库的场地不可改到其它仓库。
    pub fn check_site_warehouse_change<V: SessionView + ?Sized>(
        &self,
        view: &V,
        site: SiteId,
        warehouse: WarehouseId,
    ) -> ValidationResult<()> {
        if view.is_new(EntityRef::Site(site)) {
            return Ok(());
        }
        match view.graph().sites.get(&site).and_then(|s| s.warehouse) {
            Some(current) if current != warehouse => Err(ValidationError::ImmutableField {
                entity: EntityKind::Site,
                field: "warehouse".to_string(),
            }),
            _ => Ok(()),
        }
    }

    /// 重新校验场地编号连续性 (命令)
    ///
    /// 不连续时解绑场地下全部桩位,然后返回错误。解绑留在工作副本中,
    /// 不随错误回退;调用方放弃整个会话才会撤销。
    pub fn revalidate_grouping<W: SessionWriter + ?Sized>(
        &self,
        writer: &mut W,
        site: SiteId,
    ) -> ValidationResult<Option<String>> {
        match site_grouping(&*writer, site) {
            SiteGrouping::NonContiguous(numbers) => {
                let members: Vec<PicketId> = writer
                    .graph()
                    .pickets_of_site(site)
                    .into_iter()
                    .filter(|p| !writer.is_marked_deleted(EntityRef::Picket(p.id)))
                    .map(|p| p.id)
                    .collect();
                for picket in &members {
                    writer.set_picket_site(*picket, None);
                }
                warn!(site = %site, ?numbers, detached = members.len(), "场地编号不连续,已解绑全部桩位");
                Err(ValidationError::NonContiguousGrouping {
                    site,
                    numbers,
                    detached: members.len(),
                })
            }
            grouping => Ok(grouping.display()),
        }
    }

    // ==========================================
    // 字段规则
    // ==========================================

    /// 保存前字段校验
    pub fn validate_fields<V: SessionView + ?Sized>(
        &self,
        view: &V,
        entity: EntityRef,
    ) -> ValidationResult<()> {
        let graph = view.graph();
        match entity {
            EntityRef::Warehouse(id) => {
                let Some(wh) = graph.warehouses.get(&id) else {
                    return Ok(());
                };
                let number = required(EntityKind::Warehouse, "number", &wh.number)?;
                let duplicate = graph.warehouses.values().any(|other| {
                    other.id != id
                        && other.number.trim() == number
                        && !view.is_marked_deleted(EntityRef::Warehouse(other.id))
                });
                unique(EntityKind::Warehouse, "number", number, duplicate)
            }
            EntityRef::Cargo(id) => {
                let Some(cargo) = graph.cargos.get(&id) else {
                    return Ok(());
                };
                let name = required(EntityKind::Cargo, "name", &cargo.name)?;
                let duplicate = graph.cargos.values().any(|other| {
                    other.id != id
                        && other.name.trim() == name
                        && !view.is_marked_deleted(EntityRef::Cargo(other.id))
                });
                unique(EntityKind::Cargo, "name", name, duplicate)
            }
            EntityRef::Site(id) => {
                let Some(site) = graph.sites.get(&id) else {
                    return Ok(());
                };
                if site.warehouse.is_none() {
                    return Err(ValidationError::RequiredFieldMissing {
                        entity: EntityKind::Site,
                        field: "warehouse".to_string(),
                    });
                }
                Ok(())
            }
            EntityRef::Picket(id) => {
                let Some(picket) = graph.pickets.get(&id) else {
                    return Ok(());
                };
                required(EntityKind::Picket, "local_number", &picket.local_number)?;
                let full = graph.picket_full_number(picket);
                let duplicate = graph.pickets.values().any(|other| {
                    other.id != id
                        && same_number(other, picket)
                        && !view.is_marked_deleted(EntityRef::Picket(other.id))
                });
                unique(EntityKind::Picket, "full_number", &full, duplicate)?;
                if let Some(site) = picket.site {
                    self.check_assignment(view, id, site)?;
                }
                Ok(())
            }
            EntityRef::Placement(id) => {
                let Some(placement) = graph.placements.get(&id) else {
                    return Ok(());
                };
                if placement.weight < Decimal::ZERO {
                    return Err(ValidationError::InvalidValue {
                        entity: EntityKind::Placement,
                        field: "weight".to_string(),
                        message: format!("重量不能为负数: {:.3}", placement.weight),
                    });
                }
                let picket_live = graph.pickets.contains_key(&placement.picket)
                    && !view.is_marked_deleted(EntityRef::Picket(placement.picket));
                if !picket_live {
                    return Err(ValidationError::RequiredFieldMissing {
                        entity: EntityKind::Placement,
                        field: "picket".to_string(),
                    });
                }
                let cargo_live = graph.cargos.contains_key(&placement.cargo)
                    && !view.is_marked_deleted(EntityRef::Cargo(placement.cargo));
                if !cargo_live {
                    return Err(ValidationError::RequiredFieldMissing {
                        entity: EntityKind::Placement,
                        field: "cargo".to_string(),
                    });
                }
                Ok(())
            }
        }
    }

    // ==========================================
    // 删除规则
    // ==========================================

    /// 仓库、货物仍被引用时不可删除
    pub fn check_deletable<V: SessionView + ?Sized>(
        &self,
        view: &V,
        entity: EntityRef,
    ) -> ValidationResult<()> {
        match entity {
            EntityRef::Warehouse(id) => self.check_warehouse_deletable(view, id),
            EntityRef::Cargo(id) => self.check_cargo_deletable(view, id),
            _ => Ok(()),
        }
    }

    fn check_warehouse_deletable<V: SessionView + ?Sized>(
        &self,
        view: &V,
        warehouse: WarehouseId,
    ) -> ValidationResult<()> {
        let graph = view.graph();
        let sites = graph
            .sites_of_warehouse(warehouse)
            .into_iter()
            .filter(|s| !view.is_marked_deleted(EntityRef::Site(s.id)))
            .count();
        if sites > 0 {
            return Err(ValidationError::StillReferenced {
                entity: EntityKind::Warehouse,
                referenced_by: EntityKind::Site,
                count: sites,
            });
        }
        let pickets = graph
            .pickets_of_warehouse(warehouse)
            .into_iter()
            .filter(|p| !view.is_marked_deleted(EntityRef::Picket(p.id)))
            .count();
        if pickets > 0 {
            return Err(ValidationError::StillReferenced {
                entity: EntityKind::Warehouse,
                referenced_by: EntityKind::Picket,
                count: pickets,
            });
        }
        Ok(())
    }

    fn check_cargo_deletable<V: SessionView + ?Sized>(
        &self,
        view: &V,
        cargo: CargoId,
    ) -> ValidationResult<()> {
        let count = view
            .graph()
            .placements_of_cargo(cargo)
            .into_iter()
            .filter(|p| !view.is_marked_deleted(EntityRef::Placement(p.id)))
            .count();
        if count > 0 {
            return Err(ValidationError::StillReferenced {
                entity: EntityKind::Cargo,
                referenced_by: EntityKind::Placement,
                count,
            });
        }
        Ok(())
    }
}

fn required<'a>(entity: EntityKind, field: &str, value: &'a str) -> ValidationResult<&'a str> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::RequiredFieldMissing {
            entity,
            field: field.to_string(),
        });
    }
    Ok(trimmed)
}

fn unique(entity: EntityKind, field: &str, value: &str, duplicate: bool) -> ValidationResult<()> {
    if duplicate {
        return Err(ValidationError::UniquenessViolation {
            entity,
            field: field.to_string(),
            value: value.to_string(),
        });
    }
    Ok(())
}

/// 同一仓库下的相同编号 (完整编号相同)
fn same_number(a: &Picket, b: &Picket) -> bool {
    a.warehouse == b.warehouse && a.local_number.trim() == b.local_number.trim()
}

fn warehouse_number(graph: &WarehouseGraph, id: WarehouseId) -> String {
    graph
        .warehouses
        .get(&id)
        .map(|w| w.number.clone())
        .unwrap_or_else(|| id.to_string())
}
