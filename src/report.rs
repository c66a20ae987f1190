// ==========================================
// 仓库容量与审计引擎 - 仓库重量报表
// ==========================================
// 结构 (按仓库编号排序):
// - 每个场地一行 (场地编号、场地重量),其后是该场地的桩位行
// - 未挂场地的桩位行
// - 仓库合计行
// - 最后一行总计
// 红线: 只读取聚合结果,不修改实体图
// ==========================================

use crate::domain::types::EntityRef;
use crate::engine::aggregation::{picket_weight, site_weight};
use crate::engine::grouping::display_number;
use crate::engine::view::SessionView;
use chrono::{NaiveDateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use std::io::Write;

/// 报表行类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RowKind {
    Site,
    Picket,
    UnattachedPicket,
    WarehouseTotal,
    GrandTotal,
}

/// 报表行
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportRow {
    pub kind: RowKind,
    pub warehouse: String, // 仓库编号,只在仓库的第一行填写
    pub site: String,
    pub picket: String,
    pub weight: Decimal,
}

/// CSV 输出行
#[derive(Serialize)]
struct CsvRow<'a> {
    warehouse: &'a str,
    site: &'a str,
    picket: &'a str,
    weight: String,
}

/// 报表选项
#[derive(Debug, Clone)]
pub struct ReportPolicy {
    pub include_empty_warehouses: bool, // 没有场地也没有桩位的仓库是否输出合计行
    pub unattached_label: String,
    pub warehouse_total_label: String,
    pub grand_total_label: String,
}

impl Default for ReportPolicy {
    fn default() -> Self {
        Self {
            include_empty_warehouses: false,
            unattached_label: "no site".to_string(),
            warehouse_total_label: "warehouse total".to_string(),
            grand_total_label: "TOTAL".to_string(),
        }
    }
}

// ==========================================
// WarehouseReport - 报表
// ==========================================
#[derive(Debug, Clone)]
pub struct WarehouseReport {
    pub generated_at: NaiveDateTime,
    pub rows: Vec<ReportRow>,
    pub grand_total: Decimal,
}

impl WarehouseReport {
    pub fn build<V: SessionView + ?Sized>(view: &V, policy: &ReportPolicy) -> Self {
        let graph = view.graph();
        let mut rows = Vec::new();
        let mut grand_total = Decimal::ZERO;
        let mut any_content = false;

        let mut warehouses: Vec<_> = graph
            .warehouses
            .values()
            .filter(|w| !view.is_marked_deleted(EntityRef::Warehouse(w.id)))
            .collect();
        warehouses.sort_by(|a, b| a.number.cmp(&b.number));

        for warehouse in warehouses {
            let mut label = Some(warehouse.number.clone());
            let mut total = Decimal::ZERO;

            let mut sites: Vec<_> = graph
                .sites_of_warehouse(warehouse.id)
                .into_iter()
                .filter(|s| !view.is_marked_deleted(EntityRef::Site(s.id)))
                .map(|s| (display_number(view, s.id).unwrap_or_default(), s.id))
                .collect();
            sites.sort();

            for (number, site) in &sites {
                let weight = site_weight(view, *site);
                total += weight;
                rows.push(ReportRow {
                    kind: RowKind::Site,
                    warehouse: label.take().unwrap_or_default(),
                    site: number.clone(),
                    picket: String::new(),
                    weight,
                });
                for picket in graph.pickets_of_site(*site) {
                    if view.is_marked_deleted(EntityRef::Picket(picket.id)) {
                        continue;
                    }
                    rows.push(ReportRow {
                        kind: RowKind::Picket,
                        warehouse: String::new(),
                        site: String::new(),
                        picket: graph.picket_full_number(picket),
                        weight: picket_weight(view, picket.id),
                    });
                }
            }

            let loose: Vec<_> = graph
                .unattached_pickets(warehouse.id)
                .into_iter()
                .filter(|p| !view.is_marked_deleted(EntityRef::Picket(p.id)))
                .collect();
            for picket in &loose {
                let weight = picket_weight(view, picket.id);
                total += weight;
                rows.push(ReportRow {
                    kind: RowKind::UnattachedPicket,
                    warehouse: label.take().unwrap_or_default(),
                    site: policy.unattached_label.clone(),
                    picket: graph.picket_full_number(picket),
                    weight,
                });
            }

            let has_content = !sites.is_empty() || !loose.is_empty();
            if has_content || policy.include_empty_warehouses {
                rows.push(ReportRow {
                    kind: RowKind::WarehouseTotal,
                    warehouse: label.take().unwrap_or_default(),
                    site: policy.warehouse_total_label.clone(),
                    picket: String::new(),
                    weight: total,
                });
                grand_total += total;
                any_content = true;
            }
        }

        if any_content {
            rows.push(ReportRow {
                kind: RowKind::GrandTotal,
                warehouse: policy.grand_total_label.clone(),
                site: String::new(),
                picket: String::new(),
                weight: grand_total,
            });
        }

        Self {
            generated_at: Utc::now().naive_utc(),
            rows,
            grand_total,
        }
    }

    /// 输出 CSV,重量保留三位小数
    pub fn write_csv<W: Write>(&self, writer: W) -> csv::Result<()> {
        let mut wtr = csv::Writer::from_writer(writer);
        for row in &self.rows {
            wtr.serialize(CsvRow {
                warehouse: &row.warehouse,
                site: &row.site,
                picket: &row.picket,
                weight: format!("{:.3}", row.weight),
            })?;
        }
        wtr.flush()?;
        Ok(())
    }

    /// 某类行
    pub fn rows_of(&self, kind: RowKind) -> impl Iterator<Item = &ReportRow> {
        self.rows.iter().filter(move |r| r.kind == kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Cargo, Picket, Placement, Site, Warehouse, WarehouseGraph};
    use rust_decimal_macros::dec;

    fn sample() -> WarehouseGraph {
        let mut graph = WarehouseGraph::new();
        let w1 = Warehouse::new("W1");
        let w2 = Warehouse::new("W2");
        let empty = Warehouse::new("W0");
        let site = Site::new(w1.id);
        let cargo = Cargo::new("coal");

        for (n, weight) in [("1", dec!(1000)), ("2", dec!(250.5))] {
            let mut picket = Picket::new(w1.id, n);
            picket.site = Some(site.id);
            let placement = Placement::new(picket.id, cargo.id, weight);
            graph.placements.insert(placement.id, placement);
            graph.pickets.insert(picket.id, picket);
        }
        let loose = Picket::new(w2.id, "7");
        let placement = Placement::new(loose.id, cargo.id, dec!(40));
        graph.placements.insert(placement.id, placement);
        graph.pickets.insert(loose.id, loose);

        graph.sites.insert(site.id, site);
        graph.cargos.insert(cargo.id, cargo);
        for w in [w1, w2, empty] {
            graph.warehouses.insert(w.id, w);
        }
        graph
    }

    #[test]
    fn test_report_layout() {
        let graph = sample();
        let report = WarehouseReport::build(&graph, &ReportPolicy::default());

        let kinds: Vec<_> = report.rows.iter().map(|r| r.kind).collect();
        assert_eq!(
            kinds,
            vec![
                RowKind::Site,
                RowKind::Picket,
                RowKind::Picket,
                RowKind::WarehouseTotal,
                RowKind::UnattachedPicket,
                RowKind::WarehouseTotal,
                RowKind::GrandTotal,
            ]
        );
        assert_eq!(report.rows[0].warehouse, "W1");
        assert_eq!(report.rows[0].site, "1-2");
        assert_eq!(report.rows[1].picket, "W1/1");
        assert_eq!(report.rows[4].warehouse, "W2");
        assert_eq!(report.rows[4].site, "no site");
        assert_eq!(report.grand_total, dec!(1290.5));
    }

    #[test]
    fn test_empty_warehouse_policy() {
        let graph = sample();
        let policy = ReportPolicy {
            include_empty_warehouses: true,
            ..ReportPolicy::default()
        };
        let report = WarehouseReport::build(&graph, &policy);
        let first = &report.rows[0];
        assert_eq!(first.kind, RowKind::WarehouseTotal);
        assert_eq!(first.warehouse, "W0");
        assert_eq!(first.weight, Decimal::ZERO);
        assert_eq!(report.rows_of(RowKind::WarehouseTotal).count(), 3);
    }

    #[test]
    fn test_write_csv() {
        let graph = sample();
        let report = WarehouseReport::build(&graph, &ReportPolicy::default());
        let mut out = Vec::new();
        report.write_csv(&mut out).unwrap();
        let text = String::from_utf8(out).unwrap();

        let lines: Vec<_> = text.lines().collect();
        assert_eq!(lines[0], "warehouse,site,picket,weight");
        assert_eq!(lines[1], "W1,1-2,,1250.500");
        assert_eq!(lines[2], ",,W1/1,1000.000");
        assert_eq!(lines.last().copied(), Some("TOTAL,,,1290.500"));
    }

    #[test]
    fn test_empty_graph_has_no_rows() {
        let report = WarehouseReport::build(&WarehouseGraph::new(), &ReportPolicy::default());
        assert!(report.rows.is_empty());
        assert_eq!(report.grand_total, Decimal::ZERO);
    }
}
