use super::core::{HistoryRecordRepository, TIMESTAMP_FORMAT};
use crate::domain::history::HistoryRecord;
use crate::domain::types::{HistoryId, PlacementId, SiteId, WarehouseId};
use crate::repository::codec::{get_opt_decimal, get_opt_uuid, get_uuid};
use crate::repository::error::RepositoryResult;
use chrono::NaiveDateTime;
use rusqlite::types::Type;
use rusqlite::{params, Result as SqliteResult, Row, ToSql};

const SELECT_COLUMNS: &str = r#"
    SELECT history_id, changed_at, action_type, actor,
           site_id, warehouse_id, placement_id,
           weight_change, current_total_weight, detail, picket_info
    FROM history_record
"#;

impl HistoryRecordRepository {
    // ==========================================
    // 查询操作
    // ==========================================

    /// 按 history_id 查询单条记录
    pub fn find_by_id(&self, id: HistoryId) -> RepositoryResult<Option<HistoryRecord>> {
        let conn = self.get_conn()?;
        let sql = format!("{} WHERE history_id = ?", SELECT_COLUMNS);
        let mut stmt = conn.prepare(&sql)?;

        match stmt.query_row(params![id.to_string()], |row| self.map_row(row)) {
            Ok(record) => Ok(Some(record)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// 查询场地的全部历史 (按写入顺序)
    pub fn find_by_site(&self, site: SiteId) -> RepositoryResult<Vec<HistoryRecord>> {
        self.query_ordered("WHERE site_id = ?", &[&site.to_string()])
    }

    /// 查询仓库的全部历史 (按写入顺序)
    pub fn find_by_warehouse(&self, warehouse: WarehouseId) -> RepositoryResult<Vec<HistoryRecord>> {
        self.query_ordered("WHERE warehouse_id = ?", &[&warehouse.to_string()])
    }

    /// 查询某次落位的全部历史 (落位删除后仍可查询)
    pub fn find_by_placement(&self, placement: PlacementId) -> RepositoryResult<Vec<HistoryRecord>> {
        self.query_ordered("WHERE placement_id = ?", &[&placement.to_string()])
    }

    /// 查询操作人的历史
    pub fn find_by_actor(&self, actor: &str) -> RepositoryResult<Vec<HistoryRecord>> {
        self.query_ordered("WHERE actor = ?", &[&actor])
    }

    /// 查询全部历史 (按写入顺序)
    pub fn find_all(&self) -> RepositoryResult<Vec<HistoryRecord>> {
        self.query_ordered("", &[])
    }

    /// 查询最近 N 条记录 (最新在前)
    pub fn find_recent(&self, limit: usize) -> RepositoryResult<Vec<HistoryRecord>> {
        let conn = self.get_conn()?;
        let sql = format!("{} ORDER BY seq DESC LIMIT ?", SELECT_COLUMNS);
        let mut stmt = conn.prepare(&sql)?;

        let records = stmt
            .query_map(params![limit as i64], |row| self.map_row(row))?
            .collect::<SqliteResult<Vec<_>>>()?;

        Ok(records)
    }

    /// 记录总数
    pub fn count(&self) -> RepositoryResult<i64> {
        let conn = self.get_conn()?;
        let count = conn.query_row("SELECT COUNT(*) FROM history_record", [], |row| row.get(0))?;
        Ok(count)
    }

    fn query_ordered(
        &self,
        filter: &str,
        args: &[&dyn ToSql],
    ) -> RepositoryResult<Vec<HistoryRecord>> {
        let conn = self.get_conn()?;
        let sql = format!("{} {} ORDER BY seq ASC", SELECT_COLUMNS, filter);
        let mut stmt = conn.prepare(&sql)?;

        let records = stmt
            .query_map(args, |row| self.map_row(row))?
            .collect::<SqliteResult<Vec<_>>>()?;

        Ok(records)
    }

    /// 映射数据库行到 HistoryRecord
    fn map_row(&self, row: &Row) -> SqliteResult<HistoryRecord> {
        let changed_at: String = row.get(1)?;
        let timestamp = NaiveDateTime::parse_from_str(&changed_at, TIMESTAMP_FORMAT)
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(1, Type::Text, Box::new(e)))?;

        Ok(HistoryRecord {
            id: HistoryId(get_uuid(row, 0)?),
            timestamp,
            action_type: row.get(2)?,
            actor: row.get(3)?,
            site: get_opt_uuid(row, 4)?.map(SiteId),
            warehouse: get_opt_uuid(row, 5)?.map(WarehouseId),
            placement: get_opt_uuid(row, 6)?.map(PlacementId),
            weight_change: get_opt_decimal(row, 7)?,
            current_total_weight: get_opt_decimal(row, 8)?,
            detail: row.get(9)?,
            picket_info: row.get(10)?,
        })
    }
}
