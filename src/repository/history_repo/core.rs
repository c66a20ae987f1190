use crate::domain::history::HistoryRecord;
use crate::repository::codec::decimal_text;
use crate::repository::error::{RepositoryError, RepositoryResult};
use rusqlite::{params, Connection};
use std::sync::{Arc, Mutex};

/// 时间戳存储格式 (保留小数秒,保证同一秒内的记录可排序)
pub(super) const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f";

// ==========================================
// HistoryRecordRepository - 变更历史仓储
// ==========================================
// 红线: Repository 不做业务逻辑,只做数据映射
pub struct HistoryRecordRepository {
    conn: Arc<Mutex<Connection>>,
}

impl HistoryRecordRepository {
    /// 创建新的历史仓储
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    /// 获取数据库连接
    pub(super) fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    // ==========================================
    // 写入操作
    // ==========================================

    /// 插入单条历史记录
    ///
    /// # 返回
    /// - `Ok(seq)`: 分配的顺序号
    pub fn insert(&self, record: &HistoryRecord) -> RepositoryResult<i64> {
        let conn = self.get_conn()?;
        Self::insert_with(&conn, record)
    }

    /// 在调用方持有的连接 (或事务) 上插入
    ///
    /// seq 取当前最大值 + 1,调用方已持有写锁
    pub fn insert_with(conn: &Connection, record: &HistoryRecord) -> RepositoryResult<i64> {
        let seq: i64 = conn.query_row(
            "SELECT COALESCE(MAX(seq), 0) + 1 FROM history_record",
            [],
            |row| row.get(0),
        )?;

        conn.execute(
            r#"
            INSERT INTO history_record (
                history_id, seq, changed_at, action_type, actor,
                site_id, warehouse_id, placement_id,
                weight_change, current_total_weight, detail, picket_info
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
            params![
                record.id.to_string(),
                seq,
                record.timestamp.format(TIMESTAMP_FORMAT).to_string(),
                record.action_type,
                record.actor,
                record.site.map(|id| id.to_string()),
                record.warehouse.map(|id| id.to_string()),
                record.placement.map(|id| id.to_string()),
                record.weight_change.map(decimal_text),
                record.current_total_weight.map(decimal_text),
                record.detail,
                record.picket_info,
            ],
        )?;

        Ok(seq)
    }

    /// 按顺序追加一批记录
    pub fn append_all(conn: &Connection, records: &[HistoryRecord]) -> RepositoryResult<usize> {
        for record in records {
            Self::insert_with(conn, record)?;
        }
        Ok(records.len())
    }
}
