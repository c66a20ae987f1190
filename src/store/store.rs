// ==========================================
// 仓库容量与审计引擎 - 存储入口
// ==========================================
// 职责:
// - 打开 SQLite 数据库,初始化表结构,加载配置与已提交实体图
// - 持有一致性引擎 (保存/删除钩子)
// - 开启会话;会话在整个生命周期内持有实体图锁 (悲观锁)
// - 历史记录查询
// ==========================================

use crate::config::{ConfigManager, EngineConfig};
use crate::db::{init_schema, open_in_memory_connection, open_sqlite_connection};
use crate::domain::graph::WarehouseGraph;
use crate::domain::history::HistoryRecord;
use crate::domain::types::{PlacementId, SiteId, WarehouseId};
use crate::engine::audit::{ActorProvider, SystemActor};
use crate::engine::error::ValidationError;
use crate::engine::hooks::{ConsistencyEngine, EngineStatsSnapshot};
use crate::repository::error::RepositoryError;
use crate::repository::{HierarchyRepository, HistoryRecordRepository};
use crate::store::session::Session;
use rusqlite::Connection;
use std::sync::{Arc, Mutex, MutexGuard};
use thiserror::Error;
use tracing::info;

// ==========================================
// StoreError - 存储层错误
// ==========================================
#[derive(Error, Debug)]
pub enum StoreError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Repository(#[from] RepositoryError),

    #[error("对象不存在: {entity} id={id}")]
    NotFound { entity: String, id: String },

    #[error("实体图锁已损坏: {0}")]
    LockPoisoned(String),
}

impl StoreError {
    pub(crate) fn not_found(entity: &str, id: impl ToString) -> Self {
        StoreError::NotFound {
            entity: entity.to_string(),
            id: id.to_string(),
        }
    }

    /// 是否为业务校验失败
    pub fn validation(&self) -> Option<&ValidationError> {
        match self {
            StoreError::Validation(err) => Some(err),
            _ => None,
        }
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> Self {
        StoreError::Repository(err.into())
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

// ==========================================
// Store - 存储
// ==========================================
pub struct Store {
    graph: Mutex<WarehouseGraph>,
    conn: Arc<Mutex<Connection>>,
    hierarchy: HierarchyRepository,
    history: HistoryRecordRepository,
    engine: ConsistencyEngine,
    config: EngineConfig,
    actor: Arc<dyn ActorProvider>,
}

impl Store {
    /// 打开 (或创建) 数据库文件
    pub fn open(db_path: &str) -> StoreResult<Self> {
        let conn = open_sqlite_connection(db_path)?;
        info!(db_path, "打开数据库");
        Self::from_connection(conn)
    }

    /// 内存数据库 (测试与演示)
    pub fn open_in_memory() -> StoreResult<Self> {
        Self::from_connection(open_in_memory_connection()?)
    }

    fn from_connection(conn: Connection) -> StoreResult<Self> {
        init_schema(&conn)?;
        let conn = Arc::new(Mutex::new(conn));

        let config = ConfigManager::from_connection(conn.clone()).load_engine_config()?;
        let hierarchy = HierarchyRepository::new(conn.clone());
        let graph = hierarchy.load_graph()?;
        let actor: Arc<dyn ActorProvider> = Arc::new(SystemActor);

        info!(
            picket_capacity = %config.picket_capacity,
            warehouses = graph.warehouses.len(),
            "存储已就绪"
        );

        Ok(Self {
            graph: Mutex::new(graph),
            history: HistoryRecordRepository::new(conn.clone()),
            hierarchy,
            engine: ConsistencyEngine::new(&config, actor.clone()),
            conn,
            config,
            actor,
        })
    }

    /// 替换操作人来源 (计数器随引擎重建清零)
    pub fn with_actor(mut self, actor: Arc<dyn ActorProvider>) -> Self {
        self.engine = ConsistencyEngine::new(&self.config, actor.clone());
        self.actor = actor;
        self
    }

    /// 替换引擎配置 (只作用于本实例,不写回 config_kv)
    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.engine = ConsistencyEngine::new(&config, self.actor.clone());
        self.config = config;
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// 配置管理器 (与存储共用连接)
    pub fn config_manager(&self) -> ConfigManager {
        ConfigManager::from_connection(self.conn.clone())
    }

    pub(crate) fn engine(&self) -> &ConsistencyEngine {
        &self.engine
    }

    pub(crate) fn hierarchy(&self) -> &HierarchyRepository {
        &self.hierarchy
    }

    pub fn engine_stats(&self) -> EngineStatsSnapshot {
        self.engine.stats()
    }

    fn lock_graph(&self) -> StoreResult<MutexGuard<'_, WarehouseGraph>> {
        self.graph
            .lock()
            .map_err(|e| StoreError::LockPoisoned(e.to_string()))
    }

    // ==========================================
    // 会话
    // ==========================================

    /// 开启会话;若已有会话未结束则阻塞等待
    pub fn begin(&self) -> StoreResult<Session<'_>> {
        let guard = self.lock_graph()?;
        Ok(Session::new(self, guard))
    }

    /// 已提交实体图的只读副本
    pub fn snapshot(&self) -> StoreResult<WarehouseGraph> {
        Ok(self.lock_graph()?.clone())
    }

    // ==========================================
    // 历史查询
    // ==========================================

    pub fn history(&self) -> StoreResult<Vec<HistoryRecord>> {
        Ok(self.history.find_all()?)
    }

    pub fn history_of_site(&self, site: SiteId) -> StoreResult<Vec<HistoryRecord>> {
        Ok(self.history.find_by_site(site)?)
    }

    pub fn history_of_warehouse(&self, warehouse: WarehouseId) -> StoreResult<Vec<HistoryRecord>> {
        Ok(self.history.find_by_warehouse(warehouse)?)
    }

    pub fn history_of_placement(&self, placement: PlacementId) -> StoreResult<Vec<HistoryRecord>> {
        Ok(self.history.find_by_placement(placement)?)
    }

    pub fn history_by_actor(&self, actor: &str) -> StoreResult<Vec<HistoryRecord>> {
        Ok(self.history.find_by_actor(actor)?)
    }

    pub fn recent_history(&self, limit: usize) -> StoreResult<Vec<HistoryRecord>> {
        Ok(self.history.find_recent(limit)?)
    }
}
