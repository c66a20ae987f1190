// ==========================================
// 仓库容量与审计引擎 - 保存/删除钩子
// ==========================================
// 契约:
// - before_save(entity, ctx): 提交管线每层对每个脏实体调用一次
// - before_delete(entity, ctx): 删除请求发生时调用一次 (实体尚未标记删除)
// 流程: 单次执行守卫 -> 字段校验 -> 容量校验 -> 审计记录
// ==========================================

use crate::config::EngineConfig;
use crate::domain::history::HistoryAction;
use crate::domain::types::{EntityRef, PicketId, SiteId};
use crate::engine::audit::{ActorProvider, AuditRecorder};
use crate::engine::error::ValidationResult;
use crate::engine::guard::{SaveGuard, TxContext};
use crate::engine::validator::ConstraintValidator;
use crate::engine::view::SessionWriter;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::debug;

// ==========================================
// SaveHooks - 持久层在提交时调用的钩子
// ==========================================
pub trait SaveHooks {
    fn before_save(
        &self,
        session: &mut dyn SessionWriter,
        entity: EntityRef,
        ctx: &TxContext,
    ) -> ValidationResult<()>;

    fn before_delete(
        &self,
        session: &mut dyn SessionWriter,
        entity: EntityRef,
        ctx: &TxContext,
    ) -> ValidationResult<()>;
}

// ==========================================
// EngineStats - 引擎计数器
// ==========================================
#[derive(Debug, Default)]
pub struct EngineStats {
    save_invocations: AtomicU64,
    suppressed_invocations: AtomicU64,
    delete_invocations: AtomicU64,
    capacity_checks: AtomicU64,
    history_records: AtomicU64,
}

/// 计数器快照
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineStatsSnapshot {
    pub save_invocations: u64,
    pub suppressed_invocations: u64,
    pub delete_invocations: u64,
    pub capacity_checks: u64,
    pub history_records: u64,
}

impl EngineStats {
    pub fn snapshot(&self) -> EngineStatsSnapshot {
        EngineStatsSnapshot {
            save_invocations: self.save_invocations.load(Ordering::Relaxed),
            suppressed_invocations: self.suppressed_invocations.load(Ordering::Relaxed),
            delete_invocations: self.delete_invocations.load(Ordering::Relaxed),
            capacity_checks: self.capacity_checks.load(Ordering::Relaxed),
            history_records: self.history_records.load(Ordering::Relaxed),
        }
    }

    fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }
}

// ==========================================
// ConsistencyEngine - 一致性与审计引擎
// ==========================================
pub struct ConsistencyEngine {
    validator: ConstraintValidator,
    recorder: AuditRecorder,
    stats: EngineStats,
}

impl ConsistencyEngine {
    pub fn new(config: &EngineConfig, actor: Arc<dyn ActorProvider>) -> Self {
        Self {
            validator: ConstraintValidator::new(config.picket_capacity),
            recorder: AuditRecorder::new(actor, config.fallback_actor.clone()),
            stats: EngineStats::default(),
        }
    }

    pub fn validator(&self) -> &ConstraintValidator {
        &self.validator
    }

    pub fn recorder(&self) -> &AuditRecorder {
        &self.recorder
    }

    pub fn stats(&self) -> EngineStatsSnapshot {
        self.stats.snapshot()
    }

    /// 记录一条历史后计数
    pub(crate) fn note_history(&self, written: bool) {
        if written {
            EngineStats::bump(&self.stats.history_records);
        }
    }

    /// 场地删除: 先解绑全部桩位 (每个桩位随后落库),再记录删除
    ///
    /// 本事务新建的场地只解绑,不写删除记录。
    fn delete_site(&self, session: &mut dyn SessionWriter, site: SiteId) {
        let members: Vec<PicketId> = session
            .graph()
            .pickets_of_site(site)
            .into_iter()
            .map(|p| p.id)
            .collect();
        for picket in members {
            session.set_picket_site(picket, None);
        }
        if session.is_new(EntityRef::Site(site)) {
            return;
        }
        let written = self
            .recorder
            .record_site_event(&mut *session, site, HistoryAction::SiteRemoved, "site removed".to_string())
            .is_some();
        self.note_history(written);
    }
}

impl SaveHooks for ConsistencyEngine {
    fn before_save(
        &self,
        session: &mut dyn SessionWriter,
        entity: EntityRef,
        ctx: &TxContext,
    ) -> ValidationResult<()> {
        EngineStats::bump(&self.stats.save_invocations);

        if !SaveGuard::should_run_on_save(ctx, &*session, entity) {
            EngineStats::bump(&self.stats.suppressed_invocations);
            debug!(entity = %entity, depth = ctx.depth(), "非单次执行调用,跳过校验与审计");
            return Ok(());
        }

        self.validator.validate_fields(&*session, entity)?;

        match entity {
            EntityRef::Placement(id) => {
                EngineStats::bump(&self.stats.capacity_checks);
                self.validator.check_capacity(&*session, id)?;
                let is_new = session.is_new(entity);
                let written = self
                    .recorder
                    .record_placement_save(&mut *session, id, is_new)
                    .is_some();
                self.note_history(written);
            }
            EntityRef::Site(id) if session.is_new(entity) => {
                let written = self
                    .recorder
                    .record_site_event(&mut *session, id, HistoryAction::SiteCreated, "site created".to_string())
                    .is_some();
                self.note_history(written);
            }
            _ => {}
        }
        Ok(())
    }

    fn before_delete(
        &self,
        session: &mut dyn SessionWriter,
        entity: EntityRef,
        ctx: &TxContext,
    ) -> ValidationResult<()> {
        EngineStats::bump(&self.stats.delete_invocations);
        debug!(entity = %entity, depth = ctx.depth(), "删除钩子");

        match entity {
            // 本事务新建的落位没有新增记录,删除也不记录
            EntityRef::Placement(_) if session.is_new(entity) => {}
            EntityRef::Placement(id) => {
                let written = self.recorder.record_placement_removal(&mut *session, id).is_some();
                self.note_history(written);
            }
            EntityRef::Site(id) => self.delete_site(session, id),
            EntityRef::Warehouse(_) | EntityRef::Cargo(_) => {
                self.validator.check_deletable(&*session, entity)?;
            }
            EntityRef::Picket(_) => {}
        }
        Ok(())
    }
}
