// ==========================================
// 仓库容量与审计引擎 - 引擎层
// ==========================================
// 职责: 聚合计算、约束校验、单次执行守卫、审计记录
// 红线: Engine 不拼 SQL, 所有拒绝必须输出原因
// ==========================================

pub mod aggregation;
pub mod audit;
pub mod error;
pub mod grouping;
pub mod guard;
pub mod hooks;
pub mod validator;
pub mod view;

// 重导出核心引擎
pub use audit::{ActorProvider, AuditRecorder, FixedActor, SystemActor};
pub use error::{ValidationError, ValidationResult};
pub use grouping::SiteGrouping;
pub use guard::{SaveGuard, TxContext};
pub use hooks::{ConsistencyEngine, EngineStatsSnapshot, SaveHooks};
pub use validator::ConstraintValidator;
pub use view::{SessionView, SessionWriter};
