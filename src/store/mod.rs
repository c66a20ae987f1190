// ==========================================
// 仓库容量与审计引擎 - 数据访问层
// ==========================================
// 职责: 变更跟踪、嵌套事务层、提交管线、悲观锁
// 依赖: engine (保存/删除钩子) + repository (SQLite 落库)
// ==========================================

pub mod session;
#[allow(clippy::module_inception)]
pub mod store;
pub mod unit_of_work;

pub use session::Session;
pub use store::{Store, StoreError, StoreResult};
pub use unit_of_work::{ChangeSet, UnitOfWork};
