// ==========================================
// 仓库容量与审计引擎 - 保存管线单次执行守卫
// ==========================================
// 背景: 事务机制可能对同一逻辑保存,按嵌套层数多次调用保存钩子
// 规则:
// - 只有最外层 (没有父事务层) 的调用执行校验与审计
// - 已在本事务中标记删除的实体不执行保存校验 (删除有自己的钩子)
// 红线: 纯谓词,每次调用重新计算,不缓存、不修改状态
// ==========================================

use crate::domain::types::EntityRef;
use crate::engine::view::SessionView;
use uuid::Uuid;

// ==========================================
// TxContext - 事务上下文
// ==========================================
// 显式传入每次保存/删除调用,不依赖全局会话
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TxContext {
    tx_id: Uuid,
    depth: u32, // 0 = 最外层
}

impl TxContext {
    /// 最外层事务上下文
    pub fn root() -> Self {
        Self {
            tx_id: Uuid::new_v4(),
            depth: 0,
        }
    }

    /// 派生子事务层上下文
    pub fn child(&self) -> Self {
        Self {
            tx_id: self.tx_id,
            depth: self.depth + 1,
        }
    }

    pub fn has_parent(&self) -> bool {
        self.depth > 0
    }

    pub fn depth(&self) -> u32 {
        self.depth
    }

    pub fn tx_id(&self) -> Uuid {
        self.tx_id
    }
}

// ==========================================
// SaveGuard - 单次执行判定
// ==========================================
pub struct SaveGuard;

impl SaveGuard {
    /// 当前调用是否为需要执行的那一次 (最外层)
    pub fn is_single_execution(ctx: &TxContext) -> bool {
        !ctx.has_parent()
    }

    /// 保存钩子是否应执行校验与审计
    pub fn should_run_on_save<V: SessionView + ?Sized>(
        ctx: &TxContext,
        view: &V,
        entity: EntityRef,
    ) -> bool {
        Self::is_single_execution(ctx) && !view.is_marked_deleted(entity)
    }
}
