// ==========================================
// 仓库容量与审计引擎 - 变更历史数据仓储
// ==========================================
// 对齐: history_record 表
// 红线: 只追加,不提供更新/删除接口
// ==========================================

mod core;
mod queries;

#[cfg(test)]
mod tests;

pub use core::HistoryRecordRepository;
