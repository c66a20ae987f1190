// ==========================================
// 仓库容量与审计引擎 - 场地编号计算
// ==========================================
// 规则:
// - 解析场地下各桩位的仓库内编号为整数,无法解析的忽略
// - 无可解析编号: 场地编号为空
// - 排序后连续递增: 单个为 "n", 多个为 "first-last"
// - 存在缺口或重复 (且多于一个): 违反连续性约束
// 红线: 只读计算,不修改任何对象 (修正动作见 validator::revalidate_grouping)
// ==========================================

use crate::domain::types::{EntityRef, SiteId};
use crate::engine::view::SessionView;

// ==========================================
// SiteGrouping - 场地编号分组结果
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SiteGrouping {
    /// 没有可解析为整数的桩位编号
    Empty,
    Single(i64),
    Range { first: i64, last: i64 },
    /// 排序后的编号存在缺口或重复
    NonContiguous(Vec<i64>),
}

impl SiteGrouping {
    /// 由编号集合计算分组
    pub fn from_numbers(mut numbers: Vec<i64>) -> Self {
        numbers.sort_unstable();
        let (first, last) = match (numbers.first(), numbers.last()) {
            (Some(first), Some(last)) => (*first, *last),
            _ => return SiteGrouping::Empty,
        };
        if numbers.len() == 1 {
            return SiteGrouping::Single(first);
        }
        if numbers.windows(2).all(|w| w[0].checked_add(1) == Some(w[1])) {
            SiteGrouping::Range { first, last }
        } else {
            SiteGrouping::NonContiguous(numbers)
        }
    }

    /// 显示编号 (空或不连续时为 None)
    pub fn display(&self) -> Option<String> {
        match self {
            SiteGrouping::Empty | SiteGrouping::NonContiguous(_) => None,
            SiteGrouping::Single(n) => Some(n.to_string()),
            SiteGrouping::Range { first, last } => Some(format!("{}-{}", first, last)),
        }
    }

    pub fn is_contiguous(&self) -> bool {
        !matches!(self, SiteGrouping::NonContiguous(_))
    }
}

/// 计算场地的编号分组 (不含已标记删除的桩位)
pub fn site_grouping<V: SessionView + ?Sized>(view: &V, site: SiteId) -> SiteGrouping {
    let numbers = view
        .graph()
        .pickets_of_site(site)
        .into_iter()
        .filter(|p| !view.is_marked_deleted(EntityRef::Picket(p.id)))
        .filter_map(|p| p.numeric_number())
        .collect();
    SiteGrouping::from_numbers(numbers)
}

/// 场地显示编号
pub fn display_number<V: SessionView + ?Sized>(view: &V, site: SiteId) -> Option<String> {
    site_grouping(view, site).display()
}
