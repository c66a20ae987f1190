// ==========================================
// 仓库容量与审计引擎 - 领域基础类型
// ==========================================
// 职责: 实体标识 (强类型 ID) 与实体引用
// 红线: 实体之间只通过 ID 引用,不持有对象指针
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

macro_rules! entity_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub Uuid);

        impl $name {
            /// 生成新的随机 ID
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            /// 从数据库存储的字符串解析
            pub fn parse(s: &str) -> Option<Self> {
                Uuid::parse_str(s).ok().map(Self)
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                self.0.fmt(f)
            }
        }
    };
}

entity_id!(
    /// 仓库 ID
    WarehouseId
);
entity_id!(
    /// 场地 ID
    SiteId
);
entity_id!(
    /// 桩位 ID
    PicketId
);
entity_id!(
    /// 货物 ID
    CargoId
);
entity_id!(
    /// 货物落位 ID
    PlacementId
);
entity_id!(
    /// 历史记录 ID
    HistoryId
);

// ==========================================
// EntityKind - 实体种类
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityKind {
    Warehouse,
    Site,
    Picket,
    Cargo,
    Placement,
}

impl EntityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Warehouse => "Warehouse",
            EntityKind::Site => "Site",
            EntityKind::Picket => "Picket",
            EntityKind::Cargo => "Cargo",
            EntityKind::Placement => "Placement",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ==========================================
// EntityRef - 可被保存/删除的实体引用
// ==========================================
// 用途: 变更跟踪、保存钩子的入参
// 说明: HistoryRecord 只追加,不参与保存钩子
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityRef {
    Warehouse(WarehouseId),
    Site(SiteId),
    Picket(PicketId),
    Cargo(CargoId),
    Placement(PlacementId),
}

impl EntityRef {
    pub fn kind(&self) -> EntityKind {
        match self {
            EntityRef::Warehouse(_) => EntityKind::Warehouse,
            EntityRef::Site(_) => EntityKind::Site,
            EntityRef::Picket(_) => EntityKind::Picket,
            EntityRef::Cargo(_) => EntityKind::Cargo,
            EntityRef::Placement(_) => EntityKind::Placement,
        }
    }

    /// 底层 UUID (用于日志与错误信息)
    pub fn uuid(&self) -> Uuid {
        match self {
            EntityRef::Warehouse(id) => id.0,
            EntityRef::Site(id) => id.0,
            EntityRef::Picket(id) => id.0,
            EntityRef::Cargo(id) => id.0,
            EntityRef::Placement(id) => id.0,
        }
    }
}

impl fmt::Display for EntityRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.kind(), self.uuid())
    }
}

impl From<WarehouseId> for EntityRef {
    fn from(id: WarehouseId) -> Self {
        EntityRef::Warehouse(id)
    }
}

impl From<SiteId> for EntityRef {
    fn from(id: SiteId) -> Self {
        EntityRef::Site(id)
    }
}

impl From<PicketId> for EntityRef {
    fn from(id: PicketId) -> Self {
        EntityRef::Picket(id)
    }
}

impl From<CargoId> for EntityRef {
    fn from(id: CargoId) -> Self {
        EntityRef::Cargo(id)
    }
}

impl From<PlacementId> for EntityRef {
    fn from(id: PlacementId) -> Self {
        EntityRef::Placement(id)
    }
}
