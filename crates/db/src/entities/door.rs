//! Door entity (a physical access point with a network-addressable lock
//! controller).

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Last-known lock state of a door.
///
/// Advisory only: it reflects the last acknowledged command, never ground
/// truth for authorization. Authorization is decided solely from the
/// permission table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "lowercase")]
pub enum DoorStatus {
    #[sea_orm(string_value = "locked")]
    Locked,
    #[sea_orm(string_value = "unlocked")]
    Unlocked,
    #[sea_orm(string_value = "unknown")]
    Unknown,
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "doors")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,

    pub name: String,

    pub location: String,

    /// Network address of the lock controller (host or host:port).
    pub device_address: String,

    pub status: DoorStatus,

    /// Timestamp of the last acknowledged controller contact.
    #[sea_orm(nullable)]
    pub last_seen_at: Option<DateTimeWithTimeZone>,

    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::permission::Entity")]
    Permission,
}

impl Related<super::permission::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Permission.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
