//! Permission entity (an authorization edge granting a key access to a
//! door).

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "permissions")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,

    pub key_id: i64,

    pub door_id: i64,

    /// The administrator who granted (or last re-granted) this permission.
    /// Audit field only; intentionally not a foreign key so the trail
    /// survives user deletion.
    pub granted_by: i64,

    pub granted_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::access_key::Entity",
        from = "Column::KeyId",
        to = "super::access_key::Column::Id",
        on_delete = "Cascade"
    )]
    AccessKey,

    #[sea_orm(
        belongs_to = "super::door::Entity",
        from = "Column::DoorId",
        to = "super::door::Column::Id",
        on_delete = "Cascade"
    )]
    Door,
}

impl Related<super::access_key::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::AccessKey.def()
    }
}

impl Related<super::door::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Door.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
