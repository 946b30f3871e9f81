use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "hotspot_profile")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    #[serde(rename = "deviceId")]
    pub device_id: i64,
    pub name: String,
    #[serde(rename = "rateLimit")]
    pub rate_limit: Option<String>,
    #[serde(rename = "sharedUsers")]
    pub shared_users: Option<i32>,
    #[serde(rename = "sessionTimeout")]
    pub session_timeout: Option<String>,
    #[serde(rename = "idleTimeout")]
    pub idle_timeout: Option<String>,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::device::Entity",
        from = "Column::DeviceId",
        to = "super::device::Column::Id"
    )]
    Device,
}

impl Related<super::device::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Device.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
