use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "device")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub name: String,
    #[serde(rename = "deviceType")]
    pub device_type: String,
    #[sea_orm(unique)]
    #[serde(rename = "ipAddress")]
    pub ip_address: String,
    #[serde(rename = "apiPort")]
    pub api_port: i32,
    pub username: String,
    /// 路由器管理密码，不对外输出
    #[serde(skip_serializing, default)]
    pub password: String,
    pub location: Option<String>,
    pub description: Option<String>,
    pub status: String,
    #[serde(rename = "lastSeen")]
    pub last_seen: Option<DateTime>,
    #[serde(rename = "routerIdentity")]
    pub router_identity: Option<String>,
    #[serde(rename = "routerVersion")]
    pub router_version: Option<String>,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::hotspot_user::Entity")]
    HotspotUsers,
    #[sea_orm(has_many = "super::pppoe_user::Entity")]
    PppoeUsers,
    #[sea_orm(has_many = "super::hotspot_profile::Entity")]
    HotspotProfiles,
    #[sea_orm(has_many = "super::pppoe_profile::Entity")]
    PppoeProfiles,
    #[sea_orm(has_many = "super::user_session::Entity")]
    UserSessions,
}

impl Related<super::hotspot_user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::HotspotUsers.def()
    }
}

impl Related<super::pppoe_user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::PppoeUsers.def()
    }
}

impl Related<super::hotspot_profile::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::HotspotProfiles.def()
    }
}

impl Related<super::pppoe_profile::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::PppoeProfiles.def()
    }
}

impl Related<super::user_session::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::UserSessions.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    pub fn is_online(&self) -> bool {
        self.status == crate::entity::STATUS_ONLINE
    }
}
