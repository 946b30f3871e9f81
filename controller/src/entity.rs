pub mod admin_user;
pub mod auth_session;
pub mod device;
pub mod hotspot_profile;
pub mod hotspot_user;
pub mod pppoe_profile;
pub mod pppoe_user;
pub mod user_session;

pub use admin_user::Entity as AdminUser;
pub use auth_session::Entity as AuthSession;
pub use device::Entity as Device;
pub use hotspot_profile::Entity as HotspotProfile;
pub use hotspot_user::Entity as HotspotUser;
pub use pppoe_profile::Entity as PppoeProfile;
pub use pppoe_user::Entity as PppoeUser;
pub use user_session::Entity as UserSession;

/// 设备状态
pub const STATUS_ONLINE: &str = "online";
pub const STATUS_OFFLINE: &str = "offline";

/// 账号 / 会话状态
pub const STATUS_ACTIVE: &str = "active";
pub const STATUS_DISABLED: &str = "disabled";
pub const STATUS_CLOSED: &str = "closed";
