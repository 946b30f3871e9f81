use sea_orm_migration::prelude::*;
use sea_orm_migration::schema::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // 创建 device 表
        manager
            .create_table(
                Table::create()
                    .table(Device::Table)
                    .if_not_exists()
                    .col(big_integer(Device::Id).auto_increment().primary_key())
                    .col(string(Device::Name))
                    .col(string(Device::DeviceType).default("mikrotik"))
                    .col(string(Device::IpAddress).unique_key())
                    .col(integer(Device::ApiPort).default(8728))
                    .col(string(Device::Username))
                    .col(string(Device::Password))
                    .col(string_null(Device::Location))
                    .col(string_null(Device::Description))
                    .col(string(Device::Status).default("offline"))
                    .col(timestamp_null(Device::LastSeen))
                    .col(string_null(Device::RouterIdentity))
                    .col(string_null(Device::RouterVersion))
                    .col(timestamp(Device::CreatedAt))
                    .col(timestamp(Device::UpdatedAt))
                    .to_owned(),
            )
            .await?;

        // 创建 hotspot_user 表
        manager
            .create_table(
                Table::create()
                    .table(HotspotUser::Table)
                    .if_not_exists()
                    .col(big_integer(HotspotUser::Id).auto_increment().primary_key())
                    .col(big_integer(HotspotUser::DeviceId))
                    .col(string(HotspotUser::Username))
                    .col(string(HotspotUser::Password))
                    .col(string_null(HotspotUser::Profile))
                    .col(string_null(HotspotUser::Comment))
                    .col(string(HotspotUser::Status).default("active"))
                    .col(timestamp(HotspotUser::CreatedAt))
                    .col(timestamp(HotspotUser::UpdatedAt))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_hotspot_user_device")
                            .from(HotspotUser::Table, HotspotUser::DeviceId)
                            .to(Device::Table, Device::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // 同一设备下用户名唯一
        manager
            .create_index(
                Index::create()
                    .name("idx_hotspot_user_device_username")
                    .table(HotspotUser::Table)
                    .col(HotspotUser::DeviceId)
                    .col(HotspotUser::Username)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // 创建 pppoe_user 表
        manager
            .create_table(
                Table::create()
                    .table(PppoeUser::Table)
                    .if_not_exists()
                    .col(big_integer(PppoeUser::Id).auto_increment().primary_key())
                    .col(big_integer(PppoeUser::DeviceId))
                    .col(string(PppoeUser::Username))
                    .col(string(PppoeUser::Password))
                    .col(string_null(PppoeUser::Profile))
                    .col(string(PppoeUser::Service).default("pppoe"))
                    .col(string(PppoeUser::Status).default("active"))
                    .col(string_null(PppoeUser::CustomerName))
                    .col(string_null(PppoeUser::CustomerPhone))
                    .col(string_null(PppoeUser::CustomerAddress))
                    .col(string_null(PppoeUser::IpAddress))
                    .col(double(PppoeUser::MonthlyCost).default(0.0))
                    .col(timestamp(PppoeUser::CreatedAt))
                    .col(timestamp(PppoeUser::UpdatedAt))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_pppoe_user_device")
                            .from(PppoeUser::Table, PppoeUser::DeviceId)
                            .to(Device::Table, Device::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_pppoe_user_device_username")
                    .table(PppoeUser::Table)
                    .col(PppoeUser::DeviceId)
                    .col(PppoeUser::Username)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // 创建 hotspot_profile 表
        manager
            .create_table(
                Table::create()
                    .table(HotspotProfile::Table)
                    .if_not_exists()
                    .col(big_integer(HotspotProfile::Id).auto_increment().primary_key())
                    .col(big_integer(HotspotProfile::DeviceId))
                    .col(string(HotspotProfile::Name))
                    .col(string_null(HotspotProfile::RateLimit))
                    .col(integer_null(HotspotProfile::SharedUsers))
                    .col(string_null(HotspotProfile::SessionTimeout))
                    .col(string_null(HotspotProfile::IdleTimeout))
                    .col(timestamp(HotspotProfile::CreatedAt))
                    .col(timestamp(HotspotProfile::UpdatedAt))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_hotspot_profile_device")
                            .from(HotspotProfile::Table, HotspotProfile::DeviceId)
                            .to(Device::Table, Device::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_hotspot_profile_device_name")
                    .table(HotspotProfile::Table)
                    .col(HotspotProfile::DeviceId)
                    .col(HotspotProfile::Name)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // 创建 pppoe_profile 表
        manager
            .create_table(
                Table::create()
                    .table(PppoeProfile::Table)
                    .if_not_exists()
                    .col(big_integer(PppoeProfile::Id).auto_increment().primary_key())
                    .col(big_integer(PppoeProfile::DeviceId))
                    .col(string(PppoeProfile::Name))
                    .col(string_null(PppoeProfile::RateLimit))
                    .col(string_null(PppoeProfile::LocalAddress))
                    .col(string_null(PppoeProfile::RemoteAddress))
                    .col(string_null(PppoeProfile::DnsServer))
                    .col(timestamp(PppoeProfile::CreatedAt))
                    .col(timestamp(PppoeProfile::UpdatedAt))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_pppoe_profile_device")
                            .from(PppoeProfile::Table, PppoeProfile::DeviceId)
                            .to(Device::Table, Device::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_pppoe_profile_device_name")
                    .table(PppoeProfile::Table)
                    .col(PppoeProfile::DeviceId)
                    .col(PppoeProfile::Name)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // 创建 user_session 表
        manager
            .create_table(
                Table::create()
                    .table(UserSession::Table)
                    .if_not_exists()
                    .col(big_integer(UserSession::Id).auto_increment().primary_key())
                    .col(big_integer(UserSession::DeviceId))
                    .col(string(UserSession::Username))
                    .col(string(UserSession::UserType))
                    .col(string_null(UserSession::Address))
                    .col(string_null(UserSession::MacAddress))
                    .col(timestamp(UserSession::SessionStart))
                    .col(timestamp_null(UserSession::SessionEnd))
                    .col(big_integer(UserSession::DataUsageBytes).default(0))
                    .col(string(UserSession::Status).default("active"))
                    .col(timestamp(UserSession::CreatedAt))
                    .col(timestamp(UserSession::UpdatedAt))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_user_session_device")
                            .from(UserSession::Table, UserSession::DeviceId)
                            .to(Device::Table, Device::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // 月报按 session_start 过滤
        manager
            .create_index(
                Index::create()
                    .name("idx_user_session_start")
                    .table(UserSession::Table)
                    .col(UserSession::SessionStart)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_user_session_device_status")
                    .table(UserSession::Table)
                    .col(UserSession::DeviceId)
                    .col(UserSession::Status)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(UserSession::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(PppoeProfile::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(HotspotProfile::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(PppoeUser::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(HotspotUser::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Device::Table).to_owned())
            .await?;

        Ok(())
    }
}

#[derive(DeriveIden)]
enum Device {
    Table,
    Id,
    Name,
    DeviceType,
    IpAddress,
    ApiPort,
    Username,
    Password,
    Location,
    Description,
    Status,
    LastSeen,
    RouterIdentity,
    RouterVersion,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum HotspotUser {
    Table,
    Id,
    DeviceId,
    Username,
    Password,
    Profile,
    Comment,
    Status,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum PppoeUser {
    Table,
    Id,
    DeviceId,
    Username,
    Password,
    Profile,
    Service,
    Status,
    CustomerName,
    CustomerPhone,
    CustomerAddress,
    IpAddress,
    MonthlyCost,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum HotspotProfile {
    Table,
    Id,
    DeviceId,
    Name,
    RateLimit,
    SharedUsers,
    SessionTimeout,
    IdleTimeout,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum PppoeProfile {
    Table,
    Id,
    DeviceId,
    Name,
    RateLimit,
    LocalAddress,
    RemoteAddress,
    DnsServer,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum UserSession {
    Table,
    Id,
    DeviceId,
    Username,
    UserType,
    Address,
    MacAddress,
    SessionStart,
    SessionEnd,
    DataUsageBytes,
    Status,
    CreatedAt,
    UpdatedAt,
}
