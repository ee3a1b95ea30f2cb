//! Site entity.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Platform a managed site runs on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(32))")]
#[serde(rename_all = "lowercase")]
pub enum SitePlatform {
    #[sea_orm(string_value = "wordpress")]
    WordPress,
    #[sea_orm(string_value = "shopify")]
    Shopify,
    #[sea_orm(string_value = "woocommerce")]
    WooCommerce,
}

/// Last observed availability of a site.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "lowercase")]
pub enum SiteStatus {
    #[sea_orm(string_value = "unknown")]
    Unknown,
    #[sea_orm(string_value = "up")]
    Up,
    #[sea_orm(string_value = "down")]
    Down,
}

/// Site model.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "site")]
pub struct Model {
    /// Unique identifier.
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    /// Owning user.
    pub user_id: String,

    pub name: String,

    /// Public URL requested by health checks.
    #[sea_orm(column_type = "Text")]
    pub url: String,

    pub platform: SitePlatform,

    /// Archived sites are skipped by the health-check scheduler.
    #[sea_orm(default_value = false)]
    pub is_archived: bool,

    pub status: SiteStatus,

    #[sea_orm(nullable)]
    pub last_checked_at: Option<DateTimeWithTimeZone>,

    pub created_at: DateTimeWithTimeZone,

    #[sea_orm(nullable)]
    pub updated_at: Option<DateTimeWithTimeZone>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UserId",
        to = "super::user::Column::Id",
        on_delete = "Cascade"
    )]
    User,
    #[sea_orm(has_many = "super::site_health_check::Entity")]
    SiteHealthCheck,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl Related<super::site_health_check::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::SiteHealthCheck.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
