//! Site health check entity.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// One availability check of a site.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "site_health_check")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    pub site_id: String,

    /// HTTP status, 0 if no response was received.
    pub status_code: i32,

    pub response_time_ms: i64,

    pub is_up: bool,

    #[sea_orm(column_type = "Text", nullable)]
    pub error_message: Option<String>,

    pub checked_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::site::Entity",
        from = "Column::SiteId",
        to = "super::site::Column::Id",
        on_delete = "Cascade"
    )]
    Site,
}

impl Related<super::site::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Site.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
