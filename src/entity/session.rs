//! Session entity model for Sea-ORM database interaction.
//!
//! Maps the `sessions` table used when a relational database stands in for
//! the key-value service.

use sea_orm::entity::prelude::*;

/// Sea-ORM entity model representing one key-value record.
///
/// # Database Schema
///
/// | Column      | Type                    | Description                                |
/// |-------------|-------------------------|--------------------------------------------|
/// | id          | TEXT (Primary Key)      | Namespaced key (`namespace:session_id`)    |
/// | data        | TEXT                    | JSON-serialized session attributes         |
/// | expiry_date | TIMESTAMPTZ NULL        | When the record stops being live, if ever  |
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "sessions")]
pub struct Model {
    /// The namespaced key, `namespace:session_id`.
    #[sea_orm(primary_key, auto_increment = false, column_type = "Text")]
    pub id: String,

    /// The JSON record exactly as the store hands it to the backend.
    #[sea_orm(column_type = "Text")]
    pub data: String,

    /// Expiry set by a TTL write; `None` for records that live until deleted.
    ///
    /// Rows past this instant read as absent and are removed by
    /// [`SeaOrmBackend::delete_expired`](crate::backend::SeaOrmBackend::delete_expired).
    pub expiry_date: Option<DateTimeWithTimeZone>,
}

impl Model {
    /// Whether the record is still live at `now`.
    pub fn is_live(&self, now: DateTimeWithTimeZone) -> bool {
        self.expiry_date.map_or(true, |expiry| expiry > now)
    }
}

/// This entity doesn't have any relations to other entities, so this enum is empty.
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
