//! kv_entry entity: one row per store key.

use sea_orm::entity::prelude::*;

use crate::Versioned;

/// kv_entry database model.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "kv_entries")]
pub struct Model {
    /// store key (prefix + policy name).
    #[sea_orm(primary_key, auto_increment = false)]
    pub entry_key: String,

    /// serialized value.
    #[sea_orm(column_type = "VarBinary(StringLen::None)")]
    pub data: Vec<u8>,

    /// write version, starting at 1.
    pub version: i64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<Model> for Versioned {
    fn from(model: Model) -> Self {
        Versioned {
            value: model.data,
            version: model.version as u64,
        }
    }
}
