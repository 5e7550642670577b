//! durable sql-backed store.
//!
//! a single database is its own authority, so every read is linearizable
//! regardless of the requested consistency.

use sea_orm::sea_query::{Expr, OnConflict};
use sea_orm::{
    ColumnTrait, ConnectionTrait, Database as SeaOrmDatabase, DatabaseConnection, EntityTrait,
    QueryFilter, Set,
};
use sea_orm_migration::MigratorTrait;

use crate::entity::kv_entry;
use crate::{Error, KvStore, ReadConsistency, Result, Versioned, migration};

/// sea-orm backed key-value store.
#[derive(Clone)]
pub struct SqlStore {
    conn: DatabaseConnection,
}

impl SqlStore {
    /// connect to `url` and run migrations.
    pub async fn connect(url: &str) -> Result<Self> {
        let conn = SeaOrmDatabase::connect(url)
            .await
            .map_err(|e| Error::Connection(e.to_string()))?;
        let store = Self { conn };
        store.migrate().await?;
        Ok(store)
    }

    /// create an in-memory sqlite store (for testing).
    pub async fn new_in_memory() -> Result<Self> {
        Self::connect("sqlite::memory:").await
    }

    /// run database migrations.
    pub async fn migrate(&self) -> Result<()> {
        migration::Migrator::up(&self.conn, None)
            .await
            .map_err(|e| Error::Migration(e.to_string()))?;
        Ok(())
    }

    /// close the connection pool. every clone of this store fails afterwards.
    pub async fn close(&self) -> Result<()> {
        self.conn.clone().close().await?;
        Ok(())
    }
}

impl KvStore for SqlStore {
    async fn ping(&self) -> Result<()> {
        self.conn
            .execute_unprepared("SELECT 1")
            .await
            .map_err(|e| Error::Connection(e.to_string()))?;
        Ok(())
    }

    async fn get(&self, key: &str, _consistency: ReadConsistency) -> Result<Option<Versioned>> {
        let row = kv_entry::Entity::find_by_id(key.to_string())
            .one(&self.conn)
            .await?;
        match row {
            Some(model) if model.version < 1 => Err(Error::InvalidData(format!(
                "key {key:?} has version {}",
                model.version
            ))),
            row => Ok(row.map(Into::into)),
        }
    }

    async fn compare_and_swap(
        &self,
        key: &str,
        expected_version: Option<u64>,
        value: Vec<u8>,
    ) -> Result<bool> {
        let affected = match expected_version {
            None => {
                let model = kv_entry::ActiveModel {
                    entry_key: Set(key.to_string()),
                    data: Set(value),
                    version: Set(1),
                };
                kv_entry::Entity::insert(model)
                    .on_conflict(
                        OnConflict::column(kv_entry::Column::EntryKey)
                            .do_nothing()
                            .to_owned(),
                    )
                    .exec_without_returning(&self.conn)
                    .await?
            }
            Some(version) => {
                let version = version as i64;
                kv_entry::Entity::update_many()
                    .col_expr(kv_entry::Column::Data, Expr::value(value))
                    .col_expr(kv_entry::Column::Version, Expr::value(version + 1))
                    .filter(kv_entry::Column::EntryKey.eq(key))
                    .filter(kv_entry::Column::Version.eq(version))
                    .exec(&self.conn)
                    .await?
                    .rows_affected
            }
        };

        tracing::trace!(key, affected, "compare-and-swap");
        Ok(affected == 1)
    }
}
