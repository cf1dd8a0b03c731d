//! Registered entities and their schema.

use sea_orm::sea_query::{Alias, Index, Table};
use sea_orm::{ConnectionTrait, DbBackend, IdenStatic, Schema, Statement};

use super::ActiveEntity;
use crate::handle::DbHandle;
use crate::{DbError, Result};

struct Registered {
    model: &'static str,
    table: String,
    is_deleted: Option<String>,
    create_table: fn(DbBackend) -> Statement,
}

/// Ordered set of entities whose tables this crate manages.
///
/// Registration applies the naming policy once: the table an entity declares
/// must match its derived name unless the descriptor overrides it.
#[derive(Default)]
pub struct Registry {
    entries: Vec<Registered>,
}

fn create_table_stmt<E: ActiveEntity>(backend: DbBackend) -> Statement {
    let mut stmt = Schema::new(backend).create_table_from_entity(E::default());
    stmt.if_not_exists();
    backend.build(&stmt)
}

impl Registry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `E` to the registry.
    ///
    /// # Errors
    /// Returns `DbError::TableNameMismatch` if the entity's table differs
    /// from the expected name and `DbError::DuplicateEntity` if the table is
    /// already registered.
    pub fn register<E: ActiveEntity>(mut self) -> Result<Self> {
        let desc = E::descriptor();
        let entity = E::default();
        let declared = entity.table_name();
        let expected = desc.expected_table();

        if declared != expected {
            return Err(DbError::TableNameMismatch {
                model: desc.model_name(),
                expected,
                declared: declared.to_owned(),
            });
        }
        if self.entries.iter().any(|e| e.table == expected) {
            return Err(DbError::DuplicateEntity(desc.model_name().to_owned()));
        }

        tracing::debug!(model = desc.model_name(), table = %expected, "Registered entity");
        self.entries.push(Registered {
            model: desc.model_name(),
            table: expected,
            is_deleted: desc
                .soft_delete()
                .map(|(flag, _)| flag.as_str().to_owned()),
            create_table: create_table_stmt::<E>,
        });
        Ok(self)
    }

    /// Registered table names in registration order.
    pub fn tables(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.table.as_str())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Create missing tables, plus an index on the deleted flag of
    /// soft-delete entities.
    ///
    /// # Errors
    /// Returns the storage error of the first failing statement.
    pub async fn create_all(&self, db: &DbHandle) -> Result<()> {
        let conn = db.conn();
        let backend = conn.get_database_backend();

        for entry in &self.entries {
            conn.execute((entry.create_table)(backend)).await?;

            if let Some(flag) = &entry.is_deleted {
                let index = Index::create()
                    .name(format!("idx_{}_{flag}", entry.table))
                    .table(Alias::new(entry.table.as_str()))
                    .col(Alias::new(flag.as_str()))
                    .if_not_exists()
                    .to_owned();
                conn.execute(backend.build(&index)).await?;
            }

            tracing::info!(model = entry.model, table = %entry.table, "Created table");
        }
        Ok(())
    }

    /// Drop registered tables in reverse registration order.
    ///
    /// # Errors
    /// Returns the storage error of the first failing statement.
    pub async fn drop_all(&self, db: &DbHandle) -> Result<()> {
        let conn = db.conn();
        let backend = conn.get_database_backend();

        for entry in self.entries.iter().rev() {
            let stmt = Table::drop()
                .table(Alias::new(entry.table.as_str()))
                .if_exists()
                .to_owned();
            conn.execute(backend.build(&stmt)).await?;
            tracing::info!(model = entry.model, table = %entry.table, "Dropped table");
        }
        Ok(())
    }
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.tables()).finish()
    }
}
