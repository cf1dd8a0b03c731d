//! Unit-of-work entry point: writes with the soft-delete lifecycle and reads
//! that hide deleted rows.
//!
//! Every write runs in its own transaction. On failure the transaction is
//! rolled back best-effort and the original error is returned.

use std::sync::Arc;

use sea_orm::{
    ActiveModelBehavior, ActiveModelTrait, ColumnTrait, DatabaseConnection, DatabaseTransaction,
    EntityTrait, IntoActiveModel, ModelTrait, PrimaryKeyTrait, QueryFilter, Select,
    TransactionTrait, TryIntoModel, Value,
};

use crate::clock::Clock;
use crate::entity::ActiveEntity;
use crate::lifecycle::{DeleteMode, LifecycleState};
use crate::{DbError, Result};

/// Database session bound to a connection and a clock.
///
/// Cheap to clone; clones share the pool.
#[derive(Clone, Debug)]
pub struct Session {
    conn: DatabaseConnection,
    clock: Arc<dyn Clock>,
}

/// Commit on success; on failure roll back and keep the original error.
async fn finish<T>(txn: DatabaseTransaction, res: Result<T>, table: &str) -> Result<T> {
    match res {
        Ok(v) => {
            txn.commit().await?;
            Ok(v)
        }
        Err(e) => {
            if let Err(rollback) = txn.rollback().await {
                tracing::warn!(
                    table,
                    error = %rollback,
                    "Rollback failed; returning the original error"
                );
            }
            Err(e)
        }
    }
}

fn table_of<E: EntityTrait>() -> String {
    E::default().table_name().to_owned()
}

fn timestamp(at: chrono::DateTime<chrono::Utc>) -> Value {
    Value::ChronoDateTimeUtc(Some(Box::new(at)))
}

fn no_timestamp() -> Value {
    Value::ChronoDateTimeUtc(None)
}

impl Session {
    #[must_use]
    pub fn new(conn: DatabaseConnection, clock: Arc<dyn Clock>) -> Self {
        Self { conn, clock }
    }

    /// Connection for queries built on [`Session::all`].
    #[must_use]
    pub fn conn(&self) -> &DatabaseConnection {
        &self.conn
    }

    #[must_use]
    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    /// Insert a new row.
    ///
    /// Timestamps are stamped, the row starts active and an auto-assigned
    /// primary key is left for storage to fill.
    ///
    /// # Errors
    /// Returns the storage error; nothing is persisted in that case.
    pub async fn create<E>(&self, mut am: E::ActiveModel) -> Result<E::Model>
    where
        E: ActiveEntity,
        E::Model: IntoActiveModel<E::ActiveModel>,
        E::ActiveModel: ActiveModelBehavior + Send,
    {
        let desc = E::descriptor();
        let table = table_of::<E>();
        let now = self.clock.now();

        if let Some(id) = desc.auto_id() {
            am.not_set(id);
        }
        if let Some((created_at, updated_at)) = desc.timestamps() {
            am.try_set(created_at, timestamp(now))?;
            am.try_set(updated_at, timestamp(now))?;
        }
        if let Some((is_deleted, deleted_at)) = desc.soft_delete() {
            am.try_set(is_deleted, Value::from(false))?;
            am.try_set(deleted_at, no_timestamp())?;
        }

        let txn = self.conn.begin().await?;
        let res = am.insert(&txn).await.map_err(DbError::from);
        let model = finish(txn, res, &table).await?;

        tracing::debug!(table = %table, "Created record");
        Ok(model)
    }

    /// Apply `changes` to the stored row and bump `updated_at`.
    ///
    /// The deletion state only changes if `changes` sets those columns.
    ///
    /// # Errors
    /// Returns the storage error; the row is left unchanged in that case.
    pub async fn update<E, F>(&self, model: E::Model, changes: F) -> Result<E::Model>
    where
        E: ActiveEntity,
        E::Model: IntoActiveModel<E::ActiveModel>,
        E::ActiveModel: ActiveModelBehavior + Send,
        F: FnOnce(&mut E::ActiveModel) + Send,
    {
        let mut am = model.into_active_model();
        changes(&mut am);
        let model = self.write_update::<E>(am).await?;

        tracing::debug!(table = %table_of::<E>(), "Updated record");
        Ok(model)
    }

    async fn write_update<E>(&self, mut am: E::ActiveModel) -> Result<E::Model>
    where
        E: ActiveEntity,
        E::Model: IntoActiveModel<E::ActiveModel>,
        E::ActiveModel: ActiveModelBehavior + Send,
    {
        if let Some((_, updated_at)) = E::descriptor().timestamps() {
            am.try_set(updated_at, timestamp(self.clock.now()))?;
        }

        let table = table_of::<E>();
        let txn = self.conn.begin().await?;
        let res = am.update(&txn).await.map_err(DbError::from);
        finish(txn, res, &table).await
    }

    /// Soft-delete, undelete or hard-delete a row.
    ///
    /// Returns the updated model, or `None` once the row is removed. Entities
    /// without the soft-delete capability are always hard-deleted, and
    /// undeleting them leaves the row untouched.
    ///
    /// # Errors
    /// Returns the storage error; the row is left unchanged in that case.
    pub async fn delete<E>(&self, model: E::Model, mode: DeleteMode) -> Result<Option<E::Model>>
    where
        E: ActiveEntity,
        E::Model: IntoActiveModel<E::ActiveModel>,
        E::ActiveModel: ActiveModelBehavior + Send,
    {
        let Some((is_deleted, deleted_at)) = E::descriptor().soft_delete() else {
            if mode == DeleteMode::Undelete {
                return Ok(Some(model));
            }
            self.hard_delete::<E>(model).await?;
            return Ok(None);
        };

        match mode {
            DeleteMode::Hard => {
                self.hard_delete::<E>(model).await?;
                Ok(None)
            }
            DeleteMode::Soft => {
                let now = self.clock.now();
                let model = self
                    .update_lifecycle::<E>(model, is_deleted, deleted_at, true, timestamp(now))
                    .await?;
                tracing::debug!(table = %table_of::<E>(), "Soft-deleted record");
                Ok(Some(model))
            }
            DeleteMode::Undelete => {
                let model = self
                    .update_lifecycle::<E>(model, is_deleted, deleted_at, false, no_timestamp())
                    .await?;
                tracing::debug!(table = %table_of::<E>(), "Restored record");
                Ok(Some(model))
            }
        }
    }

    async fn update_lifecycle<E>(
        &self,
        model: E::Model,
        is_deleted: E::Column,
        deleted_at: E::Column,
        flag: bool,
        at: Value,
    ) -> Result<E::Model>
    where
        E: ActiveEntity,
        E::Model: IntoActiveModel<E::ActiveModel>,
        E::ActiveModel: ActiveModelBehavior + Send,
    {
        let mut am = model.into_active_model();
        am.try_set(is_deleted, Value::from(flag))?;
        am.try_set(deleted_at, at)?;
        self.write_update::<E>(am).await
    }

    async fn hard_delete<E>(&self, model: E::Model) -> Result<()>
    where
        E: ActiveEntity,
        E::Model: IntoActiveModel<E::ActiveModel>,
        E::ActiveModel: ActiveModelBehavior + Send,
    {
        let table = table_of::<E>();
        let txn = self.conn.begin().await?;
        let res = model
            .into_active_model()
            .delete(&txn)
            .await
            .map(|_| ())
            .map_err(DbError::from);
        finish(txn, res, &table).await?;

        tracing::debug!(table = %table, "Removed record");
        Ok(())
    }

    /// Insert or update an active model in its own transaction.
    ///
    /// Unlike [`Session::create`] and [`Session::update`] no lifecycle column
    /// is touched.
    ///
    /// # Errors
    /// Returns the storage error; nothing is persisted in that case.
    pub async fn save<E>(&self, am: E::ActiveModel) -> Result<E::Model>
    where
        E: ActiveEntity,
        E::Model: IntoActiveModel<E::ActiveModel>,
        E::ActiveModel: ActiveModelBehavior + TryIntoModel<E::Model> + Send,
    {
        let table = table_of::<E>();
        let txn = self.conn.begin().await?;
        let res = match am.save(&txn).await {
            Ok(saved) => saved.try_into_model().map_err(DbError::from),
            Err(e) => Err(e.into()),
        };
        finish(txn, res, &table).await
    }

    /// Select over `E`, hiding soft-deleted rows unless `include_deleted`.
    ///
    /// Callers can keep filtering the returned select.
    #[must_use]
    pub fn all<E: ActiveEntity>(&self, include_deleted: bool) -> Select<E> {
        Self::visible(E::find(), include_deleted)
    }

    fn visible<E: ActiveEntity>(select: Select<E>, include_deleted: bool) -> Select<E> {
        match E::descriptor().soft_delete() {
            Some((is_deleted, _)) if !include_deleted => select.filter(is_deleted.ne(true)),
            _ => select,
        }
    }

    /// All rows of `E`.
    ///
    /// # Errors
    /// Returns the storage error if the query fails.
    pub async fn fetch_all<E: ActiveEntity>(&self, include_deleted: bool) -> Result<Vec<E::Model>> {
        Ok(self.all::<E>(include_deleted).all(&self.conn).await?)
    }

    /// Row by primary key.
    ///
    /// # Errors
    /// Returns the storage error if the query fails.
    pub async fn get<E, K>(&self, id: K, include_deleted: bool) -> Result<Option<E::Model>>
    where
        E: ActiveEntity,
        K: Into<<E::PrimaryKey as PrimaryKeyTrait>::ValueType>,
    {
        let select = Self::visible(E::find_by_id(id), include_deleted);
        Ok(select.one(&self.conn).await?)
    }

    /// First row of `select`.
    ///
    /// # Errors
    /// Returns the storage error if the query fails.
    pub async fn first<E: ActiveEntity>(&self, select: Select<E>) -> Result<Option<E::Model>> {
        Ok(select.one(&self.conn).await?)
    }

    /// Like [`Session::get`] for active rows, with absence mapped to the
    /// caller's error.
    ///
    /// # Errors
    /// Returns `err()` when no active row matches, or the storage error
    /// converted into `X`.
    pub async fn get_or_else<E, K, X, F>(&self, id: K, err: F) -> std::result::Result<E::Model, X>
    where
        E: ActiveEntity,
        K: Into<<E::PrimaryKey as PrimaryKeyTrait>::ValueType>,
        X: From<DbError>,
        F: FnOnce() -> X,
    {
        self.get::<E, K>(id, false).await?.ok_or_else(err)
    }

    /// Like [`Session::first`], with absence mapped to the caller's error.
    ///
    /// # Errors
    /// Returns `err()` when nothing matches, or the storage error converted
    /// into `X`.
    pub async fn first_or_else<E, X, F>(
        &self,
        select: Select<E>,
        err: F,
    ) -> std::result::Result<E::Model, X>
    where
        E: ActiveEntity,
        X: From<DbError>,
        F: FnOnce() -> X,
    {
        self.first(select).await?.ok_or_else(err)
    }

    /// Lifecycle state of a loaded model.
    #[must_use]
    pub fn state<E: ActiveEntity>(model: &E::Model) -> LifecycleState {
        match E::descriptor().soft_delete() {
            Some((is_deleted, _)) if model.get(is_deleted) == Value::from(true) => {
                LifecycleState::SoftDeleted
            }
            _ => LifecycleState::Active,
        }
    }
}
