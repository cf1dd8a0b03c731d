//! Active-record sugar over [`Session`].
//!
//! [`ActiveRecord`] puts the session operations on the entity type, and
//! [`RecordExt`] gives every serializable model `to_dict` / `to_json`.
//!
//! ```ignore
//! let device = device::Entity::create(&session, am).await?;
//! let device = device::Entity::soft_delete(&session, device).await?.unwrap();
//! assert_eq!(device::Entity::state(&device), LifecycleState::SoftDeleted);
//! println!("{}", device.to_json()?);
//! ```

use async_trait::async_trait;
use sea_orm::{ActiveModelBehavior, DbErr, IntoActiveModel, PrimaryKeyTrait, Select};
use serde::Serialize;
use serde_json::{Map, Value};

use crate::entity::ActiveEntity;
use crate::lifecycle::{DeleteMode, LifecycleState};
use crate::session::Session;
use crate::Result;

/// Entity-level shortcuts; implemented for every [`ActiveEntity`].
#[async_trait]
pub trait ActiveRecord: ActiveEntity {
    /// See [`Session::create`].
    async fn create(session: &Session, am: Self::ActiveModel) -> Result<Self::Model>;

    /// See [`Session::get`]; only active rows.
    async fn get_active(
        session: &Session,
        id: <Self::PrimaryKey as PrimaryKeyTrait>::ValueType,
    ) -> Result<Option<Self::Model>>;

    /// See [`Session::delete`] with [`DeleteMode::Soft`]; `None` when the
    /// entity has no soft-delete capability and the row was removed.
    async fn soft_delete(session: &Session, model: Self::Model) -> Result<Option<Self::Model>>;

    /// See [`Session::delete`] with [`DeleteMode::Undelete`].
    async fn undelete(session: &Session, model: Self::Model) -> Result<Self::Model>;

    /// See [`Session::delete`] with [`DeleteMode::Hard`].
    async fn hard_delete(session: &Session, model: Self::Model) -> Result<()>;

    /// See [`Session::all`].
    fn all_rows(session: &Session, include_deleted: bool) -> Select<Self> {
        session.all::<Self>(include_deleted)
    }

    /// See [`Session::state`].
    fn state(model: &Self::Model) -> LifecycleState {
        Session::state::<Self>(model)
    }
}

#[async_trait]
impl<E> ActiveRecord for E
where
    E: ActiveEntity,
    E::Model: IntoActiveModel<E::ActiveModel>,
    E::ActiveModel: ActiveModelBehavior + Send,
    <E::PrimaryKey as PrimaryKeyTrait>::ValueType: Send,
{
    async fn create(session: &Session, am: E::ActiveModel) -> Result<E::Model> {
        session.create::<E>(am).await
    }

    async fn get_active(
        session: &Session,
        id: <E::PrimaryKey as PrimaryKeyTrait>::ValueType,
    ) -> Result<Option<E::Model>> {
        session.get::<E, _>(id, false).await
    }

    async fn soft_delete(session: &Session, model: E::Model) -> Result<Option<E::Model>> {
        session.delete::<E>(model, DeleteMode::Soft).await
    }

    async fn undelete(session: &Session, model: E::Model) -> Result<E::Model> {
        session
            .delete::<E>(model, DeleteMode::Undelete)
            .await?
            .ok_or_else(|| DbErr::RecordNotFound("restored row is gone".to_owned()).into())
    }

    async fn hard_delete(session: &Session, model: E::Model) -> Result<()> {
        session.delete::<E>(model, DeleteMode::Hard).await.map(|_| ())
    }
}

/// JSON export for serializable models.
///
/// Timestamps render the way `chrono` serializes them (RFC 3339).
pub trait RecordExt: Serialize {
    /// Column name to value map.
    ///
    /// # Errors
    /// Returns `DbError::Serialization` if the model does not serialize to
    /// a JSON object.
    fn to_dict(&self) -> Result<Map<String, Value>> {
        match serde_json::to_value(self)? {
            Value::Object(map) => Ok(map),
            other => Err(<serde_json::Error as serde::ser::Error>::custom(format!(
                "expected a JSON object, got {other}"
            ))
            .into()),
        }
    }

    /// Compact JSON string.
    ///
    /// # Errors
    /// Returns `DbError::Serialization` if serialization fails.
    fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

impl<T: Serialize + ?Sized> RecordExt for T {}
