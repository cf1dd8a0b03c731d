//! Entity descriptors: which lifecycle columns an entity carries.
//!
//! Capabilities are listed explicitly per entity instead of being inherited:
//!
//! ```ignore
//! impl ActiveEntity for Entity {
//!     fn descriptor() -> EntityDescriptor<Self> {
//!         EntityDescriptor::new("Device")
//!             .with_auto_id(Column::Id)
//!             .with_timestamps(Column::CreatedAt, Column::UpdatedAt)
//!             .with_soft_delete(Column::IsDeleted, Column::DeletedAt)
//!     }
//! }
//! ```

pub mod naming;
mod registry;

pub use registry::Registry;

use sea_orm::{EntityTrait, IdenStatic};

/// Lifecycle columns of an entity.
pub struct EntityDescriptor<E: EntityTrait> {
    model_name: &'static str,
    table: Option<&'static str>,
    auto_id: Option<E::Column>,
    timestamps: Option<(E::Column, E::Column)>,
    soft_delete: Option<(E::Column, E::Column)>,
}

impl<E: EntityTrait> EntityDescriptor<E> {
    /// Descriptor with no capabilities; the table name is derived from
    /// `model_name` with [`naming::underscore`].
    #[must_use]
    pub fn new(model_name: &'static str) -> Self {
        Self {
            model_name,
            table: None,
            auto_id: None,
            timestamps: None,
            soft_delete: None,
        }
    }

    /// Storage assigns this primary key on insert.
    #[must_use]
    pub fn with_auto_id(mut self, id: E::Column) -> Self {
        self.auto_id = Some(id);
        self
    }

    /// `created_at` set on insert, `updated_at` on insert and every update.
    #[must_use]
    pub fn with_timestamps(mut self, created_at: E::Column, updated_at: E::Column) -> Self {
        self.timestamps = Some((created_at, updated_at));
        self
    }

    /// Boolean deleted flag plus nullable deletion timestamp.
    #[must_use]
    pub fn with_soft_delete(mut self, is_deleted: E::Column, deleted_at: E::Column) -> Self {
        self.soft_delete = Some((is_deleted, deleted_at));
        self
    }

    /// Use `table` instead of the derived name.
    #[must_use]
    pub fn with_table(mut self, table: &'static str) -> Self {
        self.table = Some(table);
        self
    }

    #[must_use]
    pub fn model_name(&self) -> &'static str {
        self.model_name
    }

    /// Explicit table override, if any.
    #[must_use]
    pub fn table_override(&self) -> Option<&'static str> {
        self.table
    }

    /// Table name the entity must be stored in.
    #[must_use]
    pub fn expected_table(&self) -> String {
        self.table
            .map_or_else(|| naming::underscore(self.model_name), str::to_owned)
    }

    #[must_use]
    pub fn auto_id(&self) -> Option<E::Column> {
        self.auto_id
    }

    /// `(created_at, updated_at)`.
    #[must_use]
    pub fn timestamps(&self) -> Option<(E::Column, E::Column)> {
        self.timestamps
    }

    /// `(is_deleted, deleted_at)`.
    #[must_use]
    pub fn soft_delete(&self) -> Option<(E::Column, E::Column)> {
        self.soft_delete
    }

    #[must_use]
    pub fn capabilities(&self) -> Capabilities {
        Capabilities {
            auto_id: self.auto_id.is_some(),
            timestamps: self.timestamps.is_some(),
            soft_delete: self.soft_delete.is_some(),
        }
    }
}

impl<E: EntityTrait> Clone for EntityDescriptor<E> {
    fn clone(&self) -> Self {
        Self {
            model_name: self.model_name,
            table: self.table,
            auto_id: self.auto_id,
            timestamps: self.timestamps,
            soft_delete: self.soft_delete,
        }
    }
}

impl<E: EntityTrait> std::fmt::Debug for EntityDescriptor<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let pair = |p: Option<&(E::Column, E::Column)>| {
            p.map(|(a, b)| (a.as_str().to_owned(), b.as_str().to_owned()))
        };
        f.debug_struct("EntityDescriptor")
            .field("model_name", &self.model_name)
            .field("table", &self.table)
            .field("auto_id", &self.auto_id.as_ref().map(IdenStatic::as_str))
            .field("timestamps", &pair(self.timestamps.as_ref()))
            .field("soft_delete", &pair(self.soft_delete.as_ref()))
            .finish()
    }
}

/// Capability flags of a descriptor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Capabilities {
    pub auto_id: bool,
    pub timestamps: bool,
    pub soft_delete: bool,
}

/// A `SeaORM` entity with a lifecycle descriptor.
pub trait ActiveEntity: EntityTrait {
    fn descriptor() -> EntityDescriptor<Self>;
}
