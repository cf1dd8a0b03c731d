//! Sources a [`super::Paginator`] can count and slice.

use async_trait::async_trait;
use sea_orm::{ConnectionTrait, EntityTrait, PaginatorTrait, QuerySelect, Select};

use crate::Result;

/// Anything that can report a total and hand out a bounded slice.
#[async_trait]
pub trait Queryable: Send + Sync {
    type Item: Send;

    /// Total number of items.
    ///
    /// # Errors
    /// Returns the storage error if counting fails.
    async fn count(&self) -> Result<u64>;

    /// Items in `[offset, offset + limit)`.
    ///
    /// # Errors
    /// Returns the storage error if the fetch fails.
    async fn fetch(&self, offset: u64, limit: u64) -> Result<Vec<Self::Item>>;
}

fn slice_bounds(len: usize, offset: u64, limit: u64) -> (usize, usize) {
    let start = usize::try_from(offset).unwrap_or(usize::MAX).min(len);
    let end = usize::try_from(offset.saturating_add(limit))
        .unwrap_or(usize::MAX)
        .min(len);
    (start, end)
}

#[async_trait]
impl<T> Queryable for Vec<T>
where
    T: Clone + Send + Sync,
{
    type Item = T;

    async fn count(&self) -> Result<u64> {
        Ok(u64::try_from(self.len()).unwrap_or(u64::MAX))
    }

    async fn fetch(&self, offset: u64, limit: u64) -> Result<Vec<T>> {
        let (start, end) = slice_bounds(self.len(), offset, limit);
        Ok(self[start..end].to_vec())
    }
}

#[async_trait]
impl<T> Queryable for &[T]
where
    T: Clone + Send + Sync,
{
    type Item = T;

    async fn count(&self) -> Result<u64> {
        Ok(u64::try_from(self.len()).unwrap_or(u64::MAX))
    }

    async fn fetch(&self, offset: u64, limit: u64) -> Result<Vec<T>> {
        let (start, end) = slice_bounds(self.len(), offset, limit);
        Ok(self[start..end].to_vec())
    }
}

/// A `SeaORM` select bound to the connection it runs on.
///
/// Counting uses `SELECT COUNT(*)` over the select; fetching appends
/// `LIMIT` / `OFFSET`.
pub struct SelectQuery<'c, E, C>
where
    E: EntityTrait,
{
    select: Select<E>,
    conn: &'c C,
}

impl<'c, E, C> SelectQuery<'c, E, C>
where
    E: EntityTrait,
{
    #[must_use]
    pub fn new(select: Select<E>, conn: &'c C) -> Self {
        Self { select, conn }
    }

    /// The underlying select.
    #[must_use]
    pub fn select(&self) -> &Select<E> {
        &self.select
    }
}

impl<E, C> Clone for SelectQuery<'_, E, C>
where
    E: EntityTrait,
    Select<E>: Clone,
{
    fn clone(&self) -> Self {
        Self {
            select: self.select.clone(),
            conn: self.conn,
        }
    }
}

impl<E, C> std::fmt::Debug for SelectQuery<'_, E, C>
where
    E: EntityTrait,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SelectQuery")
            .field("select", &self.select)
            .field("conn", &std::any::type_name::<C>())
            .finish()
    }
}

#[async_trait]
impl<E, C> Queryable for SelectQuery<'_, E, C>
where
    E: EntityTrait,
    E::Model: Sync,
    Select<E>: Clone,
    C: ConnectionTrait,
{
    type Item = E::Model;

    async fn count(&self) -> Result<u64> {
        Ok(self.select.clone().count(self.conn).await?)
    }

    async fn fetch(&self, offset: u64, limit: u64) -> Result<Vec<E::Model>> {
        Ok(self
            .select
            .clone()
            .offset(offset)
            .limit(limit)
            .all(self.conn)
            .await?)
    }
}
