//! Offset pagination over any [`Queryable`].
//!
//! A [`Paginator`] is computed once per request from a queryable and a
//! [`PageRequest`]: it knows the total, the resolved page, how many items the
//! page shows and the 0-based bounds of the page in the full result set.
//! Items are fetched lazily with [`Paginator::items`].
//!
//! ```ignore
//! let page = users::Entity::find()
//!     .paginate_with(db.conn(), PageRequest::new("last").per_page(25))
//!     .await?;
//! println!("{} of {}", page.get_range(" - "), page.total());
//! let rows = page.items().await?;
//! ```

mod query;
mod window;

use async_trait::async_trait;
use sea_orm::{ConnectionTrait, EntityTrait, Select};

pub use query::{Queryable, SelectQuery};
pub use window::{PageWindow, WindowCfg};

use crate::{BoxError, DbError, Result};

/// Default number of items per page.
pub const DEFAULT_PER_PAGE: u64 = 10;

/// Requested page, before it is resolved against the total.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageNumber {
    /// 1-indexed page.
    Number(u64),
    /// The last page, `max(num_pages, 1)`.
    Last,
}

impl Default for PageNumber {
    fn default() -> Self {
        Self::Number(1)
    }
}

impl From<u64> for PageNumber {
    fn from(n: u64) -> Self {
        Self::Number(n.max(1))
    }
}

impl From<u32> for PageNumber {
    fn from(n: u32) -> Self {
        Self::from(u64::from(n))
    }
}

impl From<i64> for PageNumber {
    fn from(n: i64) -> Self {
        u64::try_from(n).map_or(Self::Number(1), Self::from)
    }
}

impl From<i32> for PageNumber {
    fn from(n: i32) -> Self {
        Self::from(i64::from(n))
    }
}

/// Lenient parsing of user input such as a `?page=` query parameter.
///
/// `"last"` selects the last page; a string of ASCII digits selects that page
/// when positive; everything else falls back to page 1.
impl From<&str> for PageNumber {
    fn from(s: &str) -> Self {
        if s == "last" {
            return Self::Last;
        }
        if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
            return Self::Number(1);
        }
        // all digits but out of range still falls back to the first page
        s.parse::<u64>().map_or(Self::Number(1), Self::from)
    }
}

/// Page parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: PageNumber,
    pub per_page: u64,
    /// Known total; skips the count query when set.
    pub total: Option<u64>,
    /// Extra items fetched from the neighbouring pages.
    pub padding: u64,
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: PageNumber::default(),
            per_page: DEFAULT_PER_PAGE,
            total: None,
            padding: 0,
        }
    }
}

impl PageRequest {
    #[must_use]
    pub fn new(page: impl Into<PageNumber>) -> Self {
        Self {
            page: page.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn per_page(mut self, per_page: u64) -> Self {
        self.per_page = per_page;
        self
    }

    #[must_use]
    pub fn total(mut self, total: u64) -> Self {
        self.total = Some(total);
        self
    }

    #[must_use]
    pub fn padding(mut self, padding: u64) -> Self {
        self.padding = padding;
        self
    }

    fn with_page(mut self, page: u64) -> Self {
        self.page = PageNumber::Number(page);
        self
    }
}

/// Hook run when the resolved page shows no items.
pub enum OnEmptyPage<'h, Q> {
    /// Fail with [`DbError::EmptyPage`] carrying this error.
    Fail(BoxError),
    /// Replace the outcome with whatever the callback returns.
    Recover(Box<dyn FnOnce(Paginator<Q>) -> Result<Paginator<Q>> + Send + 'h>),
}

impl<'h, Q> OnEmptyPage<'h, Q> {
    #[must_use]
    pub fn fail(err: impl Into<BoxError>) -> Self {
        Self::Fail(err.into())
    }

    #[must_use]
    pub fn recover<F>(f: F) -> Self
    where
        F: FnOnce(Paginator<Q>) -> Result<Paginator<Q>> + Send + 'h,
    {
        Self::Recover(Box::new(f))
    }
}

impl<Q> std::fmt::Debug for OnEmptyPage<'_, Q> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Fail(err) => f.debug_tuple("Fail").field(err).finish(),
            Self::Recover(_) => f.write_str("Recover(..)"),
        }
    }
}

/// Resolved page of a [`Queryable`].
#[derive(Debug, Clone)]
pub struct Paginator<Q> {
    query: Q,
    request: PageRequest,
    page: u64,
    total: u64,
    showing: u64,
}

impl<Q: Queryable> Paginator<Q> {
    /// Count (unless the request carries a total) and resolve the page.
    ///
    /// A page past the end is not an error here: `showing()` reports 0.
    ///
    /// # Errors
    /// Returns `DbError::InvalidPagination` when `per_page` is 0, or the
    /// storage error if counting fails.
    pub async fn new(query: Q, request: PageRequest) -> Result<Self> {
        if request.per_page == 0 {
            return Err(DbError::InvalidPagination(
                "per_page must be a positive integer".to_owned(),
            ));
        }
        let total = match request.total {
            Some(total) => total,
            None => query.count().await?,
        };
        Ok(Self::resolve(query, request, total))
    }

    /// Same as [`Paginator::new`], running `hook` when the page is empty.
    ///
    /// # Errors
    /// As [`Paginator::new`]; additionally `DbError::EmptyPage` for
    /// [`OnEmptyPage::Fail`] and whatever [`OnEmptyPage::Recover`] returns.
    pub async fn with_hook(
        query: Q,
        request: PageRequest,
        hook: OnEmptyPage<'_, Q>,
    ) -> Result<Self> {
        let paginator = Self::new(query, request).await?;
        if paginator.showing > 0 {
            return Ok(paginator);
        }

        tracing::debug!(
            page = paginator.page,
            total = paginator.total,
            "Requested page is empty"
        );
        match hook {
            OnEmptyPage::Fail(source) => Err(DbError::EmptyPage {
                page: paginator.page,
                num_pages: paginator.num_pages(),
                source,
            }),
            OnEmptyPage::Recover(f) => f(paginator),
        }
    }

    /// Items of this page, padding included.
    ///
    /// # Errors
    /// Returns the storage error if the fetch fails.
    pub async fn items(&self) -> Result<Vec<Q::Item>> {
        let (offset, limit) = self.bounds();
        self.query.fetch(offset, limit).await
    }
}

impl<Q: Queryable + Clone> Paginator<Q> {
    /// Paginator for the previous page, or `None` on the first page.
    ///
    /// # Errors
    /// Returns the storage error if recounting fails.
    pub async fn prev(&self) -> Result<Option<Self>> {
        if !self.has_prev() {
            return Ok(None);
        }
        self.goto(self.page - 1).await.map(Some)
    }

    /// Paginator for the next page, or `None` on the last page.
    ///
    /// # Errors
    /// Returns the storage error if recounting fails.
    pub async fn next(&self) -> Result<Option<Self>> {
        if !self.has_next() {
            return Ok(None);
        }
        self.goto(self.page + 1).await.map(Some)
    }

    async fn goto(&self, page: u64) -> Result<Self> {
        Self::new(self.query.clone(), self.request.with_page(page)).await
    }
}

impl<Q> Paginator<Q> {
    fn resolve(query: Q, request: PageRequest, total: u64) -> Self {
        let num_pages = total.div_ceil(request.per_page);
        let page = match request.page {
            PageNumber::Number(n) => n.max(1),
            PageNumber::Last => num_pages.max(1),
        };
        let before = request.per_page.saturating_mul(page - 1);
        let showing = if total > request.per_page.saturating_mul(page) {
            request.per_page
        } else {
            total.saturating_sub(before)
        };

        Self {
            query,
            request,
            page,
            total,
            showing,
        }
    }

    /// `(offset, limit)` of the fetch, widened by the padding.
    fn bounds(&self) -> (u64, u64) {
        let padding = self.request.padding;
        let offset = self.start_index().saturating_sub(padding);
        let mut limit = self.request.per_page.saturating_add(padding);
        if self.page > 1 {
            limit = limit.saturating_add(padding);
        }
        (offset, limit)
    }

    #[must_use]
    pub fn query(&self) -> &Q {
        &self.query
    }

    #[must_use]
    pub fn into_query(self) -> Q {
        self.query
    }

    /// Current 1-indexed page.
    #[must_use]
    pub fn page(&self) -> u64 {
        self.page
    }

    #[must_use]
    pub fn per_page(&self) -> u64 {
        self.request.per_page
    }

    #[must_use]
    pub fn padding(&self) -> u64 {
        self.request.padding
    }

    #[must_use]
    pub fn total(&self) -> u64 {
        self.total
    }

    /// Items on the current page, 0 past the end.
    #[must_use]
    pub fn showing(&self) -> u64 {
        self.showing
    }

    #[must_use]
    pub fn num_pages(&self) -> u64 {
        self.total.div_ceil(self.request.per_page)
    }

    /// More than one page exists.
    #[must_use]
    pub fn is_paginated(&self) -> bool {
        self.num_pages() > 1
    }

    #[must_use]
    pub fn has_prev(&self) -> bool {
        self.page > 1
    }

    #[must_use]
    pub fn has_next(&self) -> bool {
        self.page < self.num_pages()
    }

    #[must_use]
    pub fn prev_num(&self) -> u64 {
        self.page - 1
    }

    #[must_use]
    pub fn next_num(&self) -> u64 {
        self.page.saturating_add(1)
    }

    /// 0-based index of the first item of the page.
    #[must_use]
    pub fn start_index(&self) -> u64 {
        (self.page - 1).saturating_mul(self.request.per_page)
    }

    /// 0-based index of the last item of the page.
    #[must_use]
    pub fn end_index(&self) -> u64 {
        let end = self
            .start_index()
            .saturating_add(self.request.per_page)
            .saturating_sub(1);
        end.min(self.total.saturating_sub(1))
    }

    /// 1-based bounds for display, e.g. `"11 - 20"`.
    #[must_use]
    pub fn get_range(&self, sep: &str) -> String {
        format!(
            "{}{sep}{}",
            self.start_index().saturating_add(1),
            self.end_index().saturating_add(1)
        )
    }

    /// Page numbers with the default window.
    #[must_use]
    pub fn pages(&self) -> PageWindow {
        self.iter_pages(WindowCfg::default())
    }

    /// Page numbers around the current page; `None` marks a gap.
    #[must_use]
    pub fn iter_pages(&self, cfg: WindowCfg) -> PageWindow {
        PageWindow::new(self.page, self.num_pages(), cfg)
    }
}

/// `select.paginate_with(&conn, request)` for `SeaORM` selects.
///
/// Named apart from `sea_orm::PaginatorTrait::paginate` so both traits can be
/// in scope.
#[async_trait]
pub trait Paginate<E: EntityTrait>: Sized {
    /// # Errors
    /// See [`Paginator::new`].
    async fn paginate_with<'c, C>(
        self,
        conn: &'c C,
        request: PageRequest,
    ) -> Result<Paginator<SelectQuery<'c, E, C>>>
    where
        C: ConnectionTrait;
}

#[async_trait]
impl<E> Paginate<E> for Select<E>
where
    E: EntityTrait,
    E::Model: Sync,
    Select<E>: Clone,
{
    async fn paginate_with<'c, C>(
        self,
        conn: &'c C,
        request: PageRequest,
    ) -> Result<Paginator<SelectQuery<'c, E, C>>>
    where
        C: ConnectionTrait,
    {
        Paginator::new(SelectQuery::new(self, conn), request).await
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    fn items(n: u32) -> Vec<u32> {
        (1..=n).collect()
    }

    #[test]
    fn test_page_number_sanitizing() {
        assert_eq!(PageNumber::from(3), PageNumber::Number(3));
        assert_eq!(PageNumber::from(0), PageNumber::Number(1));
        assert_eq!(PageNumber::from(-4_i64), PageNumber::Number(1));
        assert_eq!(PageNumber::from("7"), PageNumber::Number(7));
        assert_eq!(PageNumber::from("007"), PageNumber::Number(7));
        assert_eq!(PageNumber::from("0"), PageNumber::Number(1));
        assert_eq!(PageNumber::from("-2"), PageNumber::Number(1));
        assert_eq!(PageNumber::from("abc"), PageNumber::Number(1));
        assert_eq!(PageNumber::from(""), PageNumber::Number(1));
        assert_eq!(PageNumber::from("last"), PageNumber::Last);
        assert_eq!(PageNumber::from("Last"), PageNumber::Number(1));
    }

    #[tokio::test]
    async fn test_middle_page() {
        let p = Paginator::new(items(15), PageRequest::new(2).per_page(4))
            .await
            .unwrap();
        assert_eq!(p.num_pages(), 4);
        assert_eq!(p.showing(), 4);
        assert_eq!(p.start_index(), 4);
        assert_eq!(p.end_index(), 7);
        assert_eq!(p.get_range(" - "), "5 - 8");
        assert!(p.is_paginated());
        assert!(p.has_prev());
        assert!(p.has_next());
        assert_eq!(p.prev_num(), 1);
        assert_eq!(p.next_num(), 3);
        assert_eq!(p.items().await.unwrap(), vec![5, 6, 7, 8]);
    }

    #[tokio::test]
    async fn test_last_partial_page() {
        let p = Paginator::new(items(15), PageRequest::new(4).per_page(4))
            .await
            .unwrap();
        assert_eq!(p.showing(), 3);
        assert_eq!(p.end_index(), 14);
        assert!(!p.has_next());
        assert_eq!(p.items().await.unwrap(), vec![13, 14, 15]);
    }

    #[tokio::test]
    async fn test_last_sentinel() {
        let p = Paginator::new(items(15), PageRequest::new("last").per_page(4))
            .await
            .unwrap();
        assert_eq!(p.page(), 4);

        let empty = Paginator::new(Vec::<u32>::new(), PageRequest::new(PageNumber::Last))
            .await
            .unwrap();
        assert_eq!(empty.page(), 1);
        assert_eq!(empty.num_pages(), 0);
        assert_eq!(empty.showing(), 0);
        assert_eq!(empty.pages().count(), 0);
        assert!(!empty.is_paginated());
    }

    #[tokio::test]
    async fn test_zero_per_page_rejected() {
        let err = Paginator::new(items(3), PageRequest::new(1).per_page(0))
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::InvalidPagination(_)));
    }

    #[tokio::test]
    async fn test_page_past_the_end() {
        let p = Paginator::new(items(15), PageRequest::new(9).per_page(4))
            .await
            .unwrap();
        assert_eq!(p.showing(), 0);
        assert!(p.items().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_huge_page_number_saturates() {
        let p = Paginator::new(
            items(3),
            PageRequest::new("1844674407370955162").per_page(10),
        )
        .await
        .unwrap();
        assert_eq!(p.page(), 1_844_674_407_370_955_162);
        assert_eq!(p.showing(), 0);
        assert_eq!(p.end_index(), 2);
        assert_eq!(
            p.get_range(" - "),
            format!("{} - 3", p.start_index() + 1)
        );
        assert!(p.items().await.unwrap().is_empty());
        assert!(!p.has_next());

        let last = Paginator::new(items(3), PageRequest::new(u64::MAX).per_page(10))
            .await
            .unwrap();
        assert_eq!(last.start_index(), u64::MAX);
        assert_eq!(last.next_num(), u64::MAX);
        assert_eq!(last.get_range("-"), format!("{}-3", u64::MAX));
        assert_eq!(last.pages().last(), Some(Some(1)));
    }

    #[tokio::test]
    async fn test_fail_hook() {
        let err = Paginator::with_hook(
            items(15),
            PageRequest::new(9).per_page(4),
            OnEmptyPage::fail("no such page"),
        )
        .await
        .unwrap_err();

        match err {
            DbError::EmptyPage {
                page,
                num_pages,
                source,
            } => {
                assert_eq!(page, 9);
                assert_eq!(num_pages, 4);
                assert_eq!(source.to_string(), "no such page");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_recover_hook_replaces_outcome() {
        let p = Paginator::with_hook(
            items(15),
            PageRequest::new(9).per_page(4),
            OnEmptyPage::recover(|p: Paginator<Vec<u32>>| {
                let last = p.num_pages();
                let request = PageRequest::new(last).per_page(p.per_page()).total(p.total());
                Ok(Paginator::resolve(p.into_query(), request, 15))
            }),
        )
        .await
        .unwrap();
        assert_eq!(p.page(), 4);
        assert_eq!(p.showing(), 3);
    }

    #[tokio::test]
    async fn test_hook_not_run_for_non_empty_page() {
        let p = Paginator::with_hook(
            items(15),
            PageRequest::new(1).per_page(4),
            OnEmptyPage::fail("unreachable"),
        )
        .await
        .unwrap();
        assert_eq!(p.showing(), 4);
    }

    #[tokio::test]
    async fn test_explicit_total_skips_count() {
        let p = Paginator::new(items(3), PageRequest::new(2).per_page(10).total(25))
            .await
            .unwrap();
        assert_eq!(p.total(), 25);
        assert_eq!(p.num_pages(), 3);
        assert_eq!(p.showing(), 10);
    }

    #[tokio::test]
    async fn test_padding_widens_fetch() {
        let first = Paginator::new(items(30), PageRequest::new(1).per_page(5).padding(2))
            .await
            .unwrap();
        assert_eq!(first.items().await.unwrap(), vec![1, 2, 3, 4, 5, 6, 7]);

        let second = Paginator::new(items(30), PageRequest::new(2).per_page(5).padding(2))
            .await
            .unwrap();
        assert_eq!(
            second.items().await.unwrap(),
            vec![4, 5, 6, 7, 8, 9, 10, 11, 12]
        );
    }

    #[tokio::test]
    async fn test_prev_and_next() {
        let p = Paginator::new(items(15), PageRequest::new(1).per_page(4).padding(1))
            .await
            .unwrap();
        assert!(p.prev().await.unwrap().is_none());

        let next = p.next().await.unwrap().unwrap();
        assert_eq!(next.page(), 2);
        assert_eq!(next.per_page(), 4);
        assert_eq!(next.padding(), 1);

        let back = next.prev().await.unwrap().unwrap();
        assert_eq!(back.page(), 1);

        let last = Paginator::new(items(15), PageRequest::new("last").per_page(4))
            .await
            .unwrap();
        assert!(last.next().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_pages_window() {
        let p = Paginator::new(items(200), PageRequest::new(10))
            .await
            .unwrap();
        assert_eq!(p.num_pages(), 20);
        let pages: Vec<_> = p.pages().collect();
        assert_eq!(
            pages,
            vec![
                Some(1),
                Some(2),
                None,
                Some(7),
                Some(8),
                Some(9),
                Some(10),
                Some(11),
                Some(12),
                Some(13),
                None,
                Some(19),
                Some(20),
            ]
        );
        // restartable
        assert_eq!(p.pages().collect::<Vec<_>>(), pages);
    }
}
