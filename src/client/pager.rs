//! Cursor pagination
//!
//! A [`Pager`] walks one listing page by page. It never loops on its own:
//! the caller decides when to ask for the next page and when to stop.

use crate::{Result, client::api::XhsApi, types::Page};

/// The listing a pager walks
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListQuery {
    /// Posts of one user
    UserNotes {
        user_id: String,
        xsec_token: String,
        /// Falls back to the configured default when unset
        xsec_source: Option<String>,
    },
    /// Top-level comments of one post
    Comments { note_id: String, xsec_token: String },
    /// Replies under one top-level comment
    SubComments {
        note_id: String,
        comment_id: String,
        xsec_token: String,
    },
}

/// Pagination state
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageState {
    /// Nothing fetched yet; the first request uses an empty cursor
    Start,
    InProgress { cursor: String },
    Done,
}

/// Page-by-page walker over a [`ListQuery`]
#[derive(Debug)]
pub struct Pager<'a> {
    api: &'a XhsApi,
    query: ListQuery,
    state: PageState,
    pages: usize,
}

impl<'a> Pager<'a> {
    pub fn new(api: &'a XhsApi, query: ListQuery) -> Self {
        Self {
            api,
            query,
            state: PageState::Start,
            pages: 0,
        }
    }

    /// Continue a walk from a cursor obtained earlier
    pub fn resume(api: &'a XhsApi, query: ListQuery, cursor: impl Into<String>) -> Self {
        let cursor = cursor.into();
        let state = if cursor.is_empty() {
            PageState::Start
        } else {
            PageState::InProgress { cursor }
        };
        Self {
            api,
            query,
            state,
            pages: 0,
        }
    }

    pub fn query(&self) -> &ListQuery {
        &self.query
    }

    pub fn state(&self) -> &PageState {
        &self.state
    }

    pub fn is_done(&self) -> bool {
        self.state == PageState::Done
    }

    /// Cursor the next request will carry
    pub fn cursor(&self) -> &str {
        match &self.state {
            PageState::InProgress { cursor } => cursor,
            PageState::Start | PageState::Done => "",
        }
    }

    /// Pages fetched by this pager so far
    pub fn pages_fetched(&self) -> usize {
        self.pages
    }

    /// Fetch the next page, or `None` once the listing is exhausted
    ///
    /// A failed fetch leaves the state untouched, so the same page can be
    /// requested again.
    pub async fn next_page(&mut self) -> Result<Option<Page>> {
        let cursor = match &self.state {
            PageState::Start => String::new(),
            PageState::InProgress { cursor } => cursor.clone(),
            PageState::Done => return Ok(None),
        };

        let page = self.api.fetch_page(&self.query, &cursor).await?;
        self.pages += 1;
        self.state = if page.is_continuable() {
            PageState::InProgress {
                cursor: page.cursor.clone(),
            }
        } else {
            PageState::Done
        };

        tracing::debug!(
            "Fetched page {} ({} items, has_more={})",
            self.pages,
            page.items().len(),
            page.has_more
        );
        Ok(Some(page))
    }
}
