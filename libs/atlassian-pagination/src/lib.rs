// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright 2026 Edgecast Cloud LLC.

//! Follow-the-pointer pagination
//!
//! Atlassian collection endpoints paginate three different ways: an
//! absolute `nextPage` URL (Jira filter search), an opaque
//! `nextPageToken` (Jira JQL search), and a site-relative `_links.next`
//! URL (Confluence v2). All three reduce to the same loop: take a page,
//! and while the page carries a pointer, fetch the page that pointer
//! names. [`drain`] is that loop, written once.
//!
//! Pointers are server-controlled, so the loop defends itself: a pointer
//! seen twice aborts (a misbehaving server would otherwise spin us
//! forever) and the total page count is capped.

use std::collections::HashSet;
use thiserror::Error;

/// Pages fetched per collection before [`DrainError::PageLimit`]; far
/// beyond any collection these clients read, this only trips on a
/// server bug.
pub const DEFAULT_PAGE_LIMIT: usize = 1000;

/// One page of a paginated collection.
pub trait Page {
    type Item;

    /// Split the page into its items and the pointer to the next page.
    /// `None` (or an empty pointer) means this was the last page.
    fn into_page(self) -> (Vec<Self::Item>, Option<String>);
}

/// Failure while draining a paginated collection.
#[derive(Debug, Error)]
pub enum DrainError<E>
where
    E: std::error::Error + 'static,
{
    /// A page fetch failed; pages already collected are discarded.
    #[error(transparent)]
    Fetch(E),

    /// The server handed back a next-page pointer it already served.
    #[error("server repeated next-page pointer '{0}'")]
    PointerLoop(String),

    /// The collection kept paginating past the configured limit.
    #[error("pagination exceeded {0} pages")]
    PageLimit(usize),
}

/// Collect every item of a paginated collection, strictly sequentially.
///
/// `first` is the already-fetched first page; `fetch_next` is invoked
/// once per non-terminal pointer. Page order (and item order within a
/// page) is preserved.
pub async fn drain<P, F, Fut, E>(first: P, fetch_next: F) -> Result<Vec<P::Item>, DrainError<E>>
where
    P: Page,
    F: FnMut(String) -> Fut,
    Fut: Future<Output = Result<P, E>>,
    E: std::error::Error + 'static,
{
    drain_with_limit(first, fetch_next, DEFAULT_PAGE_LIMIT).await
}

/// [`drain`] with an explicit page cap.
pub async fn drain_with_limit<P, F, Fut, E>(
    first: P,
    mut fetch_next: F,
    max_pages: usize,
) -> Result<Vec<P::Item>, DrainError<E>>
where
    P: Page,
    F: FnMut(String) -> Fut,
    Fut: Future<Output = Result<P, E>>,
    E: std::error::Error + 'static,
{
    let mut visited: HashSet<String> = HashSet::new();
    let (batch, mut pointer) = first.into_page();
    let mut items = batch;
    let mut pages = 1usize;

    while let Some(next) = pointer.take().filter(|p| !p.is_empty()) {
        if !visited.insert(next.clone()) {
            return Err(DrainError::PointerLoop(next));
        }
        pages += 1;
        if pages > max_pages {
            return Err(DrainError::PageLimit(max_pages));
        }

        let page = fetch_next(next).await.map_err(DrainError::Fetch)?;
        let (batch, following) = page.into_page();
        items.extend(batch);
        pointer = following;
    }

    Ok(items)
}
