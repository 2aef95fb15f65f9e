//! Cursor-pagination driver.
//!
//! Every "list" style remote call returns a page plus an optional
//! continuation cursor. The paginator keeps calling until the cursor runs
//! out, waiting a fixed delay before every call except the first.

use std::future::Future;
use std::time::Duration;

use tracing::debug;

use crate::config::DEFAULT_POLL_INTERVAL_MS;
use crate::error::Result;
use crate::service::{Page, Paged};

/// Drives a paged remote call to completion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Paginator {
    delay: Duration,
}

impl Default for Paginator {
    fn default() -> Self {
        Self::new()
    }
}

impl Paginator {
    /// Creates a paginator with the default 200 ms delay between pages.
    pub fn new() -> Self {
        Self::with_delay(Duration::from_millis(DEFAULT_POLL_INTERVAL_MS))
    }

    pub fn with_delay(delay: Duration) -> Self {
        Self { delay }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Fetches every page, in order.
    ///
    /// `fetch` receives `None` on the first call and the previous page's
    /// cursor afterwards. Errors from `fetch` are returned unchanged and end
    /// the walk.
    pub async fn fetch_pages<P, F, Fut>(&self, mut fetch: F) -> Result<Vec<P>>
    where
        P: Paged,
        F: FnMut(Option<String>) -> Fut,
        Fut: Future<Output = Result<P>>,
    {
        let mut pages = Vec::new();
        let mut cursor: Option<String> = None;

        loop {
            if !pages.is_empty() {
                tokio::time::sleep(self.delay).await;
            }

            debug!("Fetching page {} (cursor: {:?})", pages.len() + 1, cursor);
            let page = fetch(cursor.take()).await?;
            cursor = page.next_token().map(String::from);
            pages.push(page);

            if cursor.is_none() {
                return Ok(pages);
            }
        }
    }

    /// Fetches every page of a listing and concatenates the items.
    ///
    /// A page whose item field is absent contributes nothing.
    pub async fn fetch_all<T, F, Fut>(&self, fetch: F) -> Result<Vec<T>>
    where
        F: FnMut(Option<String>) -> Fut,
        Fut: Future<Output = Result<Page<T>>>,
    {
        let pages = self.fetch_pages(fetch).await?;
        Ok(pages
            .into_iter()
            .flat_map(|page| page.items.unwrap_or_default())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AthenaError;
    use pretty_assertions::assert_eq;
    use std::sync::{Arc, Mutex};
    use tokio::time::Instant;

    fn scripted(pages: Vec<Page<u32>>) -> impl FnMut(Option<String>) -> std::future::Ready<Result<Page<u32>>> {
        let mut pages = pages.into_iter();
        move |_cursor| {
            std::future::ready(
                pages
                    .next()
                    .ok_or_else(|| AthenaError::internal("no more pages")),
            )
        }
    }

    #[tokio::test]
    async fn test_single_page() {
        let items = Paginator::new()
            .fetch_all(scripted(vec![Page::last(vec![1, 2])]))
            .await
            .unwrap();
        assert_eq!(items, vec![1, 2]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_concatenates_in_order() {
        let items = Paginator::new()
            .fetch_all(scripted(vec![
                Page::new(vec![1, 2], Some("a")),
                Page::new(vec![3], Some("b")),
                Page::last(vec![4, 5]),
            ]))
            .await
            .unwrap();
        assert_eq!(items, vec![1, 2, 3, 4, 5]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_absent_items_contribute_nothing() {
        let items = Paginator::new()
            .fetch_all(scripted(vec![
                Page::absent(Some("a")),
                Page::new(vec![7], Some("b")),
                Page::absent(None),
            ]))
            .await
            .unwrap();
        assert_eq!(items, vec![7]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_passes_cursor_forward() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let recorder = seen.clone();
        let mut pages = vec![Page::new(vec![1], Some("c1")), Page::last(vec![2])].into_iter();

        Paginator::new()
            .fetch_all(move |cursor| {
                recorder.lock().unwrap().push(cursor);
                std::future::ready(Ok(pages.next().unwrap()))
            })
            .await
            .unwrap();

        assert_eq!(*seen.lock().unwrap(), vec![None, Some("c1".to_string())]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_delay_before_every_call_but_first() {
        let times = Arc::new(Mutex::new(Vec::new()));
        let recorder = times.clone();
        let mut pages = vec![
            Page::new(vec![1], Some("c1")),
            Page::new(vec![2], Some("c2")),
            Page::last(vec![3]),
        ]
        .into_iter();

        let start = Instant::now();
        Paginator::new()
            .fetch_all(move |_| {
                recorder.lock().unwrap().push(Instant::now());
                std::future::ready(Ok(pages.next().unwrap()))
            })
            .await
            .unwrap();

        let offsets: Vec<_> = times
            .lock()
            .unwrap()
            .iter()
            .map(|t| t.duration_since(start))
            .collect();
        assert_eq!(
            offsets,
            vec![
                Duration::ZERO,
                Duration::from_millis(200),
                Duration::from_millis(400)
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_error_stops_walk() {
        let calls = Arc::new(Mutex::new(0));
        let counter = calls.clone();
        let mut pages = vec![Ok(Page::new(vec![1], Some("c1"))), Err(AthenaError::service("Throttled"))]
            .into_iter();

        let result = Paginator::new()
            .fetch_all(move |_| {
                *counter.lock().unwrap() += 1;
                std::future::ready(pages.next().unwrap())
            })
            .await;

        assert!(matches!(result, Err(AthenaError::Service(msg)) if msg == "Throttled"));
        assert_eq!(*calls.lock().unwrap(), 2);
    }

    #[test]
    fn test_custom_delay() {
        let paginator = Paginator::with_delay(Duration::from_millis(5));
        assert_eq!(paginator.delay(), Duration::from_millis(5));
        assert_eq!(Paginator::default().delay(), Duration::from_millis(200));
    }
}
