//!
//! src/paginate.rs
//!
//! Generic paginated fetch used by every provider client. A client supplies
//! a page-fetch closure and says how each page signals the end of the
//! listing; the paginator advances the window and concatenates items in the
//! order the provider returned them
//!

use std::future::Future;

/// Position of the page being requested
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub index: u32,     // zero based page number
    pub offset: u32,    // index * page_size
    pub limit: u32      // page size
}

impl PageRequest {
    /// One based page number for page-numbered apis
    pub fn page_number(&self) -> u32 { self.index + 1 }
}

/// A fetched page and whether the provider has more after it
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub has_more: bool
}

impl<T> Page<T> {
    /// Offset style listing, a page shorter than requested is the last one
    pub fn sized(items: Vec<T>, page_size: u32) -> Self {
        let has_more = items.len() >= page_size as usize;
        Self { items, has_more }
    }

    /// Cursor style listing, the provider reports the next page link
    pub fn linked(items: Vec<T>, next: Option<&str>) -> Self {
        Self { items, has_more: next.is_some() }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Paginator {
    page_size: u32,
    max_items: Option<usize>
}

impl Paginator {
    pub fn new(page_size: u32) -> Self {
        Self { page_size: page_size.max(1), max_items: None }
    }

    /// Stops once this many items are held and truncates to it
    pub fn with_max_items(mut self, max_items: usize) -> Self {
        self.max_items = Some(max_items);
        self
    }

    pub fn page_size(&self) -> u32 { self.page_size }

    /// Requests pages until one is empty, reports no further page, or the
    /// item cap is reached. The first error aborts the whole listing
    pub async fn collect<T, E, F, Fut>(&self, mut fetch_page: F) -> Result<Vec<T>, E>
    where
        F: FnMut(PageRequest) -> Fut,
        Fut: Future<Output = Result<Page<T>, E>>,
    {
        let mut all = Vec::new();
        let mut index = 0_u32;

        loop {
            if let Some(cap) = self.max_items {
                if all.len() >= cap {
                    break;
                }
            }

            let request = PageRequest {
                index,
                offset: index * self.page_size,
                limit: self.page_size
            };
            let page = fetch_page(request).await?;
            let fetched = page.items.len();
            all.extend(page.items);

            if fetched == 0 || !page.has_more {
                break;
            }
            index += 1;
        }

        if let Some(cap) = self.max_items {
            all.truncate(cap);
        }
        Ok(all)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    /// Serves `total` sequential integers in pages of the requested size
    fn source(total: u32, request: PageRequest) -> Vec<u32> {
        let end = (request.offset + request.limit).min(total);
        (request.offset.min(total)..end).collect()
    }

    #[tokio::test]
    async fn short_page_stops_iteration() -> Result<(), String> {
        let calls = Cell::new(0);
        let items = Paginator::new(100)
            .collect(|req| {
                calls.set(calls.get() + 1);
                let items = source(250, req);
                async move { Ok::<_, String>(Page::sized(items, req.limit)) }
            })
            .await?;

        assert_eq!(calls.get(), 3);
        assert_eq!(items.len(), 250);
        assert!(items.windows(2).all(|w| w[0] + 1 == w[1]));
        Ok(())
    }

    #[tokio::test]
    async fn linked_pages_request_exactly_ceil_total_over_size() -> Result<(), String> {
        for total in [200_u32, 201, 50, 1] {
            let calls = Cell::new(0);
            let items = Paginator::new(50)
                .collect(|req| {
                    calls.set(calls.get() + 1);
                    let items = source(total, req);
                    let next = (req.offset + req.limit < total).then_some("next");
                    async move { Ok::<_, String>(Page::linked(items, next)) }
                })
                .await?;

            assert_eq!(calls.get(), total.div_ceil(50));
            assert_eq!(items, (0..total).collect::<Vec<_>>());
        }
        Ok(())
    }

    #[tokio::test]
    async fn exact_multiple_with_sized_pages_needs_one_empty_page() -> Result<(), String> {
        let calls = Cell::new(0);
        let items = Paginator::new(100)
            .collect(|req| {
                calls.set(calls.get() + 1);
                let items = source(200, req);
                async move { Ok::<_, String>(Page::sized(items, req.limit)) }
            })
            .await?;

        assert_eq!(calls.get(), 3);
        assert_eq!(items.len(), 200);
        Ok(())
    }

    #[tokio::test]
    async fn empty_first_page_yields_nothing() -> Result<(), String> {
        let items: Vec<u32> = Paginator::new(10)
            .collect(|_| async { Ok::<_, String>(Page { items: vec![], has_more: true }) })
            .await?;
        assert!(items.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn max_items_truncates_and_stops() -> Result<(), String> {
        let calls = Cell::new(0);
        let items = Paginator::new(20)
            .with_max_items(50)
            .collect(|req| {
                calls.set(calls.get() + 1);
                let items = source(1000, req);
                async move { Ok::<_, String>(Page::sized(items, req.limit)) }
            })
            .await?;

        assert_eq!(calls.get(), 3);
        assert_eq!(items.len(), 50);
        assert_eq!(items.last(), Some(&49));
        Ok(())
    }

    #[tokio::test]
    async fn errors_abort_the_listing() {
        let result: Result<Vec<u32>, String> = Paginator::new(10)
            .collect(|req| async move {
                if req.index == 1 {
                    Err("boom".to_string())
                } else {
                    Ok(Page::sized((0..10).collect(), 10))
                }
            })
            .await;
        assert_eq!(result, Err("boom".to_string()));
    }

    #[test]
    fn page_numbers_are_one_based() {
        let req = PageRequest { index: 2, offset: 200, limit: 100 };
        assert_eq!(req.page_number(), 3);
    }
}
