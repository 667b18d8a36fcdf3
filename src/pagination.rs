//! Page-based navigation over article listings

use conduit_gateway::types::{ArticleParams, ArticlesResponse, FeedParams};

/// Articles per page unless configured otherwise
pub const DEFAULT_PAGE_SIZE: u32 = 20;

/// Current page plus the bounds implied by the last known article count.
///
/// Pages are 1-based. Moves outside `1..=total_pages()` are ignored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pagination {
    initial_page: u32,
    current_page: u32,
    page_size: u32,
    total_count: u64,
}

impl Default for Pagination {
    fn default() -> Self {
        Self::new(1, DEFAULT_PAGE_SIZE)
    }
}

impl Pagination {
    pub fn new(initial_page: u32, page_size: u32) -> Self {
        let initial_page = initial_page.max(1);
        Self {
            initial_page,
            current_page: initial_page,
            page_size: page_size.max(1),
            total_count: 0,
        }
    }

    /// Record the `articlesCount` of the latest response
    pub fn set_total_count(&mut self, total_count: u64) {
        self.total_count = total_count;
    }

    pub fn current_page(&self) -> u32 {
        self.current_page
    }

    pub fn limit(&self) -> u32 {
        self.page_size
    }

    pub fn offset(&self) -> u32 {
        (self.current_page - 1).saturating_mul(self.page_size)
    }

    pub fn total_pages(&self) -> u64 {
        self.total_count.div_ceil(u64::from(self.page_size))
    }

    pub fn has_next_page(&self) -> bool {
        u64::from(self.current_page) < self.total_pages()
    }

    pub fn has_previous_page(&self) -> bool {
        self.current_page > 1
    }

    pub fn next_page(&mut self) {
        if self.has_next_page() {
            self.current_page += 1;
        }
    }

    pub fn previous_page(&mut self) {
        if self.has_previous_page() {
            self.current_page -= 1;
        }
    }

    pub fn go_to(&mut self, page: u32) {
        if page >= 1 && u64::from(page) <= self.total_pages() {
            self.current_page = page;
        }
    }

    pub fn reset(&mut self) {
        self.current_page = self.initial_page;
    }

    /// Listing parameters for the current page.
    ///
    /// Fields set in `filters` win, including an explicit limit or offset.
    pub fn article_params(&self, filters: ArticleParams) -> ArticleParams {
        ArticleParams {
            limit: filters.limit.or(Some(self.limit())),
            offset: filters.offset.or(Some(self.offset())),
            ..filters
        }
    }

    pub fn feed_params(&self) -> FeedParams {
        FeedParams {
            limit: Some(self.limit()),
            offset: Some(self.offset()),
        }
    }
}

/// Index of the next page to fetch for infinite scrolling, if any remain.
///
/// `pages_loaded` is how many pages have been fetched so far and `last` the
/// most recent of them.
pub fn next_page_param(last: &ArticlesResponse, pages_loaded: usize, page_size: u32) -> Option<usize> {
    let fetched = (pages_loaded as u64).saturating_mul(u64::from(page_size));
    if fetched < last.articles_count {
        Some(pages_loaded)
    } else {
        None
    }
}
