//! Pagination over a filtered order list

/// One page of items
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page<'a, T> {
    /// Items on this page
    pub items: &'a [T],
    /// 1-based page number, after clamping
    pub number: usize,
    /// Number of pages, at least one
    pub total_pages: usize,
    /// Items across all pages
    pub total_items: usize,
    /// 1-based position of the first item shown, 0 when empty
    pub start_item: usize,
    /// 1-based position of the last item shown, 0 when empty
    pub end_item: usize,
}

impl<'a, T> Page<'a, T> {
    /// Page `number` (1-based) of `items`, `per_page` at a time
    ///
    /// The page number is clamped to the available pages.
    #[must_use]
    pub fn of(items: &'a [T], number: usize, per_page: usize) -> Self {
        let per_page = per_page.max(1);
        let total_items = items.len();
        let total_pages = total_items.div_ceil(per_page).max(1);
        let number = number.clamp(1, total_pages);

        let start = (number - 1) * per_page;
        let end = (start + per_page).min(total_items);
        let (start_item, end_item) = if start < end {
            (start + 1, end)
        } else {
            (0, 0)
        };

        Self {
            items: &items[start.min(total_items)..end],
            number,
            total_pages,
            total_items,
            start_item,
            end_item,
        }
    }

    /// Check if a later page exists
    #[inline]
    #[must_use]
    pub fn has_next(&self) -> bool {
        self.number < self.total_pages
    }

    /// Check if an earlier page exists
    #[inline]
    #[must_use]
    pub fn has_previous(&self) -> bool {
        self.number > 1
    }
}
