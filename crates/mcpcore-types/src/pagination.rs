//! The opaque-cursor contract shared by every paginated list operation.

/// One page of results plus an optional continuation cursor.
///
/// `next_cursor` is `None` exactly when the caller has reached the end of
/// the collection; its value otherwise is private to whichever registry
/// produced it and must be passed back unmodified.
#[derive(Debug, Clone)]
pub struct Page<T> {
    /// The items in this page, in producer-defined (here: insertion) order.
    pub items: Vec<T>,
    /// Opaque continuation token, present unless this is the last page.
    pub next_cursor: Option<String>,
}

impl<T> Page<T> {
    /// A single final page containing every item.
    pub fn complete(items: Vec<T>) -> Self {
        Self {
            items,
            next_cursor: None,
        }
    }
}

/// A source that can be paged through with opaque cursors.
///
/// Implemented by each registry; [`Paginated::collect_all`] is the shared
/// "list until exhausted" helper every caller would otherwise reimplement.
pub trait Paginated {
    /// The element type yielded by each page.
    type Item;

    /// Fetch the page following `cursor` (or the first page when `None`).
    fn list(&self, cursor: Option<&str>) -> Page<Self::Item>;

    /// Repeatedly call [`Paginated::list`] until `next_cursor` is absent,
    /// concatenating every page. Property: the result contains every
    /// registered entry exactly once, in insertion order.
    fn collect_all(&self) -> Vec<Self::Item> {
        let mut out = Vec::new();
        let mut cursor: Option<String> = None;
        loop {
            let mut page = self.list(cursor.as_deref());
            out.append(&mut page.items);
            match page.next_cursor {
                Some(next) => cursor = Some(next),
                None => break,
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Source(Vec<u32>);

    impl Paginated for Source {
        type Item = u32;

        fn list(&self, cursor: Option<&str>) -> Page<u32> {
            let start: usize = cursor.and_then(|c| c.parse().ok()).unwrap_or(0);
            const PAGE_SIZE: usize = 2;
            let end = (start + PAGE_SIZE).min(self.0.len());
            let items = self.0[start..end].to_vec();
            let next_cursor = if end < self.0.len() {
                Some(end.to_string())
            } else {
                None
            };
            Page { items, next_cursor }
        }
    }

    #[test]
    fn collect_all_concatenates_every_page() {
        let source = Source(vec![1, 2, 3, 4, 5]);
        assert_eq!(source.collect_all(), vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn collect_all_handles_empty_source() {
        let source = Source(vec![]);
        assert!(source.collect_all().is_empty());
    }

    #[test]
    fn collect_all_handles_single_page() {
        let source = Source(vec![1]);
        assert_eq!(source.collect_all(), vec![1]);
    }
}
