use serde::Serialize;

/// A page of entities (or raw tuples) paired with the total number of rows
/// matching the predicate, independent of the pagination window.
///
/// Paginated UIs need both numbers simultaneously, which is why scroll
/// queries run a page query and an un-windowed count query back to back.
#[derive(Debug, Clone, Serialize)]
pub struct QueryResult<T> {
    pub rows: Vec<T>,
    pub total: u64,
}

impl<T> QueryResult<T> {
    pub fn new(rows: Vec<T>, total: u64) -> Self {
        Self { rows, total }
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}
