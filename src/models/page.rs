/// One offset-paged slice of a backend listing.
///
/// The backend never reports a total, so a full page is taken to mean there
/// may be more rows after it.
#[derive(Debug, Clone)]
pub struct Page<T> {
    pub rows: Vec<T>,
    pub offset: usize,
    pub limit: usize,
    pub next_offset: Option<usize>,
}

impl<T> Page<T> {
    pub fn new(rows: Vec<T>, offset: usize, limit: usize) -> Self {
        let next_offset = (limit > 0 && rows.len() >= limit).then(|| offset + rows.len());
        Self {
            rows,
            offset,
            limit,
            next_offset,
        }
    }

    pub fn empty(limit: usize) -> Self {
        Self::new(Vec::new(), 0, limit)
    }

    pub fn has_more(&self) -> bool {
        self.next_offset.is_some()
    }

    pub fn previous_offset(&self) -> Option<usize> {
        (self.offset > 0).then(|| self.offset.saturating_sub(self.limit))
    }
}
