use serde::Deserialize;

/// One page of a listing endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct PaginatedResponse<T> {
    pub data: Vec<T>,
    pub result_count: u64,
    pub result_offset: u64,
    pub result_limit: u64,
    pub result_total: u64,
}

impl<T> PaginatedResponse<T> {
    pub fn is_last(&self) -> bool {
        self.next_offset().is_none()
    }

    /// Offset of the following page, if there is one.
    pub fn next_offset(&self) -> Option<u64> {
        let next = self.result_offset + self.result_limit;
        (self.result_limit > 0 && next < self.result_total).then_some(next)
    }
}
