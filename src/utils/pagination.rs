use serde::Serialize;
use rocket_okapi::okapi::schemars::JsonSchema;

const DEFAULT_LIMIT: i64 = 20;
const MAX_LIMIT: i64 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub page: i64,
    pub limit: i64,
}

impl Page {
    pub fn new(page: Option<i64>, limit: Option<i64>) -> Self {
        Page {
            page: page.unwrap_or(1).max(1),
            limit: limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT),
        }
    }

    /// Saturates for page numbers too large to address.
    pub fn skip(&self) -> u64 {
        u64::try_from((self.page - 1).saturating_mul(self.limit)).unwrap_or(u64::MAX)
    }

    pub fn info(&self, total: u64) -> Pagination {
        Pagination {
            page: self.page,
            limit: self.limit,
            total,
            pages: (total as f64 / self.limit as f64).ceil() as i64,
        }
    }
}

#[derive(Debug, Serialize, Clone, PartialEq, JsonSchema)]
pub struct Pagination {
    pub page: i64,
    pub limit: i64,
    pub total: u64,
    pub pages: i64,
}

#[derive(Debug, Serialize, Clone, PartialEq, JsonSchema)]
pub struct Paginated<T> {
    pub items: Vec<T>,
    pub pagination: Pagination,
}
