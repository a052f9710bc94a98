pub mod pagination;
pub mod response;
pub mod validation;

pub use pagination::*;
pub use response::*;
pub use validation::*;

use mongodb::bson::DateTime;

/// RFC 3339 rendering of a stored timestamp for API responses.
pub fn timestamp(value: &DateTime) -> String {
    value.try_to_rfc3339_string().unwrap_or_default()
}
