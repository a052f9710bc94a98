use mongodb::bson::oid::ObjectId;
use validator::{Validate, ValidationErrors, ValidationErrorsKind};

use crate::services::MarketError;

/// Runs the derived validator and reports only the first violated constraint,
/// taking fields in `field_order` (the declaration order of the DTO).
pub fn validate_dto<T: Validate>(dto: &T, field_order: &[&str]) -> Result<(), MarketError> {
    dto.validate()
        .map_err(|errors| MarketError::ValidationFailed(first_violation(&errors, field_order)))
}

pub fn first_violation(errors: &ValidationErrors, field_order: &[&str]) -> String {
    let map = errors.errors();
    let mut fields: Vec<&str> = map.keys().copied().collect();
    fields.sort_by_key(|field| {
        (
            field_order
                .iter()
                .position(|known| known == field)
                .unwrap_or(usize::MAX),
            *field,
        )
    });

    fields
        .first()
        .and_then(|field| map.get(field).map(|kind| describe(field, kind)))
        .unwrap_or_else(|| "Invalid input".to_string())
}

fn describe(field: &str, kind: &ValidationErrorsKind) -> String {
    match kind {
        ValidationErrorsKind::Field(violations) => violations
            .first()
            .and_then(|v| v.message.as_ref().map(|m| m.to_string()))
            .unwrap_or_else(|| format!("Invalid value for {}", field)),
        ValidationErrorsKind::Struct(inner) => first_violation(inner, &[]),
        ValidationErrorsKind::List(items) => items
            .values()
            .next()
            .map(|inner| first_violation(inner, &[]))
            .unwrap_or_else(|| format!("Invalid value for {}", field)),
    }
}

pub fn parse_object_id(raw: &str, what: &str) -> Result<ObjectId, MarketError> {
    ObjectId::parse_str(raw.trim())
        .map_err(|_| MarketError::ValidationFailed(format!("Invalid {} ID", what)))
}
