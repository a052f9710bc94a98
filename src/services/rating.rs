use std::sync::Arc;

use log::info;
use mongodb::bson::oid::ObjectId;

use super::MarketResult;
use crate::db::{MarketStore, RatingSummary};

/// Recomputes the denormalized `average_rating` / `review_count` of a provider
/// from the reviews that currently exist.
///
/// The read and the write are separate operations; a review created or
/// deleted concurrently for the same provider can leave a stale aggregate
/// until the next recomputation.
#[derive(Clone)]
pub struct RatingAggregator {
    store: Arc<dyn MarketStore>,
}

impl RatingAggregator {
    pub fn new(store: Arc<dyn MarketStore>) -> Self {
        RatingAggregator { store }
    }

    pub async fn recompute(&self, provider_id: ObjectId) -> MarketResult<RatingSummary> {
        let summary = match self.store.rating_summary(provider_id).await? {
            Some(raw) => RatingSummary {
                average: round_to_tenth(raw.average),
                count: raw.count,
            },
            None => RatingSummary {
                average: 0.0,
                count: 0,
            },
        };

        self.store
            .set_rating(provider_id, summary.average, summary.count)
            .await?;

        info!(
            "Provider {} rating recomputed: {:.1} from {} review(s)",
            provider_id, summary.average, summary.count
        );

        Ok(summary)
    }
}

pub fn round_to_tenth(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}
