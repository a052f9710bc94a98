use std::sync::Arc;

use super::{MarketError, MarketResult};
use crate::db::MarketStore;
use crate::models::{PublicProfile, Role};
use crate::utils::parse_object_id;

/// Read-only access to provider profiles and their rating projection.
#[derive(Clone)]
pub struct ProviderDirectory {
    store: Arc<dyn MarketStore>,
}

impl ProviderDirectory {
    pub fn new(store: Arc<dyn MarketStore>) -> Self {
        ProviderDirectory { store }
    }

    pub async fn profile(&self, provider_id: &str) -> MarketResult<PublicProfile> {
        let provider_id = parse_object_id(provider_id, "provider")?;
        self.store
            .find_user(provider_id)
            .await?
            .filter(|user| user.role == Role::Provider)
            .map(PublicProfile::from)
            .ok_or_else(|| MarketError::not_found("Provider not found"))
    }
}
