pub mod application;
pub mod error;
pub mod jwt;
pub mod notification;
pub mod post;
pub mod provider;
pub mod rating;
pub mod review;

pub use application::ApplicationManager;
pub use error::{MarketError, MarketResult};
pub use jwt::JwtService;
pub use notification::{MongoNotificationSink, NotificationSink, NotifyError};
pub use post::PostManager;
pub use provider::ProviderDirectory;
pub use rating::RatingAggregator;
pub use review::ReviewManager;

use std::sync::Arc;

use rocket::{Build, Rocket};

use crate::db::MarketStore;

/// Builds every manager over one persistence handle and notification sink
/// and registers them as managed state.
pub fn manage(
    rocket: Rocket<Build>,
    store: Arc<dyn MarketStore>,
    notifier: Arc<dyn NotificationSink>,
) -> Rocket<Build> {
    rocket
        .manage(PostManager::new(store.clone()))
        .manage(ApplicationManager::new(store.clone(), notifier.clone()))
        .manage(ReviewManager::new(store.clone(), notifier))
        .manage(ProviderDirectory::new(store))
}
