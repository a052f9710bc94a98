pub mod mongo;
pub mod store;

pub use mongo::MongoStore;
pub use store::*;

use std::sync::Arc;

use log::{error, info};
use mongodb::bson::doc;
use mongodb::options::IndexOptions;
use mongodb::{Client, Database, IndexModel};
use rocket::fairing::AdHoc;

use crate::services::{self, MongoNotificationSink};

/// Connects to MongoDB, makes sure the indexes exist and hands the managers
/// built over that connection to Rocket. Launch is aborted if any step fails.
pub fn init() -> AdHoc {
    AdHoc::try_on_ignite("MongoDB", |rocket| async move {
        let database = match connect().await {
            Ok(database) => database,
            Err(e) => {
                error!("✗ Failed to connect to MongoDB: {}", e);
                return Err(rocket);
            }
        };
        info!("✓ MongoDB connected successfully");

        if let Err(e) = ensure_indexes(&database).await {
            error!("✗ Failed to create indexes: {}", e);
            return Err(rocket);
        }

        let store: Arc<dyn MarketStore> = Arc::new(MongoStore::new(database.clone()));
        let notifier = Arc::new(MongoNotificationSink::new(database));

        Ok(services::manage(rocket, store, notifier))
    })
}

async fn connect() -> Result<Database, mongodb::error::Error> {
    let uri = crate::config::Config::mongodb_uri();
    let client = Client::with_uri_str(&uri).await?;

    // Test connection
    client
        .database("admin")
        .run_command(doc! {"ping": 1}, None)
        .await?;

    Ok(client.database(&crate::config::Config::database_name()))
}

async fn ensure_indexes(db: &Database) -> Result<(), mongodb::error::Error> {
    let unique = || IndexOptions::builder().unique(true).build();

    // One application per provider per post.
    db.collection::<mongodb::bson::Document>(mongo::APPLICATIONS)
        .create_index(
            IndexModel::builder()
                .keys(doc! { "post_id": 1, "provider_id": 1 })
                .options(unique())
                .build(),
            None,
        )
        .await?;

    // One review per application.
    db.collection::<mongodb::bson::Document>(mongo::REVIEWS)
        .create_index(
            IndexModel::builder()
                .keys(doc! { "application_id": 1 })
                .options(unique())
                .build(),
            None,
        )
        .await?;

    db.collection::<mongodb::bson::Document>(mongo::REVIEWS)
        .create_index(
            IndexModel::builder()
                .keys(doc! { "provider_id": 1, "created_at": -1 })
                .build(),
            None,
        )
        .await?;

    db.collection::<mongodb::bson::Document>(mongo::POSTS)
        .create_index(
            IndexModel::builder()
                .keys(doc! { "owner_id": 1, "created_at": -1 })
                .build(),
            None,
        )
        .await?;

    info!("✓ MongoDB indexes ensured");
    Ok(())
}
