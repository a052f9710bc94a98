use std::sync::Arc;

use rocket::http::{Header, Status};
use rocket::local::asynchronous::{Client, LocalResponse};
use serde_json::{json, Value};

use super::common::*;
use crate::db::MarketStore;
use crate::models::Identity;
use crate::services::{self, JwtService, NotificationSink};

struct Api {
    client: Client,
    store: Arc<MemoryStore>,
}

impl Api {
    async fn start() -> Self {
        let store = Arc::new(MemoryStore::default());
        let shared: Arc<dyn MarketStore> = store.clone();
        let notifier: Arc<dyn NotificationSink> = Arc::new(MemoryNotifier::default());

        let rocket = crate::mount_api(services::manage(rocket::build(), shared, notifier));
        let client = Client::tracked(rocket).await.expect("valid rocket");
        Api { client, store }
    }

    fn bearer(identity: &Identity) -> Header<'static> {
        let token = JwtService::generate_access_token(&identity.user_id, identity.role)
            .expect("token");
        Header::new("Authorization", format!("Bearer {}", token))
    }

    async fn post_json(&self, path: &str, who: &Identity, body: Value) -> LocalResponse<'_> {
        self.client
            .post(path.to_string())
            .header(Self::bearer(who))
            .json(&body)
            .dispatch()
            .await
    }

    async fn put_json(&self, path: &str, who: &Identity, body: Value) -> LocalResponse<'_> {
        self.client
            .put(path.to_string())
            .header(Self::bearer(who))
            .json(&body)
            .dispatch()
            .await
    }

    async fn get_as(&self, path: &str, who: &Identity) -> LocalResponse<'_> {
        self.client
            .get(path.to_string())
            .header(Self::bearer(who))
            .dispatch()
            .await
    }

    async fn delete_as(&self, path: &str, who: &Identity) -> LocalResponse<'_> {
        self.client
            .delete(path.to_string())
            .header(Self::bearer(who))
            .dispatch()
            .await
    }
}

async fn body(response: LocalResponse<'_>) -> Value {
    response.into_json::<Value>().await.expect("json body")
}

fn post_body() -> Value {
    json!({
        "title": "Logo redesign",
        "description": "Looking for someone to deliver this within two weeks.",
        "category": "design",
        "budget": 300.0,
        "location": { "city": "Porto", "country": "Portugal", "remote": true }
    })
}

#[rocket::async_test]
async fn missing_token_is_unauthorized() {
    let api = Api::start().await;

    let response = api
        .client
        .post("/api/v1/posts")
        .json(&post_body())
        .dispatch()
        .await;

    assert_eq!(response.status(), Status::Unauthorized);
    let payload = body(response).await;
    assert_eq!(payload["success"], json!(false));
    assert_eq!(payload["message"], json!("Authentication required"));

    let forged = api
        .client
        .get("/api/v1/posts/mine")
        .header(Header::new("Authorization", "Bearer not-a-token"))
        .dispatch()
        .await;
    assert_eq!(forged.status(), Status::Unauthorized);
}

#[rocket::async_test]
async fn huge_page_numbers_return_an_empty_page() {
    let api = Api::start().await;
    let seeker = api.store.add_user("Sara", crate::models::Role::Seeker);
    api.post_json("/api/v1/posts", &seeker, post_body()).await;

    let response = api
        .client
        .get(format!("/api/v1/posts?page={}&limit=100", i64::MAX))
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::Ok);
    let page = body(response).await;
    assert_eq!(page["data"]["items"], json!([]));
    assert_eq!(page["data"]["pagination"]["total"], json!(1));

    let reviews = api
        .client
        .get(format!(
            "/api/v1/reviews/provider/{}?page={}",
            mongodb::bson::oid::ObjectId::new(),
            i64::MAX
        ))
        .dispatch()
        .await;
    assert_eq!(reviews.status(), Status::Ok);
}

#[rocket::async_test]
async fn marketplace_flow_over_http() {
    let api = Api::start().await;
    let seeker = api.store.add_user("Sara", crate::models::Role::Seeker);
    let provider = api.store.add_user("Bruno", crate::models::Role::Provider);

    let created = api.post_json("/api/v1/posts", &seeker, post_body()).await;
    assert_eq!(created.status(), Status::Ok);
    let post_id = body(created).await["data"]["id"]
        .as_str()
        .expect("post id")
        .to_string();

    let applied = api
        .post_json(
            "/api/v1/applications",
            &provider,
            json!({ "post_id": post_id, "message": "I have 5 years experience in this field" }),
        )
        .await;
    assert_eq!(applied.status(), Status::Ok);
    let applied = body(applied).await;
    assert_eq!(applied["data"]["status"], json!("PENDING"));
    let application_id = applied["data"]["id"].as_str().expect("id").to_string();

    let again = api
        .post_json(
            "/api/v1/applications",
            &provider,
            json!({ "post_id": post_id, "message": "I have 5 years experience in this field" }),
        )
        .await;
    assert_eq!(again.status(), Status::Conflict);

    let accepted = api
        .put_json(
            &format!("/api/v1/applications/{}/status", application_id),
            &seeker,
            json!({ "status": "ACCEPTED" }),
        )
        .await;
    assert_eq!(accepted.status(), Status::Ok);

    let post = body(api.client.get(format!("/api/v1/posts/{}", post_id)).dispatch().await).await;
    assert_eq!(post["data"]["status"], json!("CLOSED"));
    assert_eq!(post["data"]["owner_name"], json!("Sara"));
    assert_eq!(post["data"]["application_count"], json!(1));

    let withdraw = api
        .delete_as(&format!("/api/v1/applications/{}", application_id), &provider)
        .await;
    assert_eq!(withdraw.status(), Status::BadRequest);

    let reviewed = api
        .post_json(
            "/api/v1/reviews",
            &seeker,
            json!({ "application_id": application_id, "rating": 5, "comment": "Great work" }),
        )
        .await;
    assert_eq!(reviewed.status(), Status::Ok);
    let review_id = body(reviewed).await["data"]["id"]
        .as_str()
        .expect("review id")
        .to_string();

    let profile_path = format!("/api/v1/providers/{}", provider.user_id.to_hex());
    let profile = body(api.client.get(profile_path.clone()).dispatch().await).await;
    assert_eq!(profile["data"]["average_rating"], json!(5.0));
    assert_eq!(profile["data"]["review_count"], json!(1));

    let listing = body(
        api.client
            .get(format!(
                "/api/v1/reviews/provider/{}?page=1&limit=10",
                provider.user_id.to_hex()
            ))
            .dispatch()
            .await,
    )
    .await;
    assert_eq!(listing["data"]["pagination"]["total"], json!(1));
    assert_eq!(listing["data"]["items"][0]["seeker_name"], json!("Sara"));

    let deleted = api
        .delete_as(&format!("/api/v1/reviews/{}", review_id), &seeker)
        .await;
    assert_eq!(deleted.status(), Status::Ok);

    let profile = body(api.client.get(profile_path).dispatch().await).await;
    assert_eq!(profile["data"]["average_rating"], json!(0.0));
    assert_eq!(profile["data"]["review_count"], json!(0));
}

#[rocket::async_test]
async fn errors_map_to_status_codes() {
    let api = Api::start().await;
    let seeker = api.store.add_user("Sara", crate::models::Role::Seeker);
    let provider = api.store.add_user("Bruno", crate::models::Role::Provider);

    let forbidden = api.post_json("/api/v1/posts", &provider, post_body()).await;
    assert_eq!(forbidden.status(), Status::Forbidden);

    let mut invalid = post_body();
    invalid["title"] = json!("Logo");
    let rejected = api.post_json("/api/v1/posts", &seeker, invalid).await;
    assert_eq!(rejected.status(), Status::BadRequest);
    assert_eq!(
        body(rejected).await["message"],
        json!("Title must be 5-100 characters")
    );

    let missing = api
        .get_as(&format!("/api/v1/posts/{}/applications", mongodb::bson::oid::ObjectId::new()), &seeker)
        .await;
    assert_eq!(missing.status(), Status::NotFound);

    let mut unknown_category = post_body();
    unknown_category["category"] = json!("gardening");
    let unprocessable = api.post_json("/api/v1/posts", &seeker, unknown_category).await;
    assert_eq!(unprocessable.status(), Status::UnprocessableEntity);
}

#[rocket::async_test]
async fn own_listings_resolve_before_id_routes() {
    let api = Api::start().await;
    let seeker = api.store.add_user("Sara", crate::models::Role::Seeker);
    let provider = api.store.add_user("Bruno", crate::models::Role::Provider);
    api.post_json("/api/v1/posts", &seeker, post_body()).await;

    let mine = body(api.get_as("/api/v1/posts/mine", &seeker).await).await;
    assert_eq!(mine["data"].as_array().map(Vec::len), Some(1));

    let applications = api.get_as("/api/v1/applications/mine", &provider).await;
    assert_eq!(applications.status(), Status::Ok);

    let browse = body(
        api.client
            .get("/api/v1/posts?category=design&remote=true&search=logo")
            .dispatch()
            .await,
    )
    .await;
    assert_eq!(browse["data"]["pagination"]["total"], json!(1));
}

#[rocket::async_test]
async fn openapi_document_is_served() {
    let api = Api::start().await;

    let response = api.client.get("/api/v1/openapi.json").dispatch().await;

    assert_eq!(response.status(), Status::Ok);
    let document = body(response).await;
    assert!(document["openapi"].is_string());
    assert!(document["paths"].as_object().is_some_and(|paths| !paths.is_empty()));
}
