#[macro_use]
extern crate rocket;

mod config;
mod db;
mod guards;
mod models;
mod routes;
mod services;
mod utils;

#[cfg(test)]
mod tests;

use dotenvy::dotenv;
use log::info;
use rocket::fairing::{Fairing, Info, Kind};
use rocket::http::Header;
use rocket::{Build, Request, Response, Rocket};
use rocket_okapi::openapi_get_routes;
use rocket_okapi::swagger_ui::{SwaggerUIConfig, make_swagger_ui};

use crate::config::Config;
use crate::services::MarketError;

/* ----------------------------- CORS ----------------------------- */

pub struct CORS;

#[rocket::async_trait]
impl Fairing for CORS {
    fn info(&self) -> Info {
        Info {
            name: "CORS",
            kind: Kind::Response,
        }
    }

    async fn on_response<'r>(&self, request: &'r Request<'_>, response: &mut Response<'r>) {
        if let Some(origin) = request.headers().get_one("Origin") {
            response.set_header(Header::new("Access-Control-Allow-Origin", origin));
        }

        response.set_header(Header::new(
            "Access-Control-Allow-Methods",
            "GET, POST, PUT, DELETE, OPTIONS",
        ));

        response.set_header(Header::new(
            "Access-Control-Allow-Headers",
            "Content-Type, Authorization",
        ));

        response.set_header(Header::new("Access-Control-Allow-Credentials", "true"));
    }
}

/* ----------------------------- OPTIONS ----------------------------- */

#[options("/<_..>")]
fn options_handler() {}

/* ----------------------------- ERRORS ----------------------------- */

fn failure(message: &str) -> rocket::serde::json::Value {
    rocket::serde::json::json!({
        "success": false,
        "message": message
    })
}

#[catch(400)]
fn bad_request() -> rocket::serde::json::Value {
    failure("Malformed request body")
}

#[catch(401)]
fn unauthorized() -> rocket::serde::json::Value {
    failure(&MarketError::Unauthenticated.to_string())
}

#[catch(403)]
fn forbidden() -> rocket::serde::json::Value {
    failure("Access denied")
}

#[catch(404)]
fn not_found() -> rocket::serde::json::Value {
    failure("Resource not found (check /api/v1 prefix)")
}

#[catch(422)]
fn unprocessable() -> rocket::serde::json::Value {
    failure("Request body has invalid or missing fields")
}

#[catch(500)]
fn internal_error() -> rocket::serde::json::Value {
    failure("Internal server error")
}

/* ----------------------------- SWAGGER ----------------------------- */

fn swagger_config() -> SwaggerUIConfig {
    SwaggerUIConfig {
        url: "/api/v1/openapi.json".to_string(),
        ..Default::default()
    }
}

/* ----------------------------- MOUNT ----------------------------- */

/// Mounts the HTTP surface on a rocket whose managers are already managed.
pub fn mount_api(rocket: Rocket<Build>) -> Rocket<Build> {
    rocket
        .attach(CORS)
        .mount("/", routes![options_handler])
        .mount(
            "/api/v1",
            openapi_get_routes![
                // Posts
                routes::post::create_post,
                routes::post::browse_posts,
                routes::post::get_my_posts,
                routes::post::get_post,
                routes::post::update_post,
                routes::post::delete_post,
                // Applications
                routes::application::create_application,
                routes::application::get_my_applications,
                routes::application::get_post_applications,
                routes::application::update_application_status,
                routes::application::withdraw_application,
                // Reviews
                routes::review::create_review,
                routes::review::get_provider_reviews,
                routes::review::get_my_reviews,
                routes::review::delete_review,
                // Providers
                routes::provider::get_provider_profile,
            ],
        )
        .mount("/api/docs", make_swagger_ui(&swagger_config()))
        .register(
            "/",
            catchers![
                bad_request,
                unauthorized,
                forbidden,
                not_found,
                unprocessable,
                internal_error
            ],
        )
}

/* ----------------------------- LAUNCH ----------------------------- */

#[launch]
fn rocket() -> Rocket<Build> {
    dotenv().ok();
    env_logger::init();

    if Config::is_development() {
        info!("Running with the development profile");
    }

    info!("Gigboard API running");
    info!("Swagger UI at /api/docs");

    mount_api(rocket::build().attach(db::init()))
}
