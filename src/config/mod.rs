use rocket::figment::{Figment, providers::{Env, Format, Toml}};
use rocket::Config as RocketConfig;
use std::env;

pub struct Config;

impl Config {
    fn profile() -> String {
        env::var("ROCKET_PROFILE").unwrap_or_else(|_| "development".to_string())
    }

    fn figment() -> Figment {
        Figment::from(RocketConfig::default())
            .merge(Toml::file("Rocket.toml").nested())
            .select(Self::profile())
            // Keys keep their underscores: ROCKET_JWT_SECRET -> jwt_secret.
            .merge(Env::prefixed("ROCKET_").ignore(&["PROFILE"]))
    }

    pub fn jwt_secret() -> String {
        Self::figment()
            .extract_inner("jwt_secret")
            .unwrap_or_else(|_| "default-secret".to_string())
    }

    pub fn jwt_expiry() -> i64 {
        Self::figment()
            .extract_inner("jwt_expiry")
            .unwrap_or(900)
    }

    pub fn mongodb_uri() -> String {
        Self::figment()
            .extract_inner("mongodb_uri")
            .unwrap_or_else(|_| "mongodb://localhost:27017".to_string())
    }

    pub fn database_name() -> String {
        Self::figment()
            .extract_inner("database_name")
            .unwrap_or_else(|_| "gigboard".to_string())
    }

    pub fn is_development() -> bool {
        Self::profile() == "development"
    }
}
