use jsonwebtoken::{encode, decode, Header, Validation, EncodingKey, DecodingKey};
use serde::{Deserialize, Serialize};
use mongodb::bson::oid::ObjectId;

use crate::models::{Identity, Role};

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,  // User ID
    pub role: Role,
    pub exp: i64,
    pub iat: i64,
}

/// Issues and verifies the bearer tokens that carry a caller's identity.
pub struct JwtService;

impl JwtService {
    pub fn generate_access_token(user_id: &ObjectId, role: Role) -> Result<String, jsonwebtoken::errors::Error> {
        let expiry = crate::config::Config::jwt_expiry();
        let now = chrono::Utc::now().timestamp();

        let claims = Claims {
            sub: user_id.to_hex(),
            role,
            exp: now + expiry,
            iat: now,
        };

        let secret = crate::config::Config::jwt_secret();
        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
    }

    pub fn verify_token(token: &str) -> Result<Claims, jsonwebtoken::errors::Error> {
        let secret = crate::config::Config::jwt_secret();

        let token_data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(secret.as_bytes()),
            &Validation::default(),
        )?;

        Ok(token_data.claims)
    }

    /// Resolves a bearer token to the identity it was issued for.
    pub fn identity(token: &str) -> Option<Identity> {
        let claims = Self::verify_token(token).ok()?;
        let user_id = ObjectId::parse_str(&claims.sub).ok()?;
        Some(Identity::new(user_id, claims.role))
    }
}
