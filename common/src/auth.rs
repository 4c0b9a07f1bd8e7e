use chrono::Utc;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use mongodb::bson::oid::ObjectId;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::error::{self, AddCode};

pub static ENCODING_KEY: Lazy<EncodingKey> = Lazy::new(|| {
    let secret = std::env::var("JWT_SECRET").expect("JWT_SECRET must be set");
    EncodingKey::from_secret(secret.as_bytes())
});

pub static DECODING_KEY: Lazy<DecodingKey> = Lazy::new(|| {
    let secret = std::env::var("JWT_SECRET").expect("JWT_SECRET must be set");
    DecodingKey::from_secret(secret.as_bytes())
});

const TOKEN_DURATION: i64 = 60 * 60 * 24 * 7;

#[derive(Debug, Clone, PartialEq)]
pub enum Auth {
    Service(String),
    Admin(ObjectId),
    User(ObjectId),
    None,
}

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    sub: String,
    role: String,
    exp: i64,
}

impl Auth {
    pub fn id(&self) -> Option<&ObjectId> {
        match self {
            Auth::Admin(id) => Some(id),
            Auth::User(id) => Some(id),
            _ => None,
        }
    }

    pub fn full_access(&self) -> bool {
        matches!(self, Auth::Admin(_) | Auth::Service(_))
    }

    pub fn from_token(token: &str) -> error::Result<Option<Auth>> {
        let claims = decode::<Claims>(token, &DECODING_KEY, &Validation::default())?.claims;

        if claims.exp < Utc::now().timestamp() {
            return Ok(None);
        }

        let auth = match claims.role.as_str() {
            "admin" => Auth::Admin(claims.sub.parse()?),
            "user" => Auth::User(claims.sub.parse()?),
            "service" => Auth::Service(claims.sub),
            role => return Err(anyhow::anyhow!("Unknown token role: {}", role).code(401)),
        };

        Ok(Some(auth))
    }

    pub fn to_token(&self) -> error::Result<String> {
        let (sub, role) = match self {
            Auth::Admin(id) => (id.to_hex(), "admin"),
            Auth::User(id) => (id.to_hex(), "user"),
            Auth::Service(name) => (name.clone(), "service"),
            Auth::None => return Err(anyhow::anyhow!("Cannot create token without auth").code(401)),
        };

        let claims = Claims {
            sub,
            role: role.to_string(),
            exp: Utc::now().timestamp() + TOKEN_DURATION,
        };

        Ok(encode(&Header::default(), &claims, &ENCODING_KEY)?)
    }
}
