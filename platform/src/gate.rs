use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

use crate::discovery::Endpoint;
use crate::error::Error;

/// `spec.md` §6d: `POST /register` carries a login platform and credential.
/// The original source's registration handler panics on any branch other
/// than WeChat (`SPEC_FULL.md` §6d, Open Question 4) — `Other` is kept as a
/// reserved variant so the type is honest about what the source could
/// reach, not so this workspace resolves it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "platform", content = "credential")]
#[non_exhaustive]
pub enum LoginPlatform {
    WeChat(String),
    Other(String),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterRequest {
    pub login: LoginPlatform,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterResponse {
    pub token: String,
    pub server_info: Endpoint,
}

/// JWT claims carrying `uid` and expiry, per `spec.md` §6.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub uid: String,
    pub exp: u64,
}

pub fn sign(uid: &str, expiry_unix_secs: u64, secret: &str) -> Result<String, Error> {
    let claims = Claims { uid: uid.to_string(), exp: expiry_unix_secs };
    encode(&Header::default(), &claims, &EncodingKey::from_secret(secret.as_bytes()))
        .map_err(|e| Error::Persistence(e.to_string()))
}

pub fn verify(token: &str, secret: &str) -> Result<Claims, Error> {
    let data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|e| Error::Persistence(e.to_string()))?;
    Ok(data.claims)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn jwt_round_trips() {
        let token = sign("10000", 9_999_999_999, "secret").unwrap();
        let claims = verify(&token, "secret").unwrap();
        assert_eq!(claims.uid, "10000");
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let token = sign("10000", 9_999_999_999, "secret").unwrap();
        assert!(verify(&token, "wrong").is_err());
    }

    #[test]
    fn only_wechat_login_is_modeled_as_reachable() {
        let req = RegisterRequest { login: LoginPlatform::WeChat("openid-1".into()) };
        let json = serde_json::to_string(&req).unwrap();
        let back: RegisterRequest = serde_json::from_str(&json).unwrap();
        assert_eq!(back.login, LoginPlatform::WeChat("openid-1".into()));
    }
}
