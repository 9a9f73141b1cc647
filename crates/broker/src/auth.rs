//! 连接令牌的签发与校验。
//!
//! 令牌为紧凑的 URL-safe 字符串：`stk1.<payload_b64>.<sig_b64>`，
//! 其中 payload 携带过期时间，签名使用 HMAC-SHA256。

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use hmac::{Hmac, Mac as _};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use uuid::Uuid;

use crate::error::{BrokerError, Result};

type HmacSha256 = Hmac<Sha256>;

const TOKEN_VERSION: &str = "stk1";

/// 令牌载荷。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenClaims {
    /// 随机令牌标识，防止同一秒签发的令牌完全相同。
    pub jti: String,
    /// 过期时间（Unix 秒）。
    pub exp_unix_secs: u64,
}

/// 基于 HMAC-SHA256 的令牌签发器。
#[derive(Clone)]
pub struct TokenSigner {
    secret: Vec<u8>,
    ttl: Duration,
}

impl TokenSigner {
    pub fn new(secret: Vec<u8>, ttl: Duration) -> Self {
        Self { secret, ttl }
    }

    /// 签发一枚新令牌。
    pub fn issue(&self) -> Result<String> {
        let claims = TokenClaims {
            jti: Uuid::new_v4().to_string(),
            exp_unix_secs: now_unix_secs()?.saturating_add(self.ttl.as_secs()),
        };

        let payload_json = serde_json::to_vec(&claims)?;
        let payload_b64 = URL_SAFE_NO_PAD.encode(payload_json);

        let mut mac = HmacSha256::new_from_slice(&self.secret)
            .map_err(|_| BrokerError::Auth("invalid HMAC key".to_string()))?;
        mac.update(payload_b64.as_bytes());
        let sig_b64 = URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes());

        Ok(format!("{TOKEN_VERSION}.{payload_b64}.{sig_b64}"))
    }

    /// 校验令牌格式、签名与过期时间。
    pub fn verify(&self, token: &str) -> Result<TokenClaims> {
        self.verify_at(token, now_unix_secs()?)
    }

    fn verify_at(&self, token: &str, now_unix_secs: u64) -> Result<TokenClaims> {
        let (version, rest) = token
            .split_once('.')
            .ok_or_else(|| BrokerError::Auth("invalid token format".to_string()))?;
        if version != TOKEN_VERSION {
            return Err(BrokerError::Auth(format!(
                "unsupported token version: {version}"
            )));
        }
        let (payload_b64, sig_b64) = rest
            .split_once('.')
            .ok_or_else(|| BrokerError::Auth("invalid token format".to_string()))?;

        let got = URL_SAFE_NO_PAD
            .decode(sig_b64)
            .map_err(|_| BrokerError::Auth("invalid token signature encoding".to_string()))?;

        let mut mac = HmacSha256::new_from_slice(&self.secret)
            .map_err(|_| BrokerError::Auth("invalid HMAC key".to_string()))?;
        mac.update(payload_b64.as_bytes());
        mac.verify_slice(&got)
            .map_err(|_| BrokerError::Auth("invalid token signature".to_string()))?;

        let payload_json = URL_SAFE_NO_PAD
            .decode(payload_b64)
            .map_err(|_| BrokerError::Auth("invalid token payload encoding".to_string()))?;
        let claims: TokenClaims = serde_json::from_slice(&payload_json)
            .map_err(|_| BrokerError::Auth("invalid token payload".to_string()))?;

        if claims.exp_unix_secs <= now_unix_secs {
            return Err(BrokerError::Auth("token expired".to_string()));
        }
        Ok(claims)
    }
}

fn now_unix_secs() -> Result<u64> {
    Ok(SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|_| BrokerError::Auth("system clock is before UNIX_EPOCH".to_string()))?
        .as_secs())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signer() -> TokenSigner {
        TokenSigner::new(b"unit-test-secret".to_vec(), Duration::from_secs(60))
    }

    #[test]
    fn test_issue_and_verify() {
        let signer = signer();
        let token = signer.issue().expect("token should be issued");
        assert!(token.starts_with("stk1."));

        let claims = signer.verify(&token).expect("token should verify");
        assert!(!claims.jti.is_empty());
    }

    #[test]
    fn test_expired_token_is_rejected() {
        let signer = signer();
        let token = signer.issue().expect("token should be issued");

        let far_future = u64::MAX;
        let err = signer
            .verify_at(&token, far_future)
            .expect_err("expired token should fail");
        assert!(matches!(err, BrokerError::Auth(msg) if msg == "token expired"));
    }

    #[test]
    fn test_tampered_token_is_rejected() {
        let signer = signer();
        let token = signer.issue().expect("token should be issued");
        let mut tampered = token.clone();
        tampered.pop();
        tampered.push('A');

        assert!(matches!(
            signer.verify(&tampered),
            Err(BrokerError::Auth(_))
        ));
    }

    #[test]
    fn test_wrong_secret_is_rejected() {
        let token = signer().issue().expect("token should be issued");
        let other = TokenSigner::new(b"another-secret".to_vec(), Duration::from_secs(60));

        assert!(matches!(other.verify(&token), Err(BrokerError::Auth(_))));
    }

    #[test]
    fn test_garbage_token_is_rejected() {
        assert!(matches!(
            signer().verify("not-a-token"),
            Err(BrokerError::Auth(_))
        ));
    }
}
