//! Token verification port. The identity provider issuing session
//! tokens is external; the server only needs a way to turn a token
//! into a user UUID.

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum AuthError {
    #[error("invalid session token")]
    InvalidToken,
    #[error("token verifier unavailable: {0}")]
    Unavailable(String),
}

#[derive(Debug, Clone, Copy)]
pub struct VerifiedIdentity {
    pub user_id: Uuid,
}

#[async_trait]
pub trait TokenVerifier: Send + Sync {
    async fn verify(&self, token: &str) -> Result<VerifiedIdentity, AuthError>;
}

/// Development verifier: the token *is* the user UUID. Production
/// deployments plug a real issuer-backed implementation in.
pub struct LocalTokenVerifier;

#[async_trait]
impl TokenVerifier for LocalTokenVerifier {
    async fn verify(&self, token: &str) -> Result<VerifiedIdentity, AuthError> {
        let user_id = Uuid::parse_str(token.trim()).map_err(|_| AuthError::InvalidToken)?;
        Ok(VerifiedIdentity { user_id })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn local_verifier_accepts_uuid_tokens() {
        let verifier = LocalTokenVerifier;
        let id = Uuid::new_v4();
        let verified = verifier.verify(&id.to_string()).await.unwrap();
        assert_eq!(verified.user_id, id);
    }

    #[tokio::test]
    async fn local_verifier_rejects_garbage() {
        let verifier = LocalTokenVerifier;
        assert!(matches!(
            verifier.verify("not-a-token").await,
            Err(AuthError::InvalidToken)
        ));
    }
}
