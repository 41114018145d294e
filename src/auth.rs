use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use serde::{Deserialize, Serialize};

use crate::error::AppError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Teacher,
    Student,
}

impl Role {
    fn parse(raw: &str) -> Option<Role> {
        match raw {
            "admin" => Some(Role::Admin),
            "teacher" => Some(Role::Teacher),
            "student" => Some(Role::Student),
            _ => None,
        }
    }
}

/// The single place request credentials are read.
///
/// Handlers take this by value; token verification itself is delegated to
/// the identity provider, so the token stays opaque here.
#[derive(Clone, Debug)]
pub struct AuthSession {
    pub token: String,
    pub role: Option<Role>,
}

impl<S> FromRequestParts<S> for AuthSession
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .ok_or(AppError::Unauthorized)?;

        let token = header
            .strip_prefix("Bearer ")
            .filter(|t| !t.is_empty())
            .ok_or(AppError::Unauthorized)?;

        let role = parts
            .headers
            .get("x-role")
            .and_then(|v| v.to_str().ok())
            .and_then(Role::parse);

        Ok(AuthSession {
            token: token.to_string(),
            role,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::extract::FromRequestParts;
    use axum::http::Request;

    async fn extract(req: Request<()>) -> Result<AuthSession, AppError> {
        let (mut parts, _) = req.into_parts();
        AuthSession::from_request_parts(&mut parts, &()).await
    }

    #[tokio::test]
    async fn missing_header_is_rejected() {
        let req = Request::builder().uri("/subjects").body(()).unwrap();
        assert!(matches!(extract(req).await, Err(AppError::Unauthorized)));
    }

    #[tokio::test]
    async fn malformed_header_is_rejected() {
        let req = Request::builder()
            .uri("/subjects")
            .header("authorization", "Token abc")
            .body(())
            .unwrap();
        assert!(matches!(extract(req).await, Err(AppError::Unauthorized)));
    }

    #[tokio::test]
    async fn bearer_token_and_role_are_extracted() {
        let req = Request::builder()
            .uri("/subjects")
            .header("authorization", "Bearer tok-123")
            .header("x-role", "teacher")
            .body(())
            .unwrap();

        let session = extract(req).await.expect("session");
        assert_eq!(session.token, "tok-123");
        assert_eq!(session.role, Some(Role::Teacher));
    }

    #[tokio::test]
    async fn unknown_role_is_ignored() {
        let req = Request::builder()
            .uri("/subjects")
            .header("authorization", "Bearer tok-123")
            .header("x-role", "superuser")
            .body(())
            .unwrap();

        let session = extract(req).await.expect("session");
        assert_eq!(session.role, None);
    }
}
