use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};

use crate::errors::ServiceError;

/// Permission names used to gate route groups.
pub mod consts {
    pub const SALES_CREATE: &str = "sales:create";
    pub const SALES_READ: &str = "sales:read";
    pub const SALES_DELETE: &str = "sales:delete";
    pub const RETURNS_CREATE: &str = "returns:create";
    pub const CAMPAIGNS_READ: &str = "campaigns:read";
    pub const CAMPAIGNS_MANAGE: &str = "campaigns:manage";
}

/// Claim structure of capability tokens issued by the auth service.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub name: Option<String>,
    pub roles: Vec<String>,
    pub permissions: Vec<String>,
    pub jti: String,
    pub iat: i64,
    pub exp: i64,
    pub iss: String,
    pub aud: String,
}

/// The caller identity, decoded once at the boundary and passed through
/// request extensions; downstream code never re-parses headers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Principal {
    pub subject: String,
    pub name: Option<String>,
    pub roles: Vec<String>,
    pub permissions: Vec<String>,
    pub token_id: String,
}

impl Principal {
    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == role)
    }

    pub fn has_permission(&self, permission: &str) -> bool {
        self.permissions.iter().any(|p| p == permission)
    }

    pub fn is_admin(&self) -> bool {
        self.has_role("admin")
    }
}

impl From<Claims> for Principal {
    fn from(claims: Claims) -> Self {
        Self {
            subject: claims.sub,
            name: claims.name,
            roles: claims.roles,
            permissions: claims.permissions,
            token_id: claims.jti,
        }
    }
}

/// Verification-side auth configuration. Token issuance lives in the auth
/// service; this service only checks signatures and claims.
#[derive(Clone, Debug)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub jwt_issuer: String,
    pub jwt_audience: String,
}

#[derive(Clone)]
pub struct TokenVerifier {
    config: AuthConfig,
}

impl TokenVerifier {
    pub fn new(config: AuthConfig) -> Self {
        Self { config }
    }

    /// Validates signature, expiry, issuer and audience in one pass.
    pub fn verify(&self, token: &str) -> Result<Claims, ServiceError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[&self.config.jwt_issuer]);
        validation.set_audience(&[&self.config.jwt_audience]);

        let data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.config.jwt_secret.as_bytes()),
            &validation,
        )
        .map_err(|e| ServiceError::Unauthorized(format!("invalid token: {}", e)))?;

        Ok(data.claims)
    }
}

/// Authentication middleware: extracts the bearer token, verifies it, and
/// attaches the resulting [`Principal`] to the request.
pub async fn auth_middleware(
    State(verifier): State<Arc<TokenVerifier>>,
    mut request: Request,
    next: Next,
) -> Result<Response, ServiceError> {
    let token = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .ok_or_else(|| ServiceError::Unauthorized("missing bearer token".into()))?;

    let claims = verifier.verify(token)?;
    request.extensions_mut().insert(Principal::from(claims));

    Ok(next.run(request).await)
}

/// Permission middleware: requires the authenticated principal to carry the
/// given permission. Admins pass unconditionally.
pub async fn permission_middleware(
    State(required_permission): State<String>,
    request: Request,
    next: Next,
) -> Result<Response, ServiceError> {
    let principal = request
        .extensions()
        .get::<Principal>()
        .cloned()
        .ok_or_else(|| ServiceError::Unauthorized("authentication required".into()))?;

    if !principal.is_admin() && !principal.has_permission(&required_permission) {
        return Err(ServiceError::Forbidden(format!(
            "missing permission {}",
            required_permission
        )));
    }

    Ok(next.run(request).await)
}

/// Router extension for permission-gated route groups.
pub trait AuthRouterExt {
    fn with_permission(self, permission: &str) -> Self;
}

impl<S> AuthRouterExt for axum::Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    fn with_permission(self, permission: &str) -> Self {
        self.layer(axum::middleware::from_fn_with_state(
            permission.to_string(),
            permission_middleware,
        ))
    }
}
