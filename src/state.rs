//! Shared application state and the request extractors built on it.

use std::sync::Arc;

use anyhow::{anyhow, Context};
use axum::{
    extract::{FromRequestParts, Query},
    http::{header, request::Parts},
};
use libris_authz::{AuthzError, Principal, Role, TokenAuthority};
use libris_cache::{CacheConfig, ResultCache};
use libris_db::Database;
use libris_http::{
    pagination::{PageQuery, PageRequest, PaginationPolicy},
    versioning::{resolve_version, ApiVersion},
    AppError,
};
use libris_kernel::settings::Settings;
use serde_json::{Map, Value};

use crate::serialization::Entity;

/// Cache tags, one per resource kind.
pub mod tags {
    pub const BOOKS: &str = "bookCache";
    pub const AUTHORS: &str = "authorCache";
}

/// One cached list page: group-projected items plus the unpaged row count.
///
/// Items are stored before version gating and link generation, so the same
/// entry serves every caller.
#[derive(Debug, Clone, PartialEq)]
pub struct ListPage {
    pub items: Vec<Map<String, Value>>,
    pub total: u64,
}

pub type ListCache = ResultCache<Arc<ListPage>>;

#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub cache: Arc<ListCache>,
    pub authority: Arc<TokenAuthority>,
    pub pagination: PaginationPolicy,
    pub default_version: ApiVersion,
    default_version_token: Arc<str>,
    public_url: Option<Arc<str>>,
}

impl AppState {
    /// Build the state from settings, validating roles and the default version.
    pub fn from_settings(settings: &Settings, db: Database) -> anyhow::Result<Self> {
        let default_version: ApiVersion = settings
            .api
            .default_version
            .parse()
            .with_context(|| "invalid api.default_version")?;

        let mut authority = TokenAuthority::new();
        for grant in &settings.auth.tokens {
            let roles = grant
                .roles
                .iter()
                .map(|role| role.parse::<Role>())
                .collect::<Result<Vec<_>, _>>()
                .map_err(|err| anyhow!("token for '{}': {err}", grant.subject))?;
            authority = authority.grant(grant.token.clone(), Principal::new(&grant.subject, roles));
        }
        if authority.is_empty() {
            tracing::warn!("no bearer tokens configured, write endpoints are unreachable");
        }

        let cache = ResultCache::new(CacheConfig::from_secs(
            settings.cache.ttl_secs,
            settings.cache.max_entries,
        ));

        Ok(Self {
            db,
            cache: Arc::new(cache),
            authority: Arc::new(authority),
            pagination: PaginationPolicy::new(
                settings.pagination.default_limit,
                settings.pagination.max_limit,
            ),
            default_version,
            default_version_token: Arc::from(settings.api.default_version.as_str()),
            public_url: settings
                .server
                .public_url
                .as_deref()
                .map(|url| Arc::from(url.trim_end_matches('/'))),
        })
    }

    /// Value for the `Location` header of a newly created resource.
    pub fn location(&self, entity: Entity, id: i64) -> String {
        let path = format!("{}/{}", entity.base_path(), id);
        match &self.public_url {
            Some(origin) => format!("{origin}{path}"),
            None => path,
        }
    }
}

/// Map authorization failures onto HTTP errors.
pub fn authz_error(err: AuthzError) -> AppError {
    match err {
        AuthzError::InvalidToken => AppError::unauthorized(err.to_string()),
        AuthzError::Forbidden(message) => AppError::forbidden(message),
        AuthzError::UnknownRole(_) => AppError::Internal(anyhow!(err)),
    }
}

/// The authenticated caller. Requests without `Authorization` are anonymous.
#[derive(Debug, Clone)]
pub struct Caller(pub Principal);

impl Caller {
    pub fn require_admin(&self, message: &str) -> Result<(), AppError> {
        self.0.require(Role::Admin, message).map_err(authz_error)
    }
}

impl FromRequestParts<AppState> for Caller {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let authorization = match parts.headers.get(header::AUTHORIZATION) {
            Some(value) => Some(
                value
                    .to_str()
                    .map_err(|_| AppError::unauthorized("malformed Authorization header"))?,
            ),
            None => None,
        };

        state
            .authority
            .authenticate(authorization)
            .map(Caller)
            .map_err(authz_error)
    }
}

/// Representation version requested through `Accept: ...;version=X`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestedVersion(pub ApiVersion);

impl FromRequestParts<AppState> for RequestedVersion {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let accept = parts
            .headers
            .get(header::ACCEPT)
            .and_then(|value| value.to_str().ok());
        let token = resolve_version(accept, &state.default_version_token);
        Ok(RequestedVersion(ApiVersion::parse_or(
            &token,
            state.default_version,
        )))
    }
}

/// Validated `?page=&limit=` selection.
#[derive(Debug, Clone, Copy)]
pub struct Page(pub PageRequest);

impl FromRequestParts<AppState> for Page {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let Query(query) = Query::<PageQuery>::from_request_parts(parts, state).await?;
        state.pagination.resolve(query).map(Page)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use libris_kernel::settings::TokenSettings;

    async fn state(settings: &Settings) -> anyhow::Result<AppState> {
        let db = Database::connect_in_memory().await?;
        AppState::from_settings(settings, db)
    }

    #[tokio::test]
    async fn location_is_relative_without_public_url() {
        let state = state(&Settings::default()).await.unwrap();
        assert_eq!(state.location(Entity::Book, 12), "/api/books/12");
    }

    #[tokio::test]
    async fn location_uses_public_url() {
        let mut settings = Settings::default();
        settings.server.public_url = Some("https://books.example.org/".to_string());
        let state = state(&settings).await.unwrap();
        assert_eq!(
            state.location(Entity::Author, 3),
            "https://books.example.org/api/authors/3"
        );
    }

    #[tokio::test]
    async fn unknown_roles_fail_startup() {
        let mut settings = Settings::default();
        settings.auth.tokens.push(TokenSettings {
            token: "t".to_string(),
            subject: "editor@bookapi.com".to_string(),
            roles: vec!["ROLE_EDITOR".to_string()],
        });
        assert!(state(&settings).await.is_err());
    }

    #[tokio::test]
    async fn invalid_default_version_fails_startup() {
        let mut settings = Settings::default();
        settings.api.default_version = "latest".to_string();
        assert!(state(&settings).await.is_err());
    }

    #[test]
    fn authz_errors_map_to_statuses() {
        use axum::http::StatusCode;
        assert_eq!(
            authz_error(AuthzError::InvalidToken).status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            authz_error(AuthzError::Forbidden("no".into())).status(),
            StatusCode::FORBIDDEN
        );
    }
}
