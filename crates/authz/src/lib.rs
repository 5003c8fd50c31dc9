//! Roles, principals, and the bearer token authority guarding write endpoints.

use std::fmt;
use std::str::FromStr;

use subtle::ConstantTimeEq;
use thiserror::Error;

/// Role granted to a principal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    User,
    Admin,
}

impl FromStr for Role {
    type Err = AuthzError;

    /// Accepts `admin`, `ROLE_ADMIN`, `user`, `ROLE_USER` in any case.
    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_ascii_lowercase();
        match normalized.strip_prefix("role_").unwrap_or(normalized.as_str()) {
            "user" => Ok(Role::User),
            "admin" => Ok(Role::Admin),
            _ => Err(AuthzError::UnknownRole(value.to_string())),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::User => f.write_str("user"),
            Role::Admin => f.write_str("admin"),
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AuthzError {
    #[error("invalid or unknown bearer token")]
    InvalidToken,

    #[error("{0}")]
    Forbidden(String),

    #[error("unknown role '{0}'")]
    UnknownRole(String),
}

/// The caller a request acts on behalf of.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    subject: Option<String>,
    roles: Vec<Role>,
}

impl Principal {
    pub fn anonymous() -> Self {
        Self {
            subject: None,
            roles: Vec::new(),
        }
    }

    pub fn new(subject: impl Into<String>, roles: Vec<Role>) -> Self {
        Self {
            subject: Some(subject.into()),
            roles,
        }
    }

    pub fn subject(&self) -> Option<&str> {
        self.subject.as_deref()
    }

    /// Admins implicitly hold every lower role.
    pub fn is_granted(&self, role: Role) -> bool {
        self.roles
            .iter()
            .any(|held| *held == role || *held == Role::Admin)
    }

    /// Fail with [`AuthzError::Forbidden`] carrying `message` unless `role` is held.
    pub fn require(&self, role: Role, message: &str) -> Result<(), AuthzError> {
        if self.is_granted(role) {
            return Ok(());
        }
        tracing::info!(
            subject = self.subject().unwrap_or("anonymous"),
            required = %role,
            "access denied"
        );
        Err(AuthzError::Forbidden(message.to_string()))
    }
}

struct TokenGrant {
    token: Vec<u8>,
    principal: Principal,
}

/// Maps bearer tokens to principals.
#[derive(Default)]
pub struct TokenAuthority {
    grants: Vec<TokenGrant>,
}

impl TokenAuthority {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn grant(mut self, token: impl Into<String>, principal: Principal) -> Self {
        self.grants.push(TokenGrant {
            token: token.into().into_bytes(),
            principal,
        });
        self
    }

    pub fn is_empty(&self) -> bool {
        self.grants.is_empty()
    }

    /// Resolve the `Authorization` header value.
    ///
    /// No header means an anonymous caller. A header that is present but is not
    /// a known bearer token is rejected rather than downgraded to anonymous.
    pub fn authenticate(&self, authorization: Option<&str>) -> Result<Principal, AuthzError> {
        let Some(header) = authorization else {
            return Ok(Principal::anonymous());
        };

        let token = header
            .strip_prefix("Bearer ")
            .or_else(|| header.strip_prefix("bearer "))
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .ok_or(AuthzError::InvalidToken)?;

        // Compare against every grant so timing does not reveal which one matched.
        let mut found = None;
        for grant in &self.grants {
            if bool::from(grant.token.as_slice().ct_eq(token.as_bytes())) {
                found = Some(&grant.principal);
            }
        }

        found.cloned().ok_or(AuthzError::InvalidToken)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn authority() -> TokenAuthority {
        TokenAuthority::new()
            .grant(
                "admin-token",
                Principal::new("admin@bookapi.com", vec![Role::Admin]),
            )
            .grant(
                "user-token",
                Principal::new("user@bookapi.com", vec![Role::User]),
            )
    }

    #[test]
    fn missing_header_is_anonymous() {
        let principal = authority().authenticate(None).unwrap();
        assert_eq!(principal, Principal::anonymous());
        assert_eq!(principal.subject(), None);
        assert!(!principal.is_granted(Role::User));
    }

    #[test]
    fn bearer_token_resolves_principal() {
        let principal = authority()
            .authenticate(Some("Bearer admin-token"))
            .unwrap();
        assert_eq!(principal.subject(), Some("admin@bookapi.com"));
        assert!(principal.is_granted(Role::Admin));
        assert!(principal.is_granted(Role::User));
    }

    #[test]
    fn unknown_or_malformed_tokens_are_rejected() {
        let authority = authority();
        assert_eq!(
            authority.authenticate(Some("Bearer nope")),
            Err(AuthzError::InvalidToken)
        );
        assert_eq!(
            authority.authenticate(Some("Basic YWRtaW46cGFzcw==")),
            Err(AuthzError::InvalidToken)
        );
        assert_eq!(
            authority.authenticate(Some("Bearer ")),
            Err(AuthzError::InvalidToken)
        );
    }

    #[test]
    fn user_role_cannot_write() {
        let principal = authority().authenticate(Some("Bearer user-token")).unwrap();
        assert!(!principal.is_granted(Role::Admin));
        assert_eq!(
            principal.require(Role::Admin, "admins only"),
            Err(AuthzError::Forbidden("admins only".to_string()))
        );
    }

    #[test]
    fn roles_parse_with_or_without_prefix() {
        assert_eq!("ROLE_ADMIN".parse::<Role>(), Ok(Role::Admin));
        assert_eq!("admin".parse::<Role>(), Ok(Role::Admin));
        assert_eq!(" User ".parse::<Role>(), Ok(Role::User));
        assert!("ROLE_EDITOR".parse::<Role>().is_err());
    }
}
