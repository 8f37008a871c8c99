use serde::{Deserialize, Serialize};

/// How the API token is presented to the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthScheme {
    /// `Authorization: Bearer <token>`
    #[default]
    Bearer,
    /// HTTP Basic with the fixed user name `API_KEY` and the token as password.
    Basic,
}

impl AuthScheme {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "bearer" => Some(Self::Bearer),
            "basic" => Some(Self::Basic),
            _ => None,
        }
    }
}

/// Immutable account credentials, injected into every outbound request.
#[derive(Clone)]
pub struct Credentials {
    token: String,
    athlete_id: Option<String>,
    scheme: AuthScheme,
}

impl Credentials {
    pub fn new(token: impl Into<String>, athlete_id: Option<String>, scheme: AuthScheme) -> Self {
        Self {
            token: token.into(),
            athlete_id,
            scheme,
        }
    }

    pub fn athlete_id(&self) -> Option<&str> {
        self.athlete_id.as_deref()
    }

    pub fn scheme(&self) -> AuthScheme {
        self.scheme
    }

    pub(crate) fn apply(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match self.scheme {
            AuthScheme::Bearer => req.bearer_auth(&self.token),
            AuthScheme::Basic => req.basic_auth("API_KEY", Some(&self.token)),
        }
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("token", &"<redacted>")
            .field("athlete_id", &self.athlete_id)
            .field("scheme", &self.scheme)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_scheme() {
        assert_eq!(AuthScheme::parse("Bearer"), Some(AuthScheme::Bearer));
        assert_eq!(AuthScheme::parse(" basic "), Some(AuthScheme::Basic));
        assert_eq!(AuthScheme::parse("digest"), None);
    }

    #[test]
    fn debug_hides_token() {
        let c = Credentials::new("tok-123", Some("i9".into()), AuthScheme::Bearer);
        let s = format!("{:?}", c);
        assert!(!s.contains("tok-123"));
        assert!(s.contains("i9"));
    }
}
