//! Credential configuration.
//!
//! Credentials are immutable for the process lifetime and loaded once at
//! startup from the conventional OpenStack environment variables. One
//! credential set per process; multi-tenant credential management is out of
//! scope.

use costwatch_core::error::{EngineError, Result};
use url::Url;

/// Default currency label when `CLOUDKITTY_CURRENCY` is unset.
const DEFAULT_CURRENCY: &str = "USD";

/// Default Keystone domain name.
const DEFAULT_DOMAIN: &str = "Default";

/// Default endpoint interface class.
const DEFAULT_INTERFACE: &str = "public";

// ============================================================================
// Project Scope
// ============================================================================

/// How the authentication token is scoped to a project.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProjectScope {
    /// Scope by project id.
    Id(String),
    /// Scope by project name within a domain.
    Name {
        /// Project name.
        name: String,
        /// Project domain name.
        domain: String,
    },
}

impl ProjectScope {
    /// Builds the `scope.project` fragment of the token-issuance payload.
    pub(crate) fn to_payload(&self) -> serde_json::Value {
        match self {
            Self::Id(id) => serde_json::json!({ "id": id }),
            Self::Name { name, domain } => serde_json::json!({
                "name": name,
                "domain": { "name": domain }
            }),
        }
    }
}

// ============================================================================
// Credentials
// ============================================================================

/// Process-wide upstream credentials and connection settings.
#[derive(Debug, Clone)]
pub struct Credentials {
    /// Identity service base URL (`OS_AUTH_URL`).
    pub auth_url: String,
    /// Fully resolved token-issuance URL, derived from `auth_url`.
    pub token_url: String,
    /// Identity user name.
    pub username: String,
    /// Identity password.
    pub password: String,
    /// Domain the user belongs to.
    pub user_domain: String,
    /// Project scope for the issued token.
    pub project_scope: ProjectScope,
    /// Optional region filter for catalog endpoint discovery.
    pub region: Option<String>,
    /// Endpoint interface class to select from the catalog.
    pub interface: String,
    /// Whether to verify upstream TLS certificates.
    pub verify_tls: bool,
    /// Pre-resolved billing endpoint; skips catalog discovery when set.
    pub billing_endpoint: Option<String>,
    /// Currency label passed through to reports.
    pub currency: String,
}

impl Credentials {
    /// Loads credentials from the environment.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Configuration`] when `OS_AUTH_URL`,
    /// `OS_USERNAME`, `OS_PASSWORD`, or the project scope
    /// (`OS_PROJECT_ID` or `OS_PROJECT_NAME`) is missing.
    pub fn from_env() -> Result<Self> {
        let require = |name: &str| -> Result<String> {
            std::env::var(name)
                .ok()
                .filter(|value| !value.is_empty())
                .ok_or_else(|| EngineError::Configuration(format!("{name} is required")))
        };
        let optional = |name: &str| std::env::var(name).ok().filter(|value| !value.is_empty());

        let auth_url = require("OS_AUTH_URL")?.trim_end_matches('/').to_string();
        let project_domain =
            optional("OS_PROJECT_DOMAIN_NAME").unwrap_or_else(|| DEFAULT_DOMAIN.to_string());
        let project_scope = if let Some(id) = optional("OS_PROJECT_ID") {
            ProjectScope::Id(id)
        } else if let Some(name) = optional("OS_PROJECT_NAME") {
            ProjectScope::Name {
                name,
                domain: project_domain,
            }
        } else {
            return Err(EngineError::Configuration(
                "Set OS_PROJECT_ID or OS_PROJECT_NAME".to_string(),
            ));
        };

        let verify_tls = optional("OS_VERIFY")
            .map(|value| !matches!(value.to_ascii_lowercase().as_str(), "0" | "false" | "no"))
            .unwrap_or(true);

        Ok(Self {
            token_url: build_tokens_url(&auth_url)?,
            auth_url,
            username: require("OS_USERNAME")?,
            password: require("OS_PASSWORD")?,
            user_domain: optional("OS_USER_DOMAIN_NAME")
                .unwrap_or_else(|| DEFAULT_DOMAIN.to_string()),
            project_scope,
            region: optional("OS_REGION_NAME"),
            interface: optional("OS_INTERFACE").unwrap_or_else(|| DEFAULT_INTERFACE.to_string()),
            verify_tls,
            billing_endpoint: optional("CLOUDKITTY_ENDPOINT")
                .map(|url| url.trim_end_matches('/').to_string()),
            currency: optional("CLOUDKITTY_CURRENCY")
                .unwrap_or_else(|| DEFAULT_CURRENCY.to_string()),
        })
    }

    /// Returns the identity project-lookup URL for the given project id.
    pub(crate) fn project_url(&self, project_id: &str) -> Result<String> {
        let mut parsed = Url::parse(&self.token_url)
            .map_err(|e| EngineError::Configuration(format!("invalid token URL: {e}")))?;
        let base = parsed
            .path()
            .trim_end_matches("/auth/tokens")
            .trim_end_matches('/')
            .to_string();
        parsed.set_path(&base);
        parsed
            .path_segments_mut()
            .map_err(|()| EngineError::Configuration("token URL cannot be a base".to_string()))?
            .push("projects")
            .push(project_id);
        Ok(parsed.to_string())
    }
}

/// Normalizes an identity base URL into its token-issuance URL.
///
/// Appends `/v3/auth/tokens` unless the path already names the tokens
/// resource or a versioned root.
fn build_tokens_url(auth_url: &str) -> Result<String> {
    let mut parsed = Url::parse(auth_url)
        .map_err(|e| EngineError::Configuration(format!("invalid OS_AUTH_URL '{auth_url}': {e}")))?;
    let path = parsed.path().trim_end_matches('/').to_string();

    let tokens_path = if path.ends_with("/auth/tokens") {
        path
    } else if path.is_empty() {
        "/v3/auth/tokens".to_string()
    } else if path.ends_with("/v3") {
        format!("{path}/auth/tokens")
    } else {
        format!("{path}/v3/auth/tokens")
    };

    parsed.set_path(&tokens_path);
    Ok(parsed.to_string())
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn credentials(auth_url: &str) -> Credentials {
        Credentials {
            auth_url: auth_url.to_string(),
            token_url: build_tokens_url(auth_url).unwrap(),
            username: "user".to_string(),
            password: "secret".to_string(),
            user_domain: DEFAULT_DOMAIN.to_string(),
            project_scope: ProjectScope::Id("proj".to_string()),
            region: None,
            interface: DEFAULT_INTERFACE.to_string(),
            verify_tls: true,
            billing_endpoint: None,
            currency: DEFAULT_CURRENCY.to_string(),
        }
    }

    #[test]
    fn test_tokens_url_from_bare_host() {
        assert_eq!(
            build_tokens_url("https://keystone.example").unwrap(),
            "https://keystone.example/v3/auth/tokens"
        );
    }

    #[test]
    fn test_tokens_url_from_versioned_root() {
        assert_eq!(
            build_tokens_url("https://keystone.example/v3").unwrap(),
            "https://keystone.example/v3/auth/tokens"
        );
    }

    #[test]
    fn test_tokens_url_from_prefixed_path() {
        assert_eq!(
            build_tokens_url("https://cloud.example/identity").unwrap(),
            "https://cloud.example/identity/v3/auth/tokens"
        );
    }

    #[test]
    fn test_tokens_url_already_complete() {
        assert_eq!(
            build_tokens_url("https://keystone.example/v3/auth/tokens").unwrap(),
            "https://keystone.example/v3/auth/tokens"
        );
    }

    #[test]
    fn test_project_url_strips_tokens_suffix() {
        let creds = credentials("https://keystone.example/v3");
        assert_eq!(
            creds.project_url("abc123").unwrap(),
            "https://keystone.example/v3/projects/abc123"
        );
    }

    #[test]
    fn test_project_url_escapes_project_id() {
        let creds = credentials("https://keystone.example/v3");
        assert_eq!(
            creds.project_url("a/b c").unwrap(),
            "https://keystone.example/v3/projects/a%2Fb%20c"
        );
    }

    #[test]
    fn test_scope_payload_by_name() {
        let scope = ProjectScope::Name {
            name: "demo".to_string(),
            domain: "Default".to_string(),
        };
        assert_eq!(
            scope.to_payload(),
            serde_json::json!({"name": "demo", "domain": {"name": "Default"}})
        );
    }
}
