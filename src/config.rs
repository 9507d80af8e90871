use std::time::Duration;

const DEFAULT_BASE: &str = "http://localhost:8000";
const DEFAULT_ADDR: &str = "127.0.0.1:3000";
const DEFAULT_EXPENSE_LIMIT: u32 = 20;
const MAX_EXPENSE_LIMIT: u32 = 500;
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Process-wide configuration, read once at start and handed to every component.
#[derive(Clone, PartialEq)]
pub struct DashboardConfig {
    /// Base URL of the reporting API used for unauthenticated reads.
    pub api_base: String,

    /// Base URL the proxy endpoints forward to.
    pub backend_base: String,

    /// Privileged credential attached by the proxies. `None` means unconfigured.
    pub admin_token: Option<String>,

    /// Attach the credential on `/api/upload` as well.
    pub upload_requires_token: bool,

    /// Address the dashboard server binds to.
    pub bind_addr: String,

    /// Row limit requested for the recent-expenses list.
    pub expense_limit: u32,

    /// Timeout applied to every outbound call.
    pub request_timeout: Duration,
}

// The token must never end up in logs.
impl std::fmt::Debug for DashboardConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DashboardConfig")
            .field("api_base", &self.api_base)
            .field("backend_base", &self.backend_base)
            .field("admin_token", &self.admin_token.as_ref().map(|_| "<redacted>"))
            .field("upload_requires_token", &self.upload_requires_token)
            .field("bind_addr", &self.bind_addr)
            .field("expense_limit", &self.expense_limit)
            .field("request_timeout", &self.request_timeout)
            .finish()
    }
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_BASE.to_string(),
            backend_base: DEFAULT_BASE.to_string(),
            admin_token: None,
            upload_requires_token: false,
            bind_addr: DEFAULT_ADDR.to_string(),
            expense_limit: DEFAULT_EXPENSE_LIMIT,
            request_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

impl DashboardConfig {
    /// Build the configuration from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from an arbitrary key lookup.
    ///
    /// Empty values are treated the same as missing ones.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let backend_base = get("API_BASE").unwrap_or_else(|| DEFAULT_BASE.to_string());
        let api_base = get("NEXT_PUBLIC_API_BASE").unwrap_or_else(|| backend_base.clone());

        let expense_limit = get("EXPENSE_LIMIT")
            .and_then(|v| v.parse::<u32>().ok())
            .unwrap_or(DEFAULT_EXPENSE_LIMIT)
            .clamp(1, MAX_EXPENSE_LIMIT);

        let timeout_secs = get("REQUEST_TIMEOUT_SECS")
            .and_then(|v| v.parse::<u64>().ok())
            .filter(|secs| *secs > 0)
            .unwrap_or(DEFAULT_TIMEOUT_SECS);

        Self {
            api_base: trim_base(&api_base),
            backend_base: trim_base(&backend_base),
            admin_token: get("ADMIN_TOKEN"),
            upload_requires_token: get("UPLOAD_WITH_TOKEN")
                .map(|v| parse_flag(&v))
                .unwrap_or(false),
            bind_addr: get("DASHBOARD_ADDR").unwrap_or_else(|| DEFAULT_ADDR.to_string()),
            expense_limit,
            request_timeout: Duration::from_secs(timeout_secs),
        }
    }

    pub fn has_admin_token(&self) -> bool {
        self.admin_token.is_some()
    }
}

fn trim_base(base: &str) -> String {
    base.trim_end_matches('/').to_string()
}

fn parse_flag(value: &str) -> bool {
    matches!(
        value.to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> DashboardConfig {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        DashboardConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_when_nothing_is_set() {
        let config = config_from(&[]);
        assert_eq!(config, DashboardConfig::default());
        assert!(!config.has_admin_token());
    }

    #[test]
    fn empty_token_counts_as_missing() {
        let config = config_from(&[("ADMIN_TOKEN", "   ")]);
        assert_eq!(config.admin_token, None);
    }

    #[test]
    fn read_base_falls_back_to_backend_base() {
        let config = config_from(&[("API_BASE", "http://backend:9000/")]);
        assert_eq!(config.backend_base, "http://backend:9000");
        assert_eq!(config.api_base, "http://backend:9000");

        let config = config_from(&[
            ("API_BASE", "http://backend:9000"),
            ("NEXT_PUBLIC_API_BASE", "https://reports.example.com"),
        ]);
        assert_eq!(config.api_base, "https://reports.example.com");
    }

    #[test]
    fn expense_limit_is_clamped() {
        assert_eq!(config_from(&[("EXPENSE_LIMIT", "0")]).expense_limit, 1);
        assert_eq!(config_from(&[("EXPENSE_LIMIT", "9000")]).expense_limit, 500);
        assert_eq!(config_from(&[("EXPENSE_LIMIT", "abc")]).expense_limit, 20);
    }

    #[test]
    fn upload_flag_accepts_common_spellings() {
        assert!(config_from(&[("UPLOAD_WITH_TOKEN", "true")]).upload_requires_token);
        assert!(config_from(&[("UPLOAD_WITH_TOKEN", "1")]).upload_requires_token);
        assert!(!config_from(&[("UPLOAD_WITH_TOKEN", "no")]).upload_requires_token);
    }

    #[test]
    fn debug_output_redacts_token() {
        let config = config_from(&[("ADMIN_TOKEN", "s3cret")]);
        let rendered = format!("{:?}", config);
        assert!(!rendered.contains("s3cret"));
        assert!(rendered.contains("<redacted>"));
    }
}
