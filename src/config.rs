// src/config.rs
//! Runtime configuration: built-in defaults, then an optional TOML file, then env overrides.

use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

// --- env names & defaults ---
pub const ENV_CONFIG_PATH: &str = "PORTFOLIO_CONFIG_PATH";
pub const DEFAULT_CONFIG_PATH: &str = "config/portfolio.toml";

pub const DEFAULT_USERNAME: &str = "tushar-singh";
pub const DEFAULT_SOURCE_TIMEOUT_MS: u64 = 5_000;
pub const DEFAULT_CACHE_MAX_AGE_SECS: u64 = 3_600;
pub const DEFAULT_SMTP_HOST: &str = "smtp.gmail.com";

#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Identifier used when a request carries no `username` query parameter.
    pub default_username: String,
    pub upstream: UpstreamConfig,
    pub source_timeout: Duration,
    pub cache_max_age_secs: u64,
    pub mail: MailConfig,
    /// Echo the mail transport's failure reason in 500 bodies.
    pub expose_mail_errors: bool,
    /// Mount `/metrics`.
    pub debug_routes: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpstreamConfig {
    pub user_agent: String,
    pub leetcode_graphql: String,
    pub leetcode_rest: String,
    pub leetcode_site: String,
    pub devpost_site: String,
    pub gfg_profile: String,
    pub gfg_site: String,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            user_agent: concat!("portfolio-api/", env!("CARGO_PKG_VERSION")).to_string(),
            leetcode_graphql: "https://leetcode.com/graphql".to_string(),
            leetcode_rest: "https://alfa-leetcode-api.onrender.com".to_string(),
            leetcode_site: "https://leetcode.com".to_string(),
            devpost_site: "https://devpost.com".to_string(),
            gfg_profile: "https://auth.geeksforgeeks.org/user".to_string(),
            gfg_site: "https://www.geeksforgeeks.org".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct MailConfig {
    pub smtp_host: String,
    /// Mailbox used both as sender and recipient; `None` disables the relay.
    pub user: Option<String>,
    pub pass: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            default_username: DEFAULT_USERNAME.to_string(),
            upstream: UpstreamConfig::default(),
            source_timeout: Duration::from_millis(DEFAULT_SOURCE_TIMEOUT_MS),
            cache_max_age_secs: DEFAULT_CACHE_MAX_AGE_SECS,
            mail: MailConfig {
                smtp_host: DEFAULT_SMTP_HOST.to_string(),
                user: None,
                pass: None,
            },
            expose_mail_errors: false,
            debug_routes: false,
        }
    }
}

/// On-disk shape; every key is optional and only overrides what it names.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct FileConfig {
    default_username: Option<String>,
    source_timeout_ms: Option<u64>,
    cache_max_age_secs: Option<u64>,
    user_agent: Option<String>,
    smtp_host: Option<String>,
    #[serde(default)]
    upstream: FileUpstream,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct FileUpstream {
    leetcode_graphql: Option<String>,
    leetcode_rest: Option<String>,
    leetcode_site: Option<String>,
    devpost_site: Option<String>,
    gfg_profile: Option<String>,
    gfg_site: Option<String>,
}

impl AppConfig {
    /// Load using env var + fallbacks:
    /// 1) $PORTFOLIO_CONFIG_PATH (must exist)
    /// 2) config/portfolio.toml (if present)
    /// 3) built-in defaults
    ///
    /// Environment variables are applied last.
    pub fn load() -> Result<Self> {
        let mut cfg = Self::default();
        if let Some(path) = config_path()? {
            cfg.apply_file(&path)?;
        }
        cfg.apply_env(|k| std::env::var(k).ok());
        Ok(cfg)
    }

    pub fn from_toml_str(s: &str) -> Result<Self> {
        let mut cfg = Self::default();
        cfg.apply_toml(s)?;
        Ok(cfg)
    }

    fn apply_file(&mut self, path: &Path) -> Result<()> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading config from {}", path.display()))?;
        self.apply_toml(&content)
            .with_context(|| format!("parsing config {}", path.display()))
    }

    fn apply_toml(&mut self, s: &str) -> Result<()> {
        let file: FileConfig = toml::from_str(s)?;

        if let Some(u) = non_blank(file.default_username) {
            self.default_username = u;
        }
        if let Some(ms) = file.source_timeout_ms {
            self.source_timeout = Duration::from_millis(ms.max(1));
        }
        if let Some(secs) = file.cache_max_age_secs {
            self.cache_max_age_secs = secs;
        }
        if let Some(ua) = non_blank(file.user_agent) {
            self.upstream.user_agent = ua;
        }
        if let Some(host) = non_blank(file.smtp_host) {
            self.mail.smtp_host = host;
        }

        let up = file.upstream;
        let targets = [
            (up.leetcode_graphql, &mut self.upstream.leetcode_graphql),
            (up.leetcode_rest, &mut self.upstream.leetcode_rest),
            (up.leetcode_site, &mut self.upstream.leetcode_site),
            (up.devpost_site, &mut self.upstream.devpost_site),
            (up.gfg_profile, &mut self.upstream.gfg_profile),
            (up.gfg_site, &mut self.upstream.gfg_site),
        ];
        for (value, slot) in targets {
            if let Some(v) = non_blank(value) {
                *slot = trim_trailing_slash(&v);
            }
        }
        Ok(())
    }

    /// Env lookup is injected so tests don't have to mutate the process environment.
    pub fn apply_env<F>(&mut self, get: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(u) = non_blank(get("DEFAULT_USERNAME")) {
            self.default_username = u;
        }
        if let Some(ms) = get("SOURCE_TIMEOUT_MS").and_then(|s| s.trim().parse::<u64>().ok()) {
            self.source_timeout = Duration::from_millis(ms.max(1));
        }
        if let Some(secs) = get("CACHE_MAX_AGE_SECS").and_then(|s| s.trim().parse::<u64>().ok())
        {
            self.cache_max_age_secs = secs;
        }
        if let Some(host) = non_blank(get("SMTP_HOST")) {
            self.mail.smtp_host = host;
        }
        if let Some(user) = non_blank(get("EMAIL_USER")) {
            self.mail.user = Some(user);
        }
        if let Some(pass) = get("EMAIL_PASS").filter(|p| !p.is_empty()) {
            self.mail.pass = Some(pass);
        }
        if let Some(flag) = get("CONTACT_EXPOSE_ERRORS") {
            self.expose_mail_errors = is_truthy(&flag);
        }
        if let Some(flag) = get("DEBUG_ROUTES") {
            self.debug_routes = is_truthy(&flag);
        }
    }
}

fn config_path() -> Result<Option<PathBuf>> {
    if let Ok(p) = std::env::var(ENV_CONFIG_PATH) {
        let pb = PathBuf::from(p);
        if pb.exists() {
            return Ok(Some(pb));
        }
        return Err(anyhow!("{ENV_CONFIG_PATH} points to non-existent path"));
    }
    let default = PathBuf::from(DEFAULT_CONFIG_PATH);
    Ok(default.exists().then_some(default))
}

fn non_blank(v: Option<String>) -> Option<String> {
    v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

fn trim_trailing_slash(s: &str) -> String {
    s.trim_end_matches('/').to_string()
}

fn is_truthy(s: &str) -> bool {
    matches!(
        s.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn toml_overrides_only_named_keys() {
        let cfg = AppConfig::from_toml_str(
            r#"
default_username = "  someone  "
source_timeout_ms = 1500

[upstream]
devpost_site = "http://localhost:9000/"
"#,
        )
        .unwrap();
        assert_eq!(cfg.default_username, "someone");
        assert_eq!(cfg.source_timeout, Duration::from_millis(1500));
        assert_eq!(cfg.upstream.devpost_site, "http://localhost:9000");
        assert_eq!(cfg.upstream.leetcode_graphql, "https://leetcode.com/graphql");
        assert_eq!(cfg.cache_max_age_secs, DEFAULT_CACHE_MAX_AGE_SECS);
    }

    #[test]
    fn unknown_keys_are_rejected() {
        assert!(AppConfig::from_toml_str("cache_ttl = 5").is_err());
    }

    #[test]
    fn env_wins_over_file() {
        let mut cfg = AppConfig::from_toml_str(r#"default_username = "from-file""#).unwrap();
        let env: HashMap<&str, &str> = HashMap::from([
            ("DEFAULT_USERNAME", "from-env"),
            ("SOURCE_TIMEOUT_MS", "250"),
            ("EMAIL_USER", "me@example.com"),
            ("CONTACT_EXPOSE_ERRORS", "true"),
            ("DEBUG_ROUTES", "0"),
        ]);
        cfg.apply_env(|k| env.get(k).map(|v| v.to_string()));

        assert_eq!(cfg.default_username, "from-env");
        assert_eq!(cfg.source_timeout, Duration::from_millis(250));
        assert_eq!(cfg.mail.user.as_deref(), Some("me@example.com"));
        assert!(cfg.mail.pass.is_none());
        assert!(cfg.expose_mail_errors);
        assert!(!cfg.debug_routes);
    }

    #[test]
    fn blank_env_values_are_ignored() {
        let mut cfg = AppConfig::default();
        cfg.apply_env(|k| (k == "DEFAULT_USERNAME").then(|| "   ".to_string()));
        assert_eq!(cfg.default_username, DEFAULT_USERNAME);
    }
}
