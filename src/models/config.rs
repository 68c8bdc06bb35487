//! Application configuration structures.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};
use crate::models::{AcademicLevel, BudgetRange};

/// Root application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Outbound HTTP client settings
    #[serde(default)]
    pub http: HttpConfig,

    /// REST server settings
    #[serde(default)]
    pub server: ServerConfig,

    /// ID token verification and admin list
    #[serde(default)]
    pub auth: AuthConfig,

    /// Generative model settings
    #[serde(default)]
    pub ai: AiConfig,

    /// Places proxy settings
    #[serde(default)]
    pub places: PlacesConfig,

    /// Exchange rate API settings
    #[serde(default)]
    pub currency: CurrencyConfig,

    /// Pathway template scraping matrix
    #[serde(default)]
    pub scraping: ScrapingConfig,

    /// University population targets
    #[serde(default = "defaults::populate_targets")]
    pub populate: Vec<PopulateTarget>,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Validate configuration values for basic sanity.
    pub fn validate(&self) -> Result<()> {
        if self.http.user_agent.trim().is_empty() {
            return Err(AppError::validation("http.user_agent is empty"));
        }
        if self.http.timeout_secs == 0 {
            return Err(AppError::validation("http.timeout_secs must be > 0"));
        }
        if self.server.port == 0 {
            return Err(AppError::validation("server.port must be > 0"));
        }
        if self.ai.model.trim().is_empty() {
            return Err(AppError::validation("ai.model is empty"));
        }
        if self.currency.cache_ttl_hours == 0 {
            return Err(AppError::validation(
                "currency.cache_ttl_hours must be > 0",
            ));
        }
        for (name, value) in [
            ("ai.endpoint", &self.ai.endpoint),
            ("places.base_url", &self.places.base_url),
            ("currency.endpoint", &self.currency.endpoint),
            ("auth.endpoint", &self.auth.endpoint),
        ] {
            url::Url::parse(value)
                .map_err(|e| AppError::validation(format!("{name} is not a valid URL: {e}")))?;
        }
        if self.scraping.countries.is_empty() || self.scraping.courses.is_empty() {
            return Err(AppError::validation(
                "scraping.countries and scraping.courses must not be empty",
            ));
        }
        if self.populate.iter().any(|t| t.cities.is_empty()) {
            return Err(AppError::validation(
                "Every populate target needs at least one city",
            ));
        }
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            http: HttpConfig::default(),
            server: ServerConfig::default(),
            auth: AuthConfig::default(),
            ai: AiConfig::default(),
            places: PlacesConfig::default(),
            currency: CurrencyConfig::default(),
            scraping: ScrapingConfig::default(),
            populate: defaults::populate_targets(),
        }
    }
}

/// Outbound HTTP client settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    /// User-Agent header for HTTP requests
    #[serde(default = "defaults::user_agent")]
    pub user_agent: String,

    /// Request timeout in seconds
    #[serde(default = "defaults::timeout")]
    pub timeout_secs: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            user_agent: defaults::user_agent(),
            timeout_secs: defaults::timeout(),
        }
    }
}

/// REST server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "defaults::host")]
    pub host: String,

    #[serde(default = "defaults::port")]
    pub port: u16,

    /// Allowed CORS origins; empty allows any origin
    #[serde(default)]
    pub cors_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: defaults::host(),
            port: defaults::port(),
            cors_origins: Vec::new(),
        }
    }
}

/// ID token verification settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Identity Toolkit base URL
    #[serde(default = "defaults::auth_endpoint")]
    pub endpoint: String,

    /// Environment variable holding the web API key
    #[serde(default = "defaults::auth_key_env")]
    pub api_key_env: String,

    /// E-mail addresses with admin rights
    #[serde(default)]
    pub admin_emails: Vec<String>,

    /// Static tokens for local development; used instead of remote verification
    #[serde(default)]
    pub dev_tokens: Vec<DevToken>,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            endpoint: defaults::auth_endpoint(),
            api_key_env: defaults::auth_key_env(),
            admin_emails: Vec::new(),
            dev_tokens: Vec::new(),
        }
    }
}

/// A fixed bearer token mapped to a user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DevToken {
    pub token: String,
    pub uid: String,
    pub email: String,
}

/// Generative model settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AiConfig {
    /// API base URL, the model path is appended
    #[serde(default = "defaults::ai_endpoint")]
    pub endpoint: String,

    #[serde(default = "defaults::ai_model")]
    pub model: String,

    #[serde(default = "defaults::ai_temperature")]
    pub temperature: f32,

    /// Environment variable holding the API key
    #[serde(default = "defaults::ai_key_env")]
    pub api_key_env: String,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            endpoint: defaults::ai_endpoint(),
            model: defaults::ai_model(),
            temperature: defaults::ai_temperature(),
            api_key_env: defaults::ai_key_env(),
        }
    }
}

/// Places proxy settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlacesConfig {
    #[serde(default = "defaults::places_base_url")]
    pub base_url: String,

    #[serde(default = "defaults::places_key_env")]
    pub api_key_env: String,

    /// Delay between Places requests in milliseconds
    #[serde(default = "defaults::places_delay")]
    pub request_delay_ms: u64,

    /// Maximum search results kept per city
    #[serde(default = "defaults::places_max_results")]
    pub max_results_per_city: usize,
}

impl Default for PlacesConfig {
    fn default() -> Self {
        Self {
            base_url: defaults::places_base_url(),
            api_key_env: defaults::places_key_env(),
            request_delay_ms: defaults::places_delay(),
            max_results_per_city: defaults::places_max_results(),
        }
    }
}

/// Exchange rate API settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurrencyConfig {
    /// Endpoint returning `{ "base": "USD", "rates": { ... } }`
    #[serde(default = "defaults::currency_endpoint")]
    pub endpoint: String,

    #[serde(default = "defaults::currency_ttl")]
    pub cache_ttl_hours: u64,
}

impl Default for CurrencyConfig {
    fn default() -> Self {
        Self {
            endpoint: defaults::currency_endpoint(),
            cache_ttl_hours: defaults::currency_ttl(),
        }
    }
}

/// Matrix of profiles to pre-generate templates for.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScrapingConfig {
    #[serde(default = "defaults::countries")]
    pub countries: Vec<String>,

    #[serde(default = "defaults::courses")]
    pub courses: Vec<String>,

    #[serde(default = "defaults::levels")]
    pub levels: Vec<AcademicLevel>,

    #[serde(default = "defaults::budgets")]
    pub budgets: Vec<BudgetRange>,

    #[serde(default = "defaults::nationalities")]
    pub nationalities: Vec<String>,

    /// Delay between AI calls in milliseconds
    #[serde(default = "defaults::ai_call_delay")]
    pub ai_call_delay_ms: u64,
}

impl Default for ScrapingConfig {
    fn default() -> Self {
        Self {
            countries: defaults::countries(),
            courses: defaults::courses(),
            levels: defaults::levels(),
            budgets: defaults::budgets(),
            nationalities: defaults::nationalities(),
            ai_call_delay_ms: defaults::ai_call_delay(),
        }
    }
}

/// Cities of one country to search for universities.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PopulateTarget {
    pub country: String,
    pub cities: Vec<String>,
}

mod defaults {
    use super::PopulateTarget;
    use crate::models::{AcademicLevel, BudgetRange};

    // HTTP defaults
    pub fn user_agent() -> String {
        "Mozilla/5.0 (compatible; UniGuide/1.0)".into()
    }
    pub fn timeout() -> u64 {
        30
    }

    // Server defaults
    pub fn host() -> String {
        "0.0.0.0".into()
    }
    pub fn port() -> u16 {
        5000
    }

    // Auth defaults
    pub fn auth_endpoint() -> String {
        "https://identitytoolkit.googleapis.com/v1".into()
    }
    pub fn auth_key_env() -> String {
        "FIREBASE_API_KEY".into()
    }

    // AI defaults
    pub fn ai_endpoint() -> String {
        "https://generativelanguage.googleapis.com/v1beta".into()
    }
    pub fn ai_model() -> String {
        "gemini-1.5-flash".into()
    }
    pub fn ai_temperature() -> f32 {
        0.4
    }
    pub fn ai_key_env() -> String {
        "GEMINI_API_KEY".into()
    }

    // Places defaults
    pub fn places_base_url() -> String {
        "https://maps.googleapis.com/maps/api/place".into()
    }
    pub fn places_key_env() -> String {
        "PLACES_API_KEY".into()
    }
    pub fn places_delay() -> u64 {
        500
    }
    pub fn places_max_results() -> usize {
        20
    }

    // Currency defaults
    pub fn currency_endpoint() -> String {
        "https://api.exchangerate-api.com/v4/latest/USD".into()
    }
    pub fn currency_ttl() -> u64 {
        24
    }

    // Scraping defaults
    pub fn countries() -> Vec<String> {
        ["USA", "UK", "Canada", "Australia", "Germany"]
            .map(String::from)
            .to_vec()
    }
    pub fn courses() -> Vec<String> {
        [
            "Computer Science",
            "Business Administration",
            "Engineering",
            "Data Science",
            "Medicine",
        ]
        .map(String::from)
        .to_vec()
    }
    pub fn levels() -> Vec<AcademicLevel> {
        vec![AcademicLevel::Undergraduate, AcademicLevel::Postgraduate]
    }
    pub fn budgets() -> Vec<BudgetRange> {
        BudgetRange::ALL.to_vec()
    }
    pub fn nationalities() -> Vec<String> {
        vec!["Indian".into()]
    }
    pub fn ai_call_delay() -> u64 {
        2000
    }

    // Populate defaults
    pub fn populate_targets() -> Vec<PopulateTarget> {
        vec![
            PopulateTarget {
                country: "USA".into(),
                cities: vec!["Boston".into(), "New York".into()],
            },
            PopulateTarget {
                country: "UK".into(),
                cities: vec!["London".into(), "Manchester".into()],
            },
            PopulateTarget {
                country: "Canada".into(),
                cities: vec!["Toronto".into(), "Vancouver".into()],
            },
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validate_default_config_ok() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn validate_rejects_empty_user_agent() {
        let mut config = Config::default();
        config.http.user_agent = "  ".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_bad_url() {
        let mut config = Config::default();
        config.places.base_url = "not a url".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn partial_toml_fills_defaults() {
        let config: Config = toml::from_str(
            r#"
            [server]
            port = 8080

            [scraping]
            countries = ["Ireland"]
            levels = ["doctorate"]
            "#,
        )
        .unwrap();

        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.scraping.countries, vec!["Ireland"]);
        assert_eq!(config.scraping.levels, vec![AcademicLevel::Doctorate]);
        assert_eq!(config.scraping.ai_call_delay_ms, 2000);
        assert!(!config.populate.is_empty());
    }
}
