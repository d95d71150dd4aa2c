/*
 * Responsibility
 * - 環境変数や設定の読み込み (PORT, SERVER_NAME, AUTH_TKT_* など)
 * - 設定値のバリデーション (不足なら起動失敗)
 * - SERVER_NAME は cookie の Domain にそのまま入るので header に書ける文字だけ許可
 * - timeout / reissue_time の関係チェックは plugin 構築時 (factory) に行う
 */
use std::fmt;
use std::net::SocketAddr;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnv {
    Development,
    Production,
}

impl AppEnv {
    pub fn from_env() -> Self {
        match std::env::var("APP_ENV")
            .unwrap_or_else(|_| "development".to_string())
            .to_ascii_lowercase()
            .as_str()
        {
            "production" | "prod" => Self::Production,
            _ => Self::Development,
        }
    }

    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }
}

#[derive(Debug)]
pub enum ConfigError {
    Missing(&'static str),
    Invalid(&'static str),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Missing(key) => write!(f, "missing configuration: {}", key),
            ConfigError::Invalid(key) => write!(f, "invalid configuration: {}", key),
        }
    }
}

impl std::error::Error for ConfigError {}

#[derive(Clone)]
pub struct Config {
    pub addr: SocketAddr,
    pub app_env: AppEnv,
    // Fallback for the cookie Domain when a request has no Host header
    pub server_name: String,
    pub cors_allowed_origins: Vec<String>,

    pub auth_tkt_secret: String,
    pub auth_tkt_cookie_name: String,
    pub auth_tkt_secure: bool,
    pub auth_tkt_include_ip: bool,
    pub auth_tkt_timeout_seconds: Option<i64>,
    pub auth_tkt_reissue_seconds: Option<i64>,
    // Empty = every userid is accepted
    pub auth_tkt_allowed_userids: Vec<String>,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Do not print the ticket secret
        f.debug_struct("Config")
            .field("addr", &self.addr)
            .field("app_env", &self.app_env)
            .field("server_name", &self.server_name)
            .field("auth_tkt_cookie_name", &self.auth_tkt_cookie_name)
            .field("auth_tkt_secure", &self.auth_tkt_secure)
            .field("auth_tkt_include_ip", &self.auth_tkt_include_ip)
            .field("auth_tkt_timeout_seconds", &self.auth_tkt_timeout_seconds)
            .field("auth_tkt_reissue_seconds", &self.auth_tkt_reissue_seconds)
            .finish()
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let port: u16 = std::env::var("PORT")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(3000);

        let addr: SocketAddr = SocketAddr::from_str(&format!("0.0.0.0:{}", port))
            .map_err(|_| ConfigError::Invalid("PORT"))?;

        let app_env = AppEnv::from_env();

        let server_name = std::env::var("SERVER_NAME").unwrap_or_else(|_| "localhost".to_string());
        let server_name = cookie_domain(&server_name).ok_or(ConfigError::Invalid("SERVER_NAME"))?;

        let cors_allowed_origins = comma_list("CORS_ALLOWED_ORIGINS");

        let auth_tkt_secret = std::env::var("AUTH_TKT_SECRET")
            .map_err(|_| ConfigError::Missing("AUTH_TKT_SECRET"))?;

        let auth_tkt_cookie_name =
            std::env::var("AUTH_TKT_COOKIE_NAME").unwrap_or_else(|_| "auth_tkt".to_string());

        let auth_tkt_secure = env_flag("AUTH_TKT_SECURE")?;
        let auth_tkt_include_ip = env_flag("AUTH_TKT_INCLUDE_IP")?;

        let auth_tkt_timeout_seconds = env_seconds("AUTH_TKT_TIMEOUT_SECONDS")?;
        let auth_tkt_reissue_seconds = env_seconds("AUTH_TKT_REISSUE_SECONDS")?;

        let auth_tkt_allowed_userids = comma_list("AUTH_TKT_ALLOWED_USERIDS");

        Ok(Self {
            addr,
            app_env,
            server_name,
            cors_allowed_origins,
            auth_tkt_secret,
            auth_tkt_cookie_name,
            auth_tkt_secure,
            auth_tkt_include_ip,
            auth_tkt_timeout_seconds,
            auth_tkt_reissue_seconds,
            auth_tkt_allowed_userids,
        })
    }
}

fn comma_list(key: &'static str) -> Vec<String> {
    std::env::var(key)
        .unwrap_or_default()
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

fn env_flag(key: &'static str) -> Result<bool, ConfigError> {
    match std::env::var(key) {
        Err(_) => Ok(false),
        Ok(v) => match v.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "" | "0" | "false" | "no" | "off" => Ok(false),
            _ => Err(ConfigError::Invalid(key)),
        },
    }
}

fn env_seconds(key: &'static str) -> Result<Option<i64>, ConfigError> {
    match std::env::var(key) {
        Err(_) => Ok(None),
        Ok(v) if v.trim().is_empty() => Ok(None),
        Ok(v) => v
            .trim()
            .parse::<i64>()
            .ok()
            .filter(|secs| (1..=i64::from(u32::MAX)).contains(secs))
            .map(Some)
            .ok_or(ConfigError::Invalid(key)),
    }
}

// Domain 属性に入れても Set-Cookie が壊れない値だけ通す
fn cookie_domain(name: &str) -> Option<String> {
    let name = name.trim();
    let valid = !name.is_empty()
        && name
            .bytes()
            .all(|b| b.is_ascii_graphic() && !matches!(b, b';' | b',' | b'"'));
    valid.then(|| name.to_string())
}
