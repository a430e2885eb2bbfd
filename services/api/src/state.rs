use auth::JwtKeys;
use db::Db;
use serde::Deserialize;

#[derive(Clone)]
pub struct AppState {
    pub db: Db,
    pub jwt: JwtKeys,
    pub access_ttl: i64,
    pub refresh_ttl: i64,
    pub otp_ttl: i64,
    pub cookie_domain: String,
    pub cookie_secure: bool,
}

#[derive(Debug, Deserialize)]
pub struct Settings {
    pub database_url: String,
    pub jwt_secret: String,
    pub port: Option<u16>,
    pub access_ttl_seconds: Option<i64>,
    pub refresh_ttl_seconds: Option<i64>,
    pub otp_ttl_seconds: Option<i64>,
    pub cookie_domain: Option<String>,
    pub cookie_secure: Option<bool>,
}

impl Settings {
    pub fn from_env() -> Self {
        let _ = dotenvy::dotenv();

        let cfg = config::Config::builder()
            .add_source(config::Environment::default().try_parsing(true))
            .build()
            .expect("config");

        cfg.try_deserialize::<Settings>()
            .expect("deserialize settings")
    }
}

impl AppState {
    pub fn from_settings(s: Settings, db: Db) -> Self {
        AppState {
            db,
            jwt: JwtKeys::from_secret(&s.jwt_secret),
            access_ttl: s.access_ttl_seconds.unwrap_or(900),
            refresh_ttl: s.refresh_ttl_seconds.unwrap_or(60 * 60 * 24 * 7),
            otp_ttl: s.otp_ttl_seconds.unwrap_or(300),
            cookie_domain: s.cookie_domain.unwrap_or_else(|| "localhost".into()),
            cookie_secure: s.cookie_secure.unwrap_or(false),
        }
    }
}
