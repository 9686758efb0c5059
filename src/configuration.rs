use config::ConfigError;

#[derive(serde::Deserialize, Clone)]
pub struct Settings {
    pub database: DatabaseSettings,
    pub application: ApplicationSettings,
    pub jwt: JwtSettings,
    pub polka: PolkaSettings,
}

#[derive(serde::Deserialize, Clone)]
pub struct ApplicationSettings {
    pub port: u16,
}

#[derive(serde::Deserialize, Clone)]
pub struct DatabaseSettings {
    pub username: String,
    pub password: String,
    pub port: u16,
    pub host: String,
    pub database_name: String,
}

impl DatabaseSettings {
    pub fn connection_string(&self) -> String {
        format!(
            "postgres://{}:{}@{}:{}/{}",
            self.username, self.password, self.host, self.port, self.database_name
        )
    }

    pub fn connection_string_without_db(&self) -> String {
        format!(
            "postgres://{}:{}@{}:{}",
            self.username, self.password, self.host, self.port
        )
    }
}

/// JWT authentication settings
#[derive(serde::Deserialize, Clone)]
pub struct JwtSettings {
    pub secret: String,
    pub access_token_expiry: i64,   // seconds (3600 = 1 hour)
    pub refresh_token_expiry: i64,  // seconds (5184000 = 60 days)
    pub issuer: String,
}

/// Polka payment webhook settings
#[derive(serde::Deserialize, Clone)]
pub struct PolkaSettings {
    pub key: String,
}

/// Load settings from the optional `configuration` file, overridden by
/// `APP__`-prefixed environment variables (e.g. `APP__JWT__SECRET`).
///
/// A missing or empty signing secret or webhook key is a configuration
/// error: the process must not start serving requests without them.
pub fn get_configuration() -> Result<Settings, ConfigError> {
    let settings = config::Config::builder()
        .add_source(config::File::with_name("configuration").required(false))
        .add_source(config::Environment::with_prefix("APP").separator("__"))
        .build()?
        .try_deserialize::<Settings>()?;

    if settings.jwt.secret.trim().is_empty() {
        return Err(ConfigError::Message(
            "jwt.secret must be set (APP__JWT__SECRET)".to_string(),
        ));
    }
    if settings.polka.key.trim().is_empty() {
        return Err(ConfigError::Message(
            "polka.key must be set (APP__POLKA__KEY)".to_string(),
        ));
    }

    Ok(settings)
}
