use super::parsing::{
    env_flag, env_optional, env_or_default, env_parsed, parse_cors_origins, parse_environment,
    parse_value,
};
use super::secret::load_or_create_secret_key;
use super::types::{
    AdminSettings, ApiSettings, ConfigError, CorsSettings, DatabaseSettings, PermissionSettings,
    RedisSettings, RuntimeSettings, SecuritySettings, ServerSettings, Settings, TelemetrySettings,
};

impl Settings {
    pub(crate) fn load() -> Result<Self, ConfigError> {
        let environment = parse_environment(
            env_optional("QUIZROOM_ENV").or_else(|| env_optional("ENVIRONMENT")),
        );
        let strict_config = env_flag("QUIZROOM_STRICT_CONFIG") || environment.is_production();
        let runtime = RuntimeSettings { environment, strict_config };

        let server = ServerSettings {
            host: parse_host(env_or_default("QUIZROOM_HOST", "0.0.0.0"))?,
            port: parse_port(env_or_default("QUIZROOM_PORT", "8000"))?,
        };

        let api = ApiSettings {
            project_name: env_or_default("PROJECT_NAME", "Quizroom API"),
            version: env_or_default("VERSION", env!("CARGO_PKG_VERSION")),
            api_prefix: env_or_default("API_PREFIX", "/api/v1"),
        };

        let security = SecuritySettings {
            secret_key: env_optional("SECRET_KEY").unwrap_or_else(load_or_create_secret_key),
            access_token_expire_minutes: env_parsed("ACCESS_TOKEN_EXPIRE_MINUTES", "60")?,
            algorithm: env_or_default("ALGORITHM", "HS256"),
            login_rate_limit: env_parsed("LOGIN_RATE_LIMIT", "10")?,
            login_rate_window_seconds: env_parsed("LOGIN_RATE_WINDOW_SECONDS", "60")?,
        };

        let cors = CorsSettings { origins: parse_cors_origins(env_optional("BACKEND_CORS_ORIGINS"))? };

        let database = DatabaseSettings {
            url: match env_optional("DATABASE_URL") {
                Some(url) => url,
                None => postgres_url(strict_config)?,
            },
            max_connections: env_parsed("DATABASE_MAX_CONNECTIONS", "20")?,
        };

        let redis = RedisSettings {
            url: match env_optional("REDIS_URL") {
                Some(url) => url,
                None => redis_url()?,
            },
        };

        let permissions = PermissionSettings {
            admin: env_parsed("PERMISSION_ADMIN", "1")?,
            professor: env_parsed("PERMISSION_PROFESSOR", "2")?,
            student: env_parsed("PERMISSION_STUDENT", "3")?,
        };
        permissions.validate()?;

        let admin = AdminSettings {
            username: env_or_default("FIRST_ADMIN_USERNAME", "admin"),
            password: env_or_default("FIRST_ADMIN_PASSWORD", ""),
        };
        if strict_config && admin.password.is_empty() {
            return Err(ConfigError::MissingSecret("FIRST_ADMIN_PASSWORD"));
        }

        let telemetry = TelemetrySettings {
            log_level: env_or_default("QUIZROOM_LOG_LEVEL", "info"),
            json: env_flag("QUIZROOM_LOG_JSON"),
            prometheus_enabled: env_flag("PROMETHEUS_ENABLED"),
        };

        Ok(Self {
            server,
            runtime,
            api,
            security,
            cors,
            database,
            redis,
            permissions,
            admin,
            telemetry,
        })
    }

    pub(crate) fn server_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    pub(crate) fn server(&self) -> &ServerSettings {
        &self.server
    }

    pub(crate) fn api(&self) -> &ApiSettings {
        &self.api
    }

    pub(crate) fn security(&self) -> &SecuritySettings {
        &self.security
    }

    pub(crate) fn cors(&self) -> &CorsSettings {
        &self.cors
    }

    pub(crate) fn database(&self) -> &DatabaseSettings {
        &self.database
    }

    pub(crate) fn redis(&self) -> &RedisSettings {
        &self.redis
    }

    pub(crate) fn permissions(&self) -> PermissionSettings {
        self.permissions
    }

    pub(crate) fn admin(&self) -> &AdminSettings {
        &self.admin
    }

    pub(crate) fn telemetry(&self) -> &TelemetrySettings {
        &self.telemetry
    }

    pub(crate) fn runtime(&self) -> &RuntimeSettings {
        &self.runtime
    }
}

impl PermissionSettings {
    pub(super) fn validate(&self) -> Result<(), ConfigError> {
        if self.admin < self.professor && self.professor < self.student {
            Ok(())
        } else {
            Err(ConfigError::InvalidPermissionLadder)
        }
    }
}

fn postgres_url(strict: bool) -> Result<String, ConfigError> {
    let password = env_or_default("POSTGRES_PASSWORD", "");
    if strict && password.is_empty() {
        return Err(ConfigError::MissingSecret("POSTGRES_PASSWORD"));
    }
    let port: u16 = env_parsed("POSTGRES_PORT", "5432")?;
    Ok(format!(
        "postgresql://{user}:{password}@{host}:{port}/{db}",
        user = env_or_default("POSTGRES_USER", "quizroom"),
        host = env_or_default("POSTGRES_SERVER", "localhost"),
        db = env_or_default("POSTGRES_DB", "quizroom"),
    ))
}

fn redis_url() -> Result<String, ConfigError> {
    let host = env_or_default("REDIS_HOST", "localhost");
    let port: u16 = env_parsed("REDIS_PORT", "6379")?;
    let db: u16 = env_parsed("REDIS_DB", "0")?;
    let auth = env_optional("REDIS_PASSWORD").map(|password| format!(":{password}@"));
    Ok(format!("redis://{}{host}:{port}/{db}", auth.unwrap_or_default()))
}

fn parse_host(value: String) -> Result<String, ConfigError> {
    if value.trim().is_empty() {
        return Err(ConfigError::InvalidHost(value));
    }
    Ok(value)
}

fn parse_port(value: String) -> Result<u16, ConfigError> {
    match parse_value::<u16>("QUIZROOM_PORT", value.clone()) {
        Ok(port) if port > 0 => Ok(port),
        _ => Err(ConfigError::InvalidPort(value)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn permission_ladder_must_increase() {
        let valid = PermissionSettings { admin: 1, professor: 2, student: 3 };
        assert!(valid.validate().is_ok());

        let flat = PermissionSettings { admin: 1, professor: 1, student: 3 };
        assert!(matches!(flat.validate(), Err(ConfigError::InvalidPermissionLadder)));

        let inverted = PermissionSettings { admin: 3, professor: 2, student: 1 };
        assert!(inverted.validate().is_err());
    }

    #[test]
    fn server_port_rejects_zero_and_garbage() {
        assert!(parse_port("0".to_string()).is_err());
        assert!(parse_port("http".to_string()).is_err());
        assert_eq!(parse_port("8080".to_string()).expect("port"), 8080);
    }

    #[test]
    fn blank_host_is_rejected() {
        assert!(matches!(parse_host("  ".to_string()), Err(ConfigError::InvalidHost(_))));
        assert_eq!(parse_host("127.0.0.1".to_string()).expect("host"), "127.0.0.1");
    }
}
