use anyhow::Context;
use clap::Parser;
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Parser, Debug, Default)]
#[command(name = "murmur", about = "A minimal social network server")]
pub struct Cli {
    /// Path to config file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Host to bind to
    #[arg(long, env = "HOST")]
    pub host: Option<String>,

    /// Port to bind to
    #[arg(short, long, env = "PORT")]
    pub port: Option<u16>,

    /// Path to the SQLite database
    #[arg(long, env = "DATABASE_URL")]
    pub database: Option<PathBuf>,

    /// Secret used to sign bearer tokens
    #[arg(long, env = "JWT_SECRET", hide_env_values = true)]
    pub jwt_secret: Option<String>,

    /// Origin allowed to make cross-origin requests
    #[arg(long, env = "CORS_ORIGIN")]
    pub cors_origin: Option<String>,
}

#[derive(Deserialize, Debug, Clone, Default)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub cors_origin: Option<String>,
}

#[derive(Deserialize, Debug, Clone, Default)]
#[serde(default)]
pub struct DatabaseConfig {
    pub path: Option<PathBuf>,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct AuthConfig {
    pub jwt_secret: Option<String>,
    pub token_ttl_minutes: i64,
    pub bcrypt_cost: u32,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5000,
            cors_origin: None,
        }
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: None,
            token_ttl_minutes: 60,
            bcrypt_cost: 10,
        }
    }
}

impl Config {
    /// Layer defaults, the optional TOML file, then CLI flags / environment.
    /// Fails when the secret, database path or CORS origin is still unset.
    pub fn load(cli: &Cli) -> anyhow::Result<Self> {
        let mut config = match cli.config {
            Some(ref path) => {
                let content = std::fs::read_to_string(path)
                    .with_context(|| format!("reading config file {}", path.display()))?;
                toml::from_str(&content)?
            }
            None => Config::default(),
        };

        // CLI / env overrides
        if let Some(ref host) = cli.host {
            config.server.host = host.clone();
        }
        if let Some(port) = cli.port {
            config.server.port = port;
        }
        if let Some(ref origin) = cli.cors_origin {
            config.server.cors_origin = Some(origin.clone());
        }
        if let Some(ref path) = cli.database {
            config.database.path = Some(path.clone());
        }
        if let Some(ref secret) = cli.jwt_secret {
            config.auth.jwt_secret = Some(secret.clone());
        }

        config.db_path()?;
        config.jwt_secret()?;
        config.cors_origin()?;

        Ok(config)
    }

    pub fn db_path(&self) -> anyhow::Result<&Path> {
        self.database
            .path
            .as_deref()
            .context("database path is not configured (set DATABASE_URL)")
    }

    pub fn jwt_secret(&self) -> anyhow::Result<&str> {
        self.auth
            .jwt_secret
            .as_deref()
            .filter(|s| !s.is_empty())
            .context("signing secret is not configured (set JWT_SECRET)")
    }

    pub fn cors_origin(&self) -> anyhow::Result<&str> {
        self.server
            .cors_origin
            .as_deref()
            .context("allowed origin is not configured (set CORS_ORIGIN)")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn complete_cli() -> Cli {
        Cli {
            database: Some(PathBuf::from("/tmp/murmur.db")),
            jwt_secret: Some("secret".to_string()),
            cors_origin: Some("http://localhost:3000".to_string()),
            ..Cli::default()
        }
    }

    #[test]
    fn default_config_has_expected_values() {
        let config = Config::default();
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 5000);
        assert_eq!(config.auth.token_ttl_minutes, 60);
        assert_eq!(config.auth.bcrypt_cost, 10);
        assert!(config.database.path.is_none());
        assert!(config.auth.jwt_secret.is_none());
    }

    #[test]
    fn load_with_required_values_uses_defaults_elsewhere() {
        let config = Config::load(&complete_cli()).unwrap();
        assert_eq!(config.server.port, 5000);
        assert_eq!(config.db_path().unwrap(), Path::new("/tmp/murmur.db"));
        assert_eq!(config.jwt_secret().unwrap(), "secret");
        assert_eq!(config.cors_origin().unwrap(), "http://localhost:3000");
    }

    #[test]
    fn load_fails_without_secret() {
        let cli = Cli {
            jwt_secret: None,
            ..complete_cli()
        };
        let err = Config::load(&cli).unwrap_err();
        assert!(err.to_string().contains("JWT_SECRET"));
    }

    #[test]
    fn load_fails_without_database() {
        let cli = Cli {
            database: None,
            ..complete_cli()
        };
        let err = Config::load(&cli).unwrap_err();
        assert!(err.to_string().contains("DATABASE_URL"));
    }

    #[test]
    fn load_fails_without_cors_origin() {
        let cli = Cli {
            cors_origin: None,
            ..complete_cli()
        };
        assert!(Config::load(&cli).is_err());
    }

    #[test]
    fn empty_secret_is_rejected() {
        let cli = Cli {
            jwt_secret: Some(String::new()),
            ..complete_cli()
        };
        assert!(Config::load(&cli).is_err());
    }

    #[test]
    fn load_reads_toml_file() {
        let tmp = tempfile::tempdir().unwrap();
        let config_path = tmp.path().join("config.toml");
        std::fs::write(
            &config_path,
            r#"
[server]
host = "127.0.0.1"
port = 9000
cors_origin = "https://example.com"

[database]
path = "/var/lib/murmur/murmur.db"

[auth]
jwt_secret = "from-file"
token_ttl_minutes = 15
bcrypt_cost = 4
"#,
        )
        .unwrap();

        let cli = Cli {
            config: Some(config_path),
            ..Cli::default()
        };
        let config = Config::load(&cli).unwrap();
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.cors_origin().unwrap(), "https://example.com");
        assert_eq!(config.jwt_secret().unwrap(), "from-file");
        assert_eq!(config.auth.token_ttl_minutes, 15);
        assert_eq!(config.auth.bcrypt_cost, 4);
    }

    #[test]
    fn cli_overrides_beat_toml_values() {
        let tmp = tempfile::tempdir().unwrap();
        let config_path = tmp.path().join("config.toml");
        std::fs::write(
            &config_path,
            r#"
[server]
port = 9000

[auth]
jwt_secret = "from-file"
"#,
        )
        .unwrap();

        let cli = Cli {
            config: Some(config_path),
            port: Some(4000),
            jwt_secret: Some("from-cli".to_string()),
            ..complete_cli()
        };
        let config = Config::load(&cli).unwrap();
        assert_eq!(config.server.port, 4000);
        assert_eq!(config.jwt_secret().unwrap(), "from-cli");
    }

    #[test]
    fn missing_config_file_is_an_error() {
        let cli = Cli {
            config: Some(PathBuf::from("/nonexistent/murmur.toml")),
            ..complete_cli()
        };
        assert!(Config::load(&cli).is_err());
    }
}
