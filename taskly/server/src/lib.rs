pub mod config {
    use serde::Deserialize;

    #[derive(Deserialize, Debug, Clone)]
    pub struct Config {
        pub db_url: String,
        #[serde(default = "default_port")]
        pub port: u16,
        pub jwt_secret: String,
        #[serde(default = "default_token_ttl_hours")]
        pub token_ttl_hours: i64,
        /// Whether `GET /tasks` and `GET /tasks/{id}` are served without a token.
        #[serde(default = "default_public_reads")]
        pub public_reads: bool,
    }

    impl Config {
        /// Loads configuration from environment variables.
        pub fn from_env() -> anyhow::Result<Self> {
            let settings = config::Config::builder()
                .add_source(config::Environment::default().try_parsing(true))
                .build()?;

            let config: Config = settings.try_deserialize()?;
            config.validate()?;
            Ok(config)
        }

        pub fn validate(&self) -> anyhow::Result<()> {
            anyhow::ensure!(
                self.token_ttl_hours > 0,
                "TOKEN_TTL_HOURS must be positive, got {}",
                self.token_ttl_hours
            );
            Ok(())
        }

        pub fn token_ttl(&self) -> chrono::Duration {
            chrono::Duration::hours(self.token_ttl_hours)
        }
    }

    fn default_port() -> u16 {
        8080
    }

    fn default_token_ttl_hours() -> i64 {
        24
    }

    fn default_public_reads() -> bool {
        true
    }

}

pub mod auth;
pub mod entities;
pub mod task;
pub mod web;
