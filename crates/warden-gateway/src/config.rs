//! Gateway configuration.

use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand, ValueEnum};
use warden_core::chain::DEFAULT_LOOKUP_TIMEOUT;
use warden_core::PasswordEncoding;

/// Rules applied when none are configured.
pub const DEFAULT_RULES: [&str; 3] = [
    "GET /auth/hello public",
    "GET /auth/hello-secured authority:CREATE",
    "* /** deny",
];

/// Warden HTTP gateway command line arguments.
#[derive(Debug, Parser)]
#[command(name = "warden-gateway")]
#[command(about = "HTTP gateway enforcing per-request authentication and authorization")]
pub struct Args {
    /// Address to listen on for HTTP requests.
    #[arg(short, long, env = "WARDEN_LISTEN", default_value = "0.0.0.0:8080")]
    pub listen: String,

    /// Ordered access rule, `"<METHOD|*> <pattern> <requirement>"`. Repeatable;
    /// the first matching rule wins.
    #[arg(long = "rule", env = "WARDEN_RULES", value_delimiter = ';')]
    pub rules: Vec<String>,

    /// Credential verification algorithm: none, argon2 or bcrypt.
    #[arg(long, env = "WARDEN_PASSWORD_ENCODER", default_value = "none")]
    pub password_encoder: PasswordEncoding,

    /// Where identities come from.
    #[arg(long, env = "WARDEN_IDENTITY_SOURCE", value_enum, default_value_t = IdentitySource::Fixture)]
    pub identity_source: IdentitySource,

    /// Fixture identities, `user:credential:AUTH1,AUTH2;user2:credential:AUTH3`.
    #[arg(long, env = "WARDEN_USERS")]
    pub users: Option<String>,

    /// JSON identity file for the `file` source.
    #[arg(long, env = "WARDEN_IDENTITY_FILE")]
    pub identity_file: Option<PathBuf>,

    /// Upper bound (ms) for one identity lookup.
    #[arg(long, env = "WARDEN_LOOKUP_TIMEOUT_MS", default_value_t = 2000)]
    pub lookup_timeout_ms: u64,

    /// Log level used when `RUST_LOG` is not set.
    #[arg(long, env = "WARDEN_LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Option<Command>,
}

/// Subcommands. Without one the gateway serves HTTP.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Print the stored form of a credential for provisioning.
    EncodePassword {
        /// Raw credential to encode.
        password: String,

        /// Algorithm to encode with.
        #[arg(long, default_value = "argon2")]
        encoder: PasswordEncoding,
    },
}

/// Identity source selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum IdentitySource {
    /// In-process identities from `--users`, or the built-in fixture.
    #[default]
    Fixture,
    /// JSON file re-read on every lookup.
    File,
}

/// Gateway configuration.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Address to listen on for HTTP requests.
    pub listen_addr: String,
    /// Rule lines in evaluation order.
    pub rules: Vec<String>,
    /// Credential verification algorithm.
    pub password_encoding: PasswordEncoding,
    /// Where identities come from.
    pub identity_source: IdentitySource,
    /// Fixture identity list, if overriding the built-in one.
    pub users: Option<String>,
    /// JSON identity file for the `file` source.
    pub identity_file: Option<PathBuf>,
    /// Upper bound for one identity lookup.
    pub lookup_timeout: Duration,
    /// Log level used when `RUST_LOG` is not set.
    pub log_level: String,
}

impl GatewayConfig {
    /// Set the listen address.
    pub fn with_listen_addr(mut self, addr: impl Into<String>) -> Self {
        self.listen_addr = addr.into();
        self
    }

    /// Replace the rule list.
    pub fn with_rules<I, S>(mut self, rules: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.rules = rules.into_iter().map(Into::into).collect();
        self
    }

    /// Set the credential verification algorithm.
    pub fn with_password_encoding(mut self, encoding: PasswordEncoding) -> Self {
        self.password_encoding = encoding;
        self
    }

    /// Use fixture identities parsed from `users`.
    pub fn with_users(mut self, users: impl Into<String>) -> Self {
        self.identity_source = IdentitySource::Fixture;
        self.users = Some(users.into());
        self
    }

    /// Use a JSON identity file.
    pub fn with_identity_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.identity_source = IdentitySource::File;
        self.identity_file = Some(path.into());
        self
    }

    /// Set the identity lookup timeout.
    pub fn with_lookup_timeout(mut self, timeout: Duration) -> Self {
        self.lookup_timeout = timeout;
        self
    }

    /// Tracing filter used when `RUST_LOG` is not set.
    pub fn default_log_filter(&self) -> String {
        let level = &self.log_level;
        format!("warden_gateway={level},warden_core={level},tower_http={level}")
    }
}

impl From<&Args> for GatewayConfig {
    fn from(args: &Args) -> Self {
        let rules = if args.rules.is_empty() {
            DEFAULT_RULES.iter().map(|r| r.to_string()).collect()
        } else {
            args.rules
                .iter()
                .map(|r| r.trim().to_string())
                .filter(|r| !r.is_empty())
                .collect()
        };

        Self {
            listen_addr: args.listen.clone(),
            rules,
            password_encoding: args.password_encoder,
            identity_source: args.identity_source,
            users: args.users.clone(),
            identity_file: args.identity_file.clone(),
            lookup_timeout: Duration::from_millis(args.lookup_timeout_ms),
            log_level: args.log_level.clone(),
        }
    }
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:8080".to_string(),
            rules: DEFAULT_RULES.iter().map(|r| r.to_string()).collect(),
            password_encoding: PasswordEncoding::None,
            identity_source: IdentitySource::Fixture,
            users: None,
            identity_file: None,
            lookup_timeout: DEFAULT_LOOKUP_TIMEOUT,
            log_level: "info".to_string(),
        }
    }
}
