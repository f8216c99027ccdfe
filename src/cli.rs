//! CLI argument parsing, validation, and startup helpers.

use std::sync::Arc;

use base64::Engine;
use clap::Parser;
use tracing::{error, info};
use url::Url;

use crate::db::{Database, Role};
use crate::email::{LogMailer, Mailer};
use crate::password::hash_password;
use crate::ServerConfig;

/// Minimum decoded signing secret length for HMAC-SHA256.
const MIN_SIGNING_SECRET_BYTES: usize = 32;

#[derive(clap::ValueEnum, Clone, Debug, Default)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
    Compact,
}

#[derive(Parser, Debug, Clone)]
#[command(name = "Keygate", about = "Token-based authentication service")]
pub struct Args {
    /// Port to listen on
    #[arg(short, long, default_value = "7300")]
    pub port: u16,

    /// Path to SQLite database file
    #[arg(short, long, default_value = "keygate.db")]
    pub database: String,

    /// Public origin used in password reset links (e.g., "https://auth.example.com")
    #[arg(long, default_value = "http://localhost:7300")]
    pub public_origin: String,

    /// Path to file containing the base64 signing secret. Prefer using JWT_SECRET env var instead
    #[arg(long)]
    pub jwt_secret_file: Option<String>,

    /// Access token lifetime in seconds
    #[arg(long, default_value = "900")]
    pub access_ttl_secs: u64,

    /// Refresh token lifetime in seconds
    #[arg(long, default_value = "604800")]
    pub refresh_ttl_secs: u64,

    /// Create an admin user on startup
    #[arg(long, num_args = 3, value_names = ["USERNAME", "EMAIL", "PASSWORD"])]
    pub create_admin: Option<Vec<String>>,

    /// Log output format
    #[arg(short, long, default_value = "pretty")]
    pub log_format: LogFormat,
}

/// Initialize logging based on the specified format.
pub fn init_logging(format: &LogFormat) {
    match format {
        LogFormat::Pretty => tracing_subscriber::fmt::init(),
        LogFormat::Json => tracing_subscriber::fmt().json().init(),
        LogFormat::Compact => tracing_subscriber::fmt().compact().init(),
    }
}

/// Load the signing secret from environment variable or file and decode it.
/// Returns None and logs an error if the secret cannot be loaded, is not
/// valid base64, or decodes to fewer than 32 bytes.
pub fn load_signing_secret(jwt_secret_file: Option<&str>) -> Option<Vec<u8>> {
    let encoded = if let Ok(secret) = std::env::var("JWT_SECRET") {
        // Clear the environment variable to prevent leaking
        // SAFETY: We're single-threaded at this point during startup,
        // and no other code is reading this environment variable.
        unsafe { std::env::remove_var("JWT_SECRET") };
        secret
    } else if let Some(path) = jwt_secret_file {
        match std::fs::read_to_string(path) {
            Ok(content) => content.trim().to_string(),
            Err(e) => {
                error!(path = %path, error = %e, "Failed to read signing secret file");
                return None;
            }
        }
    } else {
        error!(
            "Signing secret is required. Set JWT_SECRET environment variable (recommended) or use --jwt-secret-file"
        );
        return None;
    };

    let secret = match base64::engine::general_purpose::STANDARD.decode(encoded.trim()) {
        Ok(bytes) => bytes,
        Err(e) => {
            error!(error = %e, "Signing secret is not valid base64");
            return None;
        }
    };

    if secret.len() < MIN_SIGNING_SECRET_BYTES {
        error!(
            "Signing secret decodes to fewer than {} bytes. Use a longer secret",
            MIN_SIGNING_SECRET_BYTES
        );
        return None;
    }

    Some(secret)
}

/// Parse and validate the public-origin URL.
/// Returns None and logs an error if validation fails.
pub fn validate_public_origin(public_origin: &str) -> Option<Url> {
    let url = match Url::parse(public_origin) {
        Ok(url) => url,
        Err(e) => {
            error!(origin = %public_origin, error = %e, "Invalid public-origin URL");
            return None;
        }
    };

    let is_https = url.scheme() == "https";
    let is_localhost = url.host_str() == Some("localhost");

    if !is_https && !is_localhost {
        error!("public-origin must use HTTPS for non-localhost deployments");
        return None;
    }

    Some(url)
}

/// Handle the --create-admin flag: create an admin user unless the
/// username is already taken.
pub async fn handle_create_admin(db: &Database, username: &str, email: &str, password: &str) {
    match db.users().get_by_username(username).await {
        Ok(Some(_)) => {
            info!(username = %username, "Admin user already exists, skipping creation");
        }
        Ok(None) => {
            let password_hash = match hash_password(password) {
                Ok(hash) => hash,
                Err(e) => {
                    error!(error = %e, "Failed to hash admin password");
                    std::process::exit(1);
                }
            };

            match db
                .users()
                .create(username, email, &password_hash, &[Role::Admin])
                .await
            {
                Ok(_) => {
                    info!(username = %username, "Admin user created");
                }
                Err(e) => {
                    error!(error = %e, "Failed to create admin user");
                    std::process::exit(1);
                }
            }
        }
        Err(e) => {
            error!(error = %e, "Failed to check for existing admin");
            std::process::exit(1);
        }
    }
}

/// Build ServerConfig from validated arguments.
pub fn build_config(
    db: Database,
    signing_secret: Vec<u8>,
    access_ttl_secs: u64,
    refresh_ttl_secs: u64,
    public_origin: Url,
) -> ServerConfig {
    let mailer: Arc<dyn Mailer> = Arc::new(LogMailer);

    ServerConfig {
        db,
        signing_secret,
        access_ttl_secs,
        refresh_ttl_secs,
        public_origin,
        mailer,
    }
}

/// Open the database, logging errors if it fails.
pub async fn open_database(path: &str) -> Option<Database> {
    match Database::open(path).await {
        Ok(db) => {
            info!(path = %path, "Database opened");
            Some(db)
        }
        Err(e) => {
            error!(path = %path, error = %e, "Failed to open database");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_secret_too_short_rejected() {
        // 16 bytes decoded
        let encoded = base64::engine::general_purpose::STANDARD.encode([7u8; 16]);
        unsafe { std::env::set_var("JWT_SECRET", &encoded) };
        assert!(load_signing_secret(None).is_none());
    }

    #[test]
    fn test_invalid_base64_rejected() {
        unsafe { std::env::set_var("JWT_SECRET", "!!not-base64!!") };
        assert!(load_signing_secret(None).is_none());
    }

    #[test]
    fn test_public_origin_validation() {
        assert!(validate_public_origin("https://auth.example.com").is_some());
        assert!(validate_public_origin("http://localhost:7300").is_some());
        assert!(validate_public_origin("http://auth.example.com").is_none());
        assert!(validate_public_origin("not a url").is_none());
    }
}
