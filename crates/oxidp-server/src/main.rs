use std::env;
use std::path::PathBuf;
use std::sync::Arc;

use oxidp_auth::account::{Account, AccountStore};
use oxidp_auth::config::AuthConfig;
use oxidp_auth::http::{OidcState, router};
use oxidp_auth::oauth::InteractionFlow;
use oxidp_auth::registry::{ClientRegistry, ClientSources, FallbackClient};
use oxidp_auth::storage::MemoryStorage;
use oxidp_auth::token::{JwtService, SigningKeyPair, TokenService, TracingObserver};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    // Load .env file if present (before anything else)
    if let Err(e) = dotenvy::dotenv() {
        if !matches!(e, dotenvy::Error::Io(ref io_err) if io_err.kind() == std::io::ErrorKind::NotFound)
        {
            eprintln!("Warning: Failed to load .env file: {e}");
        }
    }

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = match load_config() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Configuration error: {e}");
            std::process::exit(2);
        }
    };

    let registry = match ClientRegistry::load(client_sources()) {
        Ok(r) => r,
        Err(e) => {
            eprintln!("Client registry error: {e}");
            std::process::exit(2);
        }
    };
    tracing::info!(clients = registry.len(), "Client registry loaded");

    let accounts = load_accounts();
    tracing::info!(accounts = accounts.len(), "Account store seeded");

    let signing_key = match signing_key(&config) {
        Ok(k) => k,
        Err(e) => {
            eprintln!("Signing key error: {e}");
            std::process::exit(2);
        }
    };
    tracing::info!(kid = %signing_key.kid, "Token signing key ready");

    let config = Arc::new(config);
    let registry = Arc::new(registry);
    let accounts = Arc::new(accounts);
    let jwt = Arc::new(JwtService::new(signing_key, config.issuer.clone()));
    let storage = Arc::new(MemoryStorage::new());

    let flow = Arc::new(InteractionFlow::new(
        registry.clone(),
        accounts.clone(),
        config.clone(),
        storage.clone(),
        storage.clone(),
        storage.clone(),
    ));
    let tokens = Arc::new(TokenService::new(
        jwt.clone(),
        registry,
        accounts.clone(),
        config.clone(),
        storage.clone(),
        storage.clone(),
        storage.clone(),
        storage.clone(),
        Arc::new(TracingObserver),
    ));

    let app = router(OidcState {
        flow,
        tokens,
        accounts,
        access_tokens: storage,
        jwt,
        config: config.clone(),
    });

    let port: u16 = env::var("OXIDP_PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(3000);
    let addr = format!("0.0.0.0:{port}");

    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(l) => l,
        Err(e) => {
            eprintln!("Failed to bind {addr}: {e}");
            std::process::exit(2);
        }
    };
    tracing::info!(addr = %addr, issuer = %config.issuer, "Authorization server listening");

    if let Err(e) = axum::serve(listener, app).await {
        eprintln!("Server error: {e}");
    }
}

/// Loads the server configuration.
///
/// A JSON file named by `OXIDP_CONFIG` (default `oxidp.json`) supplies
/// the full configuration when present; `OXIDP_ISSUER` overrides the
/// issuer either way. The loaded configuration is validated before the
/// server binds its port.
fn load_config() -> Result<AuthConfig, Box<dyn std::error::Error>> {
    let path = PathBuf::from(env::var("OXIDP_CONFIG").unwrap_or_else(|_| "oxidp.json".to_string()));

    let mut config = if path.exists() {
        let contents = std::fs::read_to_string(&path)?;
        let config: AuthConfig = serde_json::from_str(&contents)?;
        tracing::info!(path = %path.display(), "Configuration loaded");
        config
    } else {
        AuthConfig::default()
    };

    if let Ok(issuer) = env::var("OXIDP_ISSUER") {
        config.issuer = issuer;
    }
    if let Ok(pem) = env::var("OXIDP_SIGNING_KEY_PEM") {
        config.signing.private_key_pem = Some(pem);
    }
    if let Ok(kid) = env::var("OXIDP_SIGNING_KID") {
        config.signing.kid = Some(kid);
    }

    config.validate()?;
    Ok(config)
}

/// Assembles the client descriptor sources in priority order.
fn client_sources() -> ClientSources {
    let fallback = match (
        env::var("OXIDP_CLIENT_ID"),
        env::var("OXIDP_CLIENT_SECRET"),
        env::var("OXIDP_CLIENT_REDIRECT_URI"),
    ) {
        (Ok(client_id), Ok(client_secret), Ok(redirect_uri)) => Some(FallbackClient {
            client_id,
            client_secret,
            redirect_uri,
        }),
        _ => None,
    };

    ClientSources {
        env_json: env::var("OXIDP_CLIENTS").ok(),
        file_path: Some(PathBuf::from(
            env::var("OXIDP_CLIENTS_FILE").unwrap_or_else(|_| "config/clients.json".to_string()),
        )),
        fallback,
    }
}

/// Seeds the account store from `OXIDP_ACCOUNTS` (a JSON array), or
/// with a single development account when unset.
fn load_accounts() -> AccountStore {
    if let Ok(json) = env::var("OXIDP_ACCOUNTS") {
        match serde_json::from_str::<Vec<Account>>(&json) {
            Ok(accounts) => return AccountStore::new(accounts),
            Err(e) => {
                eprintln!("Account configuration error: {e}");
                std::process::exit(2);
            }
        }
    }

    tracing::warn!("OXIDP_ACCOUNTS not set, seeding the development account");
    AccountStore::new(vec![Account {
        id: "dev-user".to_string(),
        email: "dev@example.com".to_string(),
        password: "password".to_string(),
        display_name: "Dev User".to_string(),
        oauth_authorized: true,
    }])
}

/// Builds the token signing key pair: configured PEM when provided,
/// otherwise an ephemeral key generated at startup. Ephemeral keys
/// invalidate outstanding tokens on restart.
fn signing_key(config: &AuthConfig) -> Result<SigningKeyPair, Box<dyn std::error::Error>> {
    match config.signing.private_key_pem {
        Some(ref pem) => {
            let kid = config
                .signing
                .kid
                .clone()
                .unwrap_or_else(|| "oxidp-signing".to_string());
            Ok(SigningKeyPair::from_pem(kid, pem)?)
        }
        None => {
            tracing::warn!("No signing key configured, generating an ephemeral key pair");
            Ok(SigningKeyPair::generate()?)
        }
    }
}
