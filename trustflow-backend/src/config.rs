use ethers::core::k256::ecdsa::SigningKey;
use ethers::signers::{LocalWallet, Signer};
use std::env;
use std::time::Duration;

/// Environment variable names - single source of truth
pub mod env_vars {
    pub const PORT: &str = "PORT";
    pub const DATABASE_URL: &str = "DATABASE_URL";
    pub const RPC_URL: &str = "RPC_URL";
    pub const PRIVATE_KEY: &str = "PRIVATE_KEY";
    // Pause between sequential steps of one intent (0 = no pause)
    pub const SETTLEMENT_DELAY_MS: &str = "SETTLEMENT_DELAY_MS";
    // Upper bound on one intent's processing time
    pub const INTENT_TIMEOUT_SECS: &str = "INTENT_TIMEOUT_SECS";
}

/// Default values
pub mod defaults {
    pub const PORT: u16 = 8081;
    pub const DATABASE_URL: &str = "./.db/trustflow.db";
    pub const SETTLEMENT_DELAY_MS: u64 = 5_000;
    pub const INTENT_TIMEOUT_SECS: u64 = 120;
}

/// Build a signing wallet from a hex private key (with or without 0x prefix)
pub fn wallet_from_private_key(private_key: &str) -> Result<LocalWallet, String> {
    let key_hex = private_key.trim().strip_prefix("0x").unwrap_or(private_key.trim());
    let key_bytes = hex::decode(key_hex)
        .map_err(|e| format!("Invalid private key hex: {}", e))?;

    if key_bytes.len() != 32 {
        return Err(format!("Invalid private key: expected 32 bytes, got {}", key_bytes.len()));
    }

    let signing_key = SigningKey::from_bytes(key_bytes.as_slice().into())
        .map_err(|e| format!("Invalid private key: {}", e))?;

    Ok(LocalWallet::from(signing_key))
}

/// Derive the public address from a private key
pub fn derive_address_from_private_key(private_key: &str) -> Result<String, String> {
    let wallet = wallet_from_private_key(private_key)?;
    Ok(format!("{:?}", wallet.address()).to_lowercase())
}

fn parse_or_default<T: std::str::FromStr>(var: &str, default: T) -> Result<T, String> {
    match env::var(var) {
        Ok(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse()
            .map_err(|_| format!("{} must be a valid number, got '{}'", var, raw)),
        _ => Ok(default),
    }
}

#[derive(Clone)]
pub struct Config {
    pub port: u16,
    pub database_url: String,
    pub rpc_url: String,
    pub private_key: String,
    pub settlement_delay: Duration,
    pub intent_timeout: Duration,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("port", &self.port)
            .field("database_url", &self.database_url)
            .field("rpc_url", &self.rpc_url)
            .field("private_key", &"<redacted>")
            .field("settlement_delay", &self.settlement_delay)
            .field("intent_timeout", &self.intent_timeout)
            .finish()
    }
}

impl Config {
    /// Load configuration from the process environment.
    ///
    /// `RPC_URL` and `PRIVATE_KEY` are required; everything else falls back to `defaults`.
    pub fn from_env() -> Result<Self, String> {
        let rpc_url = env::var(env_vars::RPC_URL)
            .ok()
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| format!("{} not set", env_vars::RPC_URL))?;

        let private_key = env::var(env_vars::PRIVATE_KEY)
            .ok()
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| format!("{} not set", env_vars::PRIVATE_KEY))?;

        // Fail fast on a malformed key instead of at the first broadcast
        derive_address_from_private_key(&private_key)?;

        Ok(Self {
            port: parse_or_default(env_vars::PORT, defaults::PORT)?,
            database_url: env::var(env_vars::DATABASE_URL)
                .unwrap_or_else(|_| defaults::DATABASE_URL.to_string()),
            rpc_url,
            private_key,
            settlement_delay: Duration::from_millis(parse_or_default(
                env_vars::SETTLEMENT_DELAY_MS,
                defaults::SETTLEMENT_DELAY_MS,
            )?),
            intent_timeout: Duration::from_secs(parse_or_default(
                env_vars::INTENT_TIMEOUT_SECS,
                defaults::INTENT_TIMEOUT_SECS,
            )?),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Hardhat account #0 (DO NOT USE IN PRODUCTION)
    const TEST_KEY: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

    #[test]
    fn test_derive_address() {
        assert_eq!(
            derive_address_from_private_key(TEST_KEY).unwrap(),
            "0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266"
        );
    }

    #[test]
    fn test_derive_address_no_prefix() {
        let key = TEST_KEY.trim_start_matches("0x");
        assert_eq!(
            derive_address_from_private_key(key).unwrap(),
            "0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266"
        );
    }

    #[test]
    fn test_rejects_short_key() {
        let err = wallet_from_private_key("0xdeadbeef").unwrap_err();
        assert!(err.contains("expected 32 bytes"));
    }

    #[test]
    fn test_debug_redacts_private_key() {
        let config = Config {
            port: defaults::PORT,
            database_url: defaults::DATABASE_URL.to_string(),
            rpc_url: "http://localhost:8545".to_string(),
            private_key: TEST_KEY.to_string(),
            settlement_delay: Duration::from_millis(defaults::SETTLEMENT_DELAY_MS),
            intent_timeout: Duration::from_secs(defaults::INTENT_TIMEOUT_SECS),
        };
        let rendered = format!("{:?}", config);
        assert!(!rendered.contains("ac0974bec39a"));
        assert!(rendered.contains("<redacted>"));
    }
}
