//! Operator configuration
//!
//! Read from a camelCase JSON file:
//!
//! ```json
//! {
//!   "mode": "dev",
//!   "rpc": { "mainnet": "...", "devnet": "...", "local": "http://127.0.0.1:8899" },
//!   "mainnetAccount": { "public": "...", "private": "<base58 secret key>" },
//!   "devnetAccount": { "public": "...", "private": "<base58 secret key>" },
//!   "squads": { "members": ["..."], "threshold": 2 },
//!   "buddyLink": { "orgName": "staratlas", "memberName": "myguild" }
//! }
//! ```

use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use solana_sdk::{pubkey::Pubkey, signature::Keypair, signer::Signer};

use crate::error::{SquadsError, SquadsResult};

/// Lamports sent to the vault before it executes the membership creation
pub const DEFAULT_VAULT_FUNDING_LAMPORTS: u64 = 100_000_000;

/// Cluster the tooling runs against
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[serde(alias = "prod")]
    Production,
    #[serde(alias = "dev")]
    Development,
    /// A local validator with the mainnet programs cloned in
    Local,
}

impl Environment {
    pub fn rpc_url<'a>(&self, rpc: &'a RpcEndpoints) -> &'a str {
        match self {
            Environment::Production => &rpc.mainnet,
            Environment::Development => &rpc.devnet,
            Environment::Local => &rpc.local,
        }
    }

    pub fn is_local(&self) -> bool {
        matches!(self, Environment::Local)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcEndpoints {
    pub mainnet: String,
    pub devnet: String,
    pub local: String,
}

/// A wallet given as base58 public key and base58 secret key
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AccountConfig {
    #[serde(default)]
    pub public: String,
    #[serde(default)]
    pub private: String,
}

impl AccountConfig {
    /// Decode the secret key, checking it against `public` when that is set
    pub fn keypair(&self) -> SquadsResult<Keypair> {
        let keypair = keypair_from_base58(&self.private)?;
        if !self.public.is_empty() && keypair.pubkey().to_string() != self.public {
            return Err(SquadsError::Config(format!(
                "secret key does not belong to {}",
                self.public
            )));
        }
        Ok(keypair)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SquadConfig {
    /// Base58 secret key of the create key, generated when absent
    #[serde(default)]
    pub create_key: Option<String>,
    /// Members besides the creator
    pub members: Vec<String>,
    /// Threshold the multisig ends up with after bootstrap
    pub threshold: u16,
    /// Leave the creator with the initiate permission only
    #[serde(default)]
    pub downgrade_creator: bool,
    #[serde(default = "default_vault_funding")]
    pub vault_funding_lamports: u64,
}

fn default_vault_funding() -> u64 {
    DEFAULT_VAULT_FUNDING_LAMPORTS
}

impl SquadConfig {
    pub fn member_keys(&self) -> SquadsResult<Vec<Pubkey>> {
        self.members
            .iter()
            .map(|key| {
                Pubkey::from_str(key)
                    .map_err(|_| SquadsError::Config(format!("invalid member key {}", key)))
            })
            .collect()
    }

    pub fn create_keypair(&self) -> SquadsResult<Option<Keypair>> {
        self.create_key
            .as_deref()
            .map(keypair_from_base58)
            .transpose()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuddyLinkConfig {
    pub org_name: String,
    pub member_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Configuration {
    pub mode: Environment,
    pub rpc: RpcEndpoints,
    #[serde(default)]
    pub mainnet_account: AccountConfig,
    #[serde(default)]
    pub devnet_account: AccountConfig,
    pub squads: SquadConfig,
    pub buddy_link: BuddyLinkConfig,
}

impl Configuration {
    pub fn load(path: impl AsRef<Path>) -> SquadsResult<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .map_err(|err| SquadsError::Config(format!("{}: {}", path.display(), err)))?;
        Self::from_json(&json)
    }

    pub fn from_json(json: &str) -> SquadsResult<Self> {
        serde_json::from_str(json).map_err(|err| SquadsError::Config(err.to_string()))
    }

    pub fn rpc_url(&self) -> &str {
        self.mode.rpc_url(&self.rpc)
    }

    /// Creator and fee payer for the configured environment
    ///
    /// Locally the devnet account is used when it has a secret key, otherwise
    /// a fresh keypair (to be funded by airdrop).
    pub fn creator_keypair(&self) -> SquadsResult<Keypair> {
        match self.mode {
            Environment::Production => self.mainnet_account.keypair(),
            Environment::Development => self.devnet_account.keypair(),
            Environment::Local if self.devnet_account.private.is_empty() => Ok(Keypair::new()),
            Environment::Local => self.devnet_account.keypair(),
        }
    }
}

/// Decode a base58 encoded 64-byte secret key
pub fn keypair_from_base58(secret: &str) -> SquadsResult<Keypair> {
    let bytes = bs58::decode(secret)
        .into_vec()
        .map_err(|err| SquadsError::Config(format!("invalid base58 secret key: {}", err)))?;
    Keypair::try_from(bytes.as_slice())
        .map_err(|err| SquadsError::Config(format!("invalid secret key: {}", err)))
}
