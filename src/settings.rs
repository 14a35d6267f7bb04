//! Persisted identifiers of a bootstrapped multisig
//!
//! Written once after a successful bootstrap; its presence on later runs
//! means the multisig exists and only the rewards flow runs.

use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use solana_sdk::pubkey::Pubkey;

use crate::error::{SquadsError, SquadsResult};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    pub create_key: String,
    pub multisig_pda: String,
    pub vault_pda: String,
}

impl Settings {
    pub fn new(create_key: &Pubkey, multisig: &Pubkey, vault: &Pubkey) -> Self {
        Self {
            create_key: create_key.to_string(),
            multisig_pda: multisig.to_string(),
            vault_pda: vault.to_string(),
        }
    }

    pub fn multisig(&self) -> SquadsResult<Pubkey> {
        parse_key("multisigPda", &self.multisig_pda)
    }

    pub fn vault(&self) -> SquadsResult<Pubkey> {
        parse_key("vaultPda", &self.vault_pda)
    }
}

fn parse_key(field: &str, value: &str) -> SquadsResult<Pubkey> {
    Pubkey::from_str(value)
        .map_err(|_| SquadsError::Settings(format!("{} is not a valid address: {}", field, value)))
}

/// Load/save access to the settings record
pub trait SettingsStore {
    /// `None` when nothing was saved yet
    fn load(&self) -> SquadsResult<Option<Settings>>;

    fn save(&self, settings: &Settings) -> SquadsResult<()>;
}

/// Settings kept in a pretty-printed JSON file
#[derive(Debug, Clone)]
pub struct JsonSettingsStore {
    path: PathBuf,
}

impl JsonSettingsStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SettingsStore for JsonSettingsStore {
    fn load(&self) -> SquadsResult<Option<Settings>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let json = std::fs::read_to_string(&self.path)
            .map_err(|err| SquadsError::Settings(format!("{}: {}", self.path.display(), err)))?;
        let settings =
            serde_json::from_str(&json).map_err(|err| SquadsError::Settings(err.to_string()))?;
        Ok(Some(settings))
    }

    fn save(&self, settings: &Settings) -> SquadsResult<()> {
        let json = serde_json::to_string_pretty(settings)
            .map_err(|err| SquadsError::Settings(err.to_string()))?;
        std::fs::write(&self.path, json)
            .map_err(|err| SquadsError::Settings(format!("{}: {}", self.path.display(), err)))
    }
}
