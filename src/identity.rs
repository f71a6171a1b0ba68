//! Device identity loaded from files at startup.
//!
//! - MAC address files hold a single `aa:bb:cc:dd:ee:ff` line; addresses are
//!   normalized to upper case.
//! - The miner key file holds Erlang terms, one per line:
//!   `{pubkey,"…"}.`, `{onboarding_key,"…"}.`, `{animal_name,"…"}.`
//!
//! [`IdentitySource`] loads everything once, on first use, so that a failure
//! surfaces while the supervisor is building the workers that need it.

use std::fs;
use std::path::{Path, PathBuf};

use once_cell::sync::OnceCell;
use thiserror::Error;

/// Errors raised while loading identity files.
#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("{path} does not contain a MAC address (got {value:?})")]
    MalformedMac { path: PathBuf, value: String },
    #[error("{path} is missing the {key} entry")]
    MissingKey { path: PathBuf, key: &'static str },
}

impl IdentityError {
    pub fn as_label(&self) -> &'static str {
        match self {
            IdentityError::Read { .. } => "identity_read",
            IdentityError::MalformedMac { .. } => "identity_malformed_mac",
            IdentityError::MissingKey { .. } => "identity_missing_key",
        }
    }
}

/// Keys published by the miner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MinerKeys {
    pub pub_key: String,
    pub onboarding_key: String,
    pub animal_name: String,
}

/// Everything the Bluetooth workers need to identify the device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceIdentity {
    pub eth0_mac: String,
    pub wlan0_mac: String,
    pub keys: MinerKeys,
}

pub fn read_eth0_mac_address(path: &Path) -> Result<String, IdentityError> {
    read_mac_address(path)
}

pub fn read_wlan0_mac_address(path: &Path) -> Result<String, IdentityError> {
    read_mac_address(path)
}

fn read_file(path: &Path) -> Result<String, IdentityError> {
    fs::read_to_string(path).map_err(|source| IdentityError::Read {
        path: path.to_path_buf(),
        source,
    })
}

fn read_mac_address(path: &Path) -> Result<String, IdentityError> {
    let raw = read_file(path)?;
    let value = raw.trim();
    if is_mac(value) {
        Ok(value.to_ascii_uppercase())
    } else {
        Err(IdentityError::MalformedMac {
            path: path.to_path_buf(),
            value: value.to_string(),
        })
    }
}

fn is_mac(value: &str) -> bool {
    let octets: Vec<&str> = value.split(':').collect();
    octets.len() == 6
        && octets
            .iter()
            .all(|o| o.len() == 2 && o.chars().all(|c| c.is_ascii_hexdigit()))
}

/// Parses one `{key,"value"}.` term.
fn parse_term(line: &str) -> Option<(&str, &str)> {
    let body = line.trim().strip_prefix('{')?.strip_suffix('.')?.trim_end();
    let body = body.strip_suffix('}')?;
    let (key, value) = body.split_once(',')?;
    Some((key.trim(), value.trim().trim_matches('"')))
}

pub fn read_miner_keys(path: &Path) -> Result<MinerKeys, IdentityError> {
    let raw = read_file(path)?;

    let mut pub_key = None;
    let mut onboarding_key = None;
    let mut animal_name = None;
    for (key, value) in raw.lines().filter_map(parse_term) {
        match key {
            "pubkey" => pub_key = Some(value.to_string()),
            "onboarding_key" => onboarding_key = Some(value.to_string()),
            "animal_name" => animal_name = Some(value.to_string()),
            _ => {}
        }
    }

    let missing = |key| IdentityError::MissingKey {
        path: path.to_path_buf(),
        key,
    };
    Ok(MinerKeys {
        pub_key: pub_key.ok_or_else(|| missing("pubkey"))?,
        onboarding_key: onboarding_key.ok_or_else(|| missing("onboarding_key"))?,
        animal_name: animal_name.ok_or_else(|| missing("animal_name"))?,
    })
}

/// Lazily loaded, cached device identity.
#[derive(Debug)]
pub struct IdentitySource {
    eth0_mac_path: PathBuf,
    wlan0_mac_path: PathBuf,
    miner_keys_path: PathBuf,
    loaded: OnceCell<DeviceIdentity>,
}

impl IdentitySource {
    pub fn new(
        eth0_mac_path: impl Into<PathBuf>,
        wlan0_mac_path: impl Into<PathBuf>,
        miner_keys_path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            eth0_mac_path: eth0_mac_path.into(),
            wlan0_mac_path: wlan0_mac_path.into(),
            miner_keys_path: miner_keys_path.into(),
            loaded: OnceCell::new(),
        }
    }

    /// Loads all files on the first call; later calls return the cached identity.
    /// A failed load is retried on the next call.
    pub fn load(&self) -> Result<&DeviceIdentity, IdentityError> {
        self.loaded.get_or_try_init(|| {
            let eth0_mac = read_eth0_mac_address(&self.eth0_mac_path)?;
            let wlan0_mac = read_wlan0_mac_address(&self.wlan0_mac_path)?;
            tracing::debug!(%eth0_mac, %wlan0_mac, "read mac addresses");
            let keys = read_miner_keys(&self.miner_keys_path)?;
            tracing::debug!(pub_key = %keys.pub_key, animal_name = %keys.animal_name, "read miner keys");
            Ok(DeviceIdentity {
                eth0_mac,
                wlan0_mac,
                keys,
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const KEYS: &str = "{pubkey,\"112abc\"}.\n{onboarding_key,\"112def\"}.\n{animal_name,\"angry-purple-tiger\"}.\n";

    fn write(dir: &TempDir, name: &str, contents: &str) -> PathBuf {
        let path = dir.path().join(name);
        fs::write(&path, contents).expect("write fixture");
        path
    }

    #[test]
    fn mac_is_trimmed_and_uppercased() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = write(&dir, "address", "dc:a6:32:0a:1b:2c\n");
        assert_eq!(read_eth0_mac_address(&path).expect("mac"), "DC:A6:32:0A:1B:2C");
    }

    #[test]
    fn malformed_mac_is_rejected() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = write(&dir, "address", "dc:a6:32:0a:1b\n");
        let err = read_wlan0_mac_address(&path).expect_err("malformed");
        assert!(matches!(err, IdentityError::MalformedMac { .. }));
    }

    #[test]
    fn missing_file_is_a_read_error() {
        let err = read_eth0_mac_address(Path::new("/nonexistent/address")).expect_err("missing");
        assert!(matches!(err, IdentityError::Read { .. }));
    }

    #[test]
    fn miner_keys_are_parsed() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = write(&dir, "public_keys", KEYS);
        let keys = read_miner_keys(&path).expect("keys");
        assert_eq!(
            keys,
            MinerKeys {
                pub_key: "112abc".into(),
                onboarding_key: "112def".into(),
                animal_name: "angry-purple-tiger".into(),
            }
        );
    }

    #[test]
    fn missing_key_is_reported_by_name() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = write(&dir, "public_keys", "{pubkey,\"112abc\"}.\n");
        let err = read_miner_keys(&path).expect_err("incomplete");
        assert!(matches!(err, IdentityError::MissingKey { key: "onboarding_key", .. }));
    }

    #[test]
    fn source_caches_after_first_load() {
        let dir = tempfile::tempdir().expect("tempdir");
        let eth0 = write(&dir, "eth0", "00:11:22:33:44:55");
        let wlan0 = write(&dir, "wlan0", "66:77:88:99:aa:bb");
        let keys = write(&dir, "keys", KEYS);
        let source = IdentitySource::new(&eth0, &wlan0, &keys);

        let first = source.load().expect("load").clone();
        fs::remove_file(&keys).expect("remove");
        let second = source.load().expect("cached");
        assert_eq!(&first, second);
        assert_eq!(second.wlan0_mac, "66:77:88:99:AA:BB");
    }
}
