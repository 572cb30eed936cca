//! The configuration tree recognized by the core (§6). Loaded by the
//! `config` crate at the daemon's edge and deserialized here; unknown keys
//! in a recognized section are rejected (`deny_unknown_fields`) rather than
//! silently ignored, per §6/§7.

use serde::Deserialize;
use std::collections::{HashMap, HashSet};
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CsPolicyKind {
    PriorityFifo,
    Lru,
}

impl Default for CsPolicyKind {
    fn default() -> Self {
        CsPolicyKind::PriorityFifo
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum UnsolicitedDataPolicyKind {
    DropAll,
    AdmitLocal,
    AdmitNetwork,
    AdmitAll,
}

impl Default for UnsolicitedDataPolicyKind {
    fn default() -> Self {
        UnsolicitedDataPolicyKind::DropAll
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct TablesConfig {
    pub cs_max_packets: usize,
    pub cs_policy: CsPolicyKind,
    pub cs_unsolicited_policy: UnsolicitedDataPolicyKind,
    pub strategy_choice: HashMap<String, String>,
    pub network_region: HashSet<String>,
}

impl Default for TablesConfig {
    fn default() -> Self {
        Self {
            cs_max_packets: 4096,
            cs_policy: CsPolicyKind::default(),
            cs_unsolicited_policy: UnsolicitedDataPolicyKind::default(),
            strategy_choice: HashMap::new(),
            network_region: HashSet::new(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct FaceSystemEntryConfig {
    pub mtu: usize,
    pub multicast_group: Option<String>,
    pub default_idle_period_ms: u64,
    /// Address the QUIC listener for this face-system entry binds to.
    /// `None` means this entry is dial-only (used for `face-create` RPCs),
    /// not a standing listener.
    pub listen_addr: Option<String>,
    pub cert_path: Option<String>,
    pub key_path: Option<String>,
}

impl Default for FaceSystemEntryConfig {
    fn default() -> Self {
        Self {
            mtu: 1400,
            multicast_group: None,
            default_idle_period_ms: 100,
            listen_addr: None,
            cert_path: None,
            key_path: None,
        }
    }
}

impl FaceSystemEntryConfig {
    pub fn default_idle_period(&self) -> Duration {
        Duration::from_millis(self.default_idle_period_ms)
    }
}

/// Control-channel settings for the management dispatcher (§5's "separate
/// management dispatcher" task). Not a core concern — the core only sees
/// the `ManagementRequest`s the dispatcher posts to it — but the daemon
/// needs somewhere to read the socket path from.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct ManagementConfig {
    pub socket_path: String,
}

impl Default for ManagementConfig {
    fn default() -> Self {
        Self { socket_path: "/tmp/ndnfd.sock".to_string() }
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct NdnfdConfig {
    #[serde(default)]
    pub tables: TablesConfig,
    #[serde(default)]
    pub face_system: HashMap<String, FaceSystemEntryConfig>,
    #[serde(default)]
    pub management: ManagementConfig,
}

impl NdnfdConfig {
    /// Load and validate a configuration tree from a TOML file, layered over
    /// built-in defaults. Any recognized section with an unknown key is a
    /// fatal load error (§6, §7) — the daemon does not apply partial config.
    pub fn load(path: &str) -> Result<Self, config::ConfigError> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path))
            .build()?;
        settings.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_teacher_constants() {
        let tables = TablesConfig::default();
        assert_eq!(tables.cs_max_packets, 4096);
        assert_eq!(tables.cs_policy, CsPolicyKind::PriorityFifo);
    }

    #[test]
    fn rejects_unknown_keys() {
        let toml = "[tables]\ncs_max_packets = 10\nbogus_key = 1\n";
        let settings = config::Config::builder()
            .add_source(config::File::from_str(toml, config::FileFormat::Toml))
            .build()
            .unwrap();
        let result: Result<NdnfdConfig, _> = settings.try_deserialize();
        assert!(result.is_err());
    }
}
