use std::{
    collections::{HashMap, HashSet},
    fmt::{self, Display},
    path::Path,
    time::Duration,
};

use figment::{
    Figment,
    providers::{Env, Format, Yaml},
};
use num_bigint::BigUint;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{coin, plan::MergePolicy};

pub const DEFAULT_CONFIG_PATH: &str = "crank.yaml";

const DEFAULT_SLIPPAGE: &str = "0.01";
const DEFAULT_SHUTDOWN_GRACE: Duration = Duration::from_secs(25);

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} not found in configuration")]
    Missing(String),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    Mainnet,
    Testnet,
}

impl Network {
    pub fn chain_id(&self) -> &'static str {
        match self {
            Network::Mainnet => "kaiyo-1",
            Network::Testnet => "harpoon-4",
        }
    }

    pub fn default_route_provider_url(&self) -> String {
        match self {
            Network::Mainnet => "https://api.mantaswap.app".to_string(),
            Network::Testnet => format!("https://api.mantaswap.app/{}", self.chain_id()),
        }
    }
}

impl Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.chain_id())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub network: Network,

    pub chain: ChainConfig,

    #[serde(default)]
    pub route_provider: RouteProviderConfig,

    /// Hex secp256k1 key used to attest unification plans.
    #[serde(default)]
    pub oracle_key: Option<Secret>,

    /// Addresses to run. Every registered contract when absent.
    #[serde(default)]
    pub enabled: Option<Vec<String>>,

    /// Managed contracts, keyed by chain id.
    pub registry: HashMap<String, Registry>,

    #[serde(default)]
    pub policy: PolicyConfig,

    #[serde(default = "default_shutdown_grace", with = "duration")]
    pub shutdown_grace: Duration,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainConfig {
    /// REST endpoint used for smart contract queries
    pub rest_url: String,

    /// Signing and broadcast relay
    pub signer_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouteProviderConfig {
    #[serde(default)]
    pub url: Option<String>,

    #[serde(default = "default_slippage")]
    pub slippage: String,
}

impl Default for RouteProviderConfig {
    fn default() -> Self {
        Self {
            url: None,
            slippage: default_slippage(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Registry {
    #[serde(default)]
    pub hubs: Vec<HubConfig>,

    #[serde(default)]
    pub unifiers: Vec<UnifierConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HubConfig {
    pub address: String,
    #[serde(with = "duration")]
    pub interval: Duration,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnifierConfig {
    pub address: String,
    /// Denom every other balance is converted into
    pub target: String,
    #[serde(with = "duration")]
    pub interval: Duration,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyConfig {
    /// Decimal precision per denom, 6 when absent
    #[serde(default)]
    pub decimals: HashMap<String, u32>,

    /// Explicit minimum swap amounts in raw units
    #[serde(default, with = "amount_map")]
    pub min_overrides: HashMap<String, BigUint>,

    #[serde(default)]
    pub denylist: HashSet<String>,

    /// Restrict inputs to the route provider's whitelist
    #[serde(default = "default_true")]
    pub use_allowlist: bool,

    /// Static single-hop routes keyed by input denom
    #[serde(default)]
    pub overrides: HashMap<String, RouteOverride>,

    #[serde(default)]
    pub merge: MergePolicy,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            decimals: HashMap::new(),
            min_overrides: HashMap::new(),
            denylist: HashSet::new(),
            use_allowlist: true,
            overrides: HashMap::new(),
            merge: MergePolicy::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteOverride {
    /// Pool executing the swap
    pub address: String,
    /// Denom produced by the pool
    pub output: String,
    #[serde(default, with = "coin::amount::option")]
    pub max_swap_amount: Option<BigUint>,
    /// Only applies to this contract when set
    #[serde(default)]
    pub only_for: Option<String>,
}

impl RouteOverride {
    pub fn applies_to(&self, contract: &str) -> bool {
        self.only_for.as_deref().is_none_or(|only| only == contract)
    }
}

/// A string that is never printed.
#[derive(Clone, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Secret(String);

impl Secret {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Secret(..)")
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContractKind {
    /// Reward distribution, cranked with an empty payload
    Hub,
    /// Balance unification into `target`
    Unifier { target: String },
}

impl ContractKind {
    pub fn name(&self) -> &'static str {
        match self {
            ContractKind::Hub => "hub",
            ContractKind::Unifier { .. } => "unifier",
        }
    }
}

impl Display for ContractKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A managed contract resolved from the registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Contract {
    pub address: String,
    pub kind: ContractKind,
    pub interval: Duration,
    /// Signing account index; 0 is the orchestrator.
    pub account: u32,
}

impl Display for Contract {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind, self.address)
    }
}

impl Config {
    /// Load configuration from `path` and `CRANK_` prefixed environment variables.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, figment::Error> {
        Self::figment(path).extract()
    }

    pub fn figment(path: impl AsRef<Path>) -> Figment {
        Figment::new()
            .merge(Yaml::file(path.as_ref()))
            .merge(Env::prefixed("CRANK_").split("__"))
    }

    pub fn route_provider_url(&self) -> String {
        self.route_provider
            .url
            .clone()
            .unwrap_or_else(|| self.network.default_route_provider_url())
    }

    pub fn registry(&self) -> Result<&Registry, ConfigError> {
        let chain_id = self.network.chain_id();
        self.registry
            .get(chain_id)
            .ok_or_else(|| ConfigError::Missing(format!("registry for {chain_id}")))
    }

    /// Every registered contract for the configured network, unifiers first.
    ///
    /// Account indices are assigned by registry position so they do not shift
    /// when `enabled` selects a subset.
    pub fn all_contracts(&self) -> Result<Vec<Contract>, ConfigError> {
        let registry = self.registry()?;

        let unifiers = registry.unifiers.iter().map(|u| {
            (
                u.address.clone(),
                ContractKind::Unifier {
                    target: u.target.clone(),
                },
                u.interval,
            )
        });
        let hubs = registry
            .hubs
            .iter()
            .map(|h| (h.address.clone(), ContractKind::Hub, h.interval));

        let mut seen = HashSet::new();
        unifiers
            .chain(hubs)
            .enumerate()
            .map(|(idx, (address, kind, interval))| {
                if !seen.insert(address.clone()) {
                    return Err(ConfigError::Invalid(format!(
                        "contract {address} registered twice"
                    )));
                }
                if interval.is_zero() {
                    return Err(ConfigError::Invalid(format!(
                        "contract {address} has a zero interval"
                    )));
                }
                let account = u32::try_from(idx + 1)
                    .map_err(|_| ConfigError::Invalid("too many contracts".into()))?;
                Ok(Contract {
                    address,
                    kind,
                    interval,
                    account,
                })
            })
            .collect()
    }

    /// The contracts selected by `enabled`, in `enabled` order.
    pub fn contracts(&self) -> Result<Vec<Contract>, ConfigError> {
        let all = self.all_contracts()?;
        let Some(enabled) = &self.enabled else {
            return Ok(all);
        };

        enabled
            .iter()
            .map(|address| find(&all, address))
            .collect()
    }

    pub fn contract(&self, address: &str) -> Result<Contract, ConfigError> {
        find(&self.all_contracts()?, address)
    }
}

fn find(contracts: &[Contract], address: &str) -> Result<Contract, ConfigError> {
    contracts
        .iter()
        .find(|c| c.address == address)
        .cloned()
        .ok_or_else(|| ConfigError::Missing(format!("contract {address}")))
}

fn default_slippage() -> String {
    DEFAULT_SLIPPAGE.to_string()
}

fn default_shutdown_grace() -> Duration {
    DEFAULT_SHUTDOWN_GRACE
}

fn default_true() -> bool {
    true
}

/// Durations written as `humantime` strings, e.g. `"24h"` or `"9m 13s"`.
mod duration {
    use std::time::Duration;

    use serde::{Deserialize as _, Deserializer, Serializer, de};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&humantime::format_duration(*value))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let raw = String::deserialize(deserializer)?;
        humantime::parse_duration(&raw).map_err(de::Error::custom)
    }
}

mod amount_map {
    use std::{collections::HashMap, str::FromStr as _};

    use num_bigint::BigUint;
    use serde::{Deserialize as _, Deserializer, Serializer, de, ser::SerializeMap as _};

    pub fn serialize<S: Serializer>(
        value: &HashMap<String, BigUint>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(value.len()))?;
        for (denom, amount) in value {
            map.serialize_entry(denom, &amount.to_str_radix(10))?;
        }
        map.end()
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<HashMap<String, BigUint>, D::Error> {
        HashMap::<String, String>::deserialize(deserializer)?
            .into_iter()
            .map(|(denom, raw)| {
                let amount = BigUint::from_str(&raw)
                    .map_err(|e| de::Error::custom(format!("invalid amount for {denom}: {e}")))?;
                Ok((denom, amount))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
network: testnet
chain:
  rest_url: http://localhost:1317
  signer_url: http://localhost:8080
oracle_key: "0101010101010101010101010101010101010101010101010101010101010101"
registry:
  harpoon-4:
    hubs:
      - address: hub1
        interval: 1m
    unifiers:
      - address: unifier1
        target: ukuji
        interval: 9m 13s
policy:
  min_overrides:
    uroar: "100000000000"
  denylist: [uscam]
  overrides:
    uplnk:
      address: pool-plnk
      output: uusk
      max_swap_amount: "1000000000"
"#;

    fn sample() -> Config {
        Figment::from(Yaml::string(SAMPLE))
            .extract()
            .expect("sample config should parse")
    }

    #[test]
    fn parses_registry_and_policy() {
        let cfg = sample();
        assert_eq!(cfg.network, Network::Testnet);
        assert_eq!(cfg.route_provider.slippage, "0.01");
        assert_eq!(cfg.shutdown_grace, Duration::from_secs(25));
        assert!(cfg.policy.use_allowlist);
        assert_eq!(
            cfg.policy.min_overrides["uroar"],
            BigUint::from(100_000_000_000u64)
        );
        assert_eq!(
            cfg.policy.overrides["uplnk"].max_swap_amount,
            Some(BigUint::from(1_000_000_000u64))
        );
    }

    #[test]
    fn unifiers_come_first_with_accounts_from_one() {
        let contracts = sample().contracts().unwrap();
        assert_eq!(contracts.len(), 2);
        assert_eq!(contracts[0].address, "unifier1");
        assert_eq!(contracts[0].account, 1);
        assert_eq!(contracts[0].interval, Duration::from_secs(553));
        assert_eq!(contracts[1].kind, ContractKind::Hub);
        assert_eq!(contracts[1].account, 2);
    }

    #[test]
    fn enabled_subset_keeps_account_indices() {
        let mut cfg = sample();
        cfg.enabled = Some(vec!["hub1".into()]);
        let contracts = cfg.contracts().unwrap();
        assert_eq!(contracts.len(), 1);
        assert_eq!(contracts[0].account, 2);
    }

    #[test]
    fn unknown_enabled_address_is_missing() {
        let mut cfg = sample();
        cfg.enabled = Some(vec!["nope".into()]);
        assert!(matches!(cfg.contracts(), Err(ConfigError::Missing(_))));
    }

    #[test]
    fn registry_for_other_network_is_missing() {
        let mut cfg = sample();
        cfg.network = Network::Mainnet;
        assert!(matches!(cfg.all_contracts(), Err(ConfigError::Missing(_))));
    }

    #[test]
    fn route_provider_url_defaults_per_network() {
        let cfg = sample();
        assert_eq!(
            cfg.route_provider_url(),
            "https://api.mantaswap.app/harpoon-4"
        );
    }

    #[test]
    fn secret_is_redacted() {
        let cfg = sample();
        let printed = format!("{cfg:?}");
        assert!(!printed.contains("0101010101"));
    }

    #[test]
    fn example_config_parses() {
        let cfg: Config = Figment::from(Yaml::string(include_str!("../../../crank.example.yaml")))
            .extract()
            .unwrap();
        assert_eq!(cfg.network, Network::Mainnet);
        assert_eq!(cfg.policy.merge, MergePolicy::LastWins);
        assert_eq!(cfg.shutdown_grace, Duration::from_secs(25));

        let contracts = cfg.contracts().unwrap();
        assert_eq!(contracts.len(), 3);
        assert!(matches!(contracts[0].kind, ContractKind::Unifier { .. }));
        assert_eq!(contracts[0].interval, Duration::from_secs(33_200));
        assert_eq!(contracts[1].interval, Duration::from_secs(86_400));
    }

    #[test]
    fn override_scope() {
        let scoped = RouteOverride {
            address: "pool".into(),
            output: "uaqla".into(),
            max_swap_amount: None,
            only_for: Some("unifier1".into()),
        };
        assert!(scoped.applies_to("unifier1"));
        assert!(!scoped.applies_to("unifier2"));
    }
}
