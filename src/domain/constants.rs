//! Network defaults for the Moksha testnet.

pub const DEFAULT_RPC_URL: &str = "https://rpc.moksha.vana.org";
pub const DEFAULT_CHAIN_ID: u64 = 14800;
pub const DEFAULT_EXPLORER_URL: &str = "https://moksha.vanascan.io";
pub const DEFAULT_FAUCET_URL: &str = "https://faucet.vana.org";

pub const DLP_REGISTRY_ADDRESS: &str = "0x4D59880a924526d1dD33260552Ff4328b1E18a43";
pub const DATA_REFINER_REGISTRY_ADDRESS: &str = "0x93c3EF89369fDcf08Be159D9DeF0F18AB6Be008c";
pub const DATA_REGISTRY_ADDRESS: &str = "0x8C8788f98385F6ba1adD4234e551ABba0f82Cb7C";

/// 1 VANA.
pub const REGISTRATION_FEE_WEI: u128 = 1_000_000_000_000_000_000;
/// Headroom on top of the registration fee for gas.
pub const GAS_MARGIN_WEI: u128 = 50_000_000_000_000_000;

pub const PINATA_API_URL: &str = "https://api.pinata.cloud";
pub const IPFS_GATEWAY: &str = "https://gateway.pinata.cloud";
pub const GITHUB_API_URL: &str = "https://api.github.com";

pub const STATE_FILE: &str = "deployment.json";
pub const CONFIG_FILE: &str = "datadao.toml";

pub const DEFAULT_DLP_NAME: &str = "MyDataDAO";
pub const DEFAULT_TOKEN_SYMBOL: &str = "MDAO";
pub const DEFAULT_NEXTAUTH_URL: &str = "http://localhost:3000";
