pub mod config_service;
pub mod dev_wallet;
pub mod http_name_resolver;
pub mod memory_network;
pub mod paths;

pub use crate::config_service::ConfigService;
pub use crate::dev_wallet::DevWallet;
pub use crate::http_name_resolver::HttpNameResolver;
pub use crate::memory_network::MemoryNetwork;
pub use crate::paths::ChatPaths;
