pub mod analyzer;
pub mod batch;
pub mod cache;
pub mod config;
pub mod error;
pub mod gateway;
pub mod impact;
pub mod monitor;
pub mod ratio;
pub mod resolver;
pub mod slippage;
pub mod types;

pub use analyzer::{MarketCapInfo, PoolAnalyzer, SlippageReport};
pub use config::AnalyzerConfig;
pub use error::AnalyzerError;
pub use gateway::{CachedGateway, DataGateway, OnchainGateway};
pub use slippage::{FeeSchedule, SlippageQuote};
pub use types::{BaseToken, ReserveSnapshot, TokenInfo};
