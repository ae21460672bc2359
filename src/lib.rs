// Library crate - exports the alert pipeline and gateway types

pub mod alert;
pub mod config;
pub mod gateway;
pub mod kraken;
pub mod order;
pub mod server;
pub mod signature;

// Re-export commonly used types
pub use alert::{Alert, AlertPayload, OrderSide, OrderType, ValidationError};
pub use config::{AppConfig, Environment};
pub use gateway::{TradeGateway, TradeOutcome};
pub use kraken::KrakenExecutor;
pub use order::OrderCommand;
pub use server::{AppState, SIGNATURE_HEADER};
