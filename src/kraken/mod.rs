//! Kraken Exchange Integration
//!
//! This module provides the live [`TradeGateway`](crate::gateway::TradeGateway)
//! implementation for the Kraken REST API.
//!
//! # Components
//!
//! - [`client`] - HTTP client with private-endpoint request signing
//! - [`models`] - Response envelope and result types
//! - [`executor`] - Lazily-initialized gateway with failure cooldown
//!
//! # Environment Variables
//!
//! - `KRAKEN_API_KEY` - Kraken API key
//! - `KRAKEN_API_SECRET` - Kraken API secret (base64, as issued)
//!
//! # API Endpoints Used
//!
//! - `GET /0/public/Time` - Connectivity check during initialization
//! - `POST /0/private/AddOrder` - Order submission and dry-run validation
//! - `POST /0/private/Balance` - Account balances
//! - `POST /0/private/OpenOrders` - Open order listing

pub mod client;
pub mod executor;
pub mod models;

// Re-export commonly used types
pub use client::{KrakenClient, DEFAULT_BASE_URL};
pub use executor::{KrakenExecutor, INIT_COOLDOWN};
pub use models::{AddOrderResult, KrakenResponse, ServerTime};
