//! Rust library for controlling Anthem networked A/V receivers
//!
//! Anthem receivers accept short `;`-terminated ASCII commands on a raw TCP
//! port (4999 by default). This library provides an async API for:
//!
//! - Power, volume, mute and input control per zone
//! - Translating commands into each receiver family's syntax
//! - Parsing replies, including the different shapes sent while in standby
//! - Keeping the last known state of every zone
//!
//! # Quick Start
//!
//! ```no_run
//! use anthemav::{AnthemClient, ClientConfig, Model, PowerState, Zone};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ClientConfig::new("192.168.1.50", Model::X00).volume_range(-60, -30);
//!     let mut client = AnthemClient::new(config)?;
//!
//!     // A receiver that does not answer is reported as off
//!     if let Err(e) = client.query(Zone::MAIN).await {
//!         println!("Receiver unavailable: {}", e);
//!     }
//!
//!     if client.power_state(Zone::MAIN) == PowerState::On {
//!         println!("Volume: {:.2}", client.volume_normalized(Zone::MAIN)?);
//!         println!("Source: {:?}", client.source_name(Zone::MAIN));
//!         client.set_mute(Zone::MAIN, true).await?;
//!     }
//!     Ok(())
//! }
//! ```
//!
//! # Architecture
//!
//! - **Client**: per-zone operations, unit conversion and the power state machine
//! - **Profile**: one model's command table, response grammar, standby rules and sources
//! - **Protocol**: the built-in tables for the `x00` and `x10`/`x20` families
//! - **Grammar**: regex extraction and standby normalization
//! - **Connection**: one TCP exchange per request
//! - **State**: per-zone field store with merge semantics

mod client;
mod command;
mod config;
mod connection;
mod error;
mod grammar;
mod profile;
mod protocol;
mod sources;
mod state;
mod types;

// Public exports
pub use client::AnthemClient;
pub use command::{Command, CommandParams, CommandTable, WireTemplate};
pub use config::ClientConfig;
pub use connection::{exchange, Endpoint, ExchangeLimits};
pub use error::{AnthemError, Result};
pub use grammar::{ExtractionPattern, GrammarSet, StandbyNormalizer, StandbyRule};
pub use profile::{ModelProfile, ModelProfileBuilder};
pub use protocol::DEFAULT_PORT;
pub use sources::SourceMap;
pub use state::{StateStore, ZoneState};
pub use types::{Model, PowerState, VolumeRange, Zone, DECODER, MUTE, POWER, SOURCE, VOLUME};
