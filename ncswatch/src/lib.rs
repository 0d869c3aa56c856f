//! # ncswatch
//!
//! Bulk diagnostic capture for Cisco NCS-55xx routers.
//!
//! For every device in a YAML inventory, ncswatch opens a CLI session over
//! SSH or telnet, discovers the HundredGigE interfaces and line-card slots,
//! runs a fixed set of diagnostic commands (some inside each line card's
//! shell), and writes one text file per device. All files are then zipped
//! into a single timestamped archive.
//!
//! ## Layers
//!
//! - [`transport`] - SSH (russh) and telnet byte streams
//! - [`channel`] - prompt-driven reads with tail-only pattern search
//! - [`driver`] - device sessions: send, enter/exit a nested shell, close
//! - [`platform`] - per-vendor prompt patterns and output cleanup
//! - [`collect`] - discovery, template expansion and the batch itself
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use chrono::Local;
//! use ncswatch::{Batch, BatchOptions, CliConnector, Credentials, InventoryConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), ncswatch::Error> {
//!     let inventory = InventoryConfig::load("inventory.yml".as_ref())?;
//!     let connector = CliConnector::new(Credentials::new("admin", "secret"));
//!     let options = BatchOptions::new(Local::now().naive_local());
//!
//!     let report = Batch::new(connector, inventory, options).run().await?;
//!     println!("archive: {}", report.archive_path.display());
//!     Ok(())
//! }
//! ```

pub mod archive;
pub mod channel;
pub mod collect;
pub mod config;
pub mod driver;
pub mod error;
pub mod platform;
pub mod prompt;
pub mod transport;

// Re-export main types for convenience
pub use collect::{Batch, BatchOptions, BatchReport, CommandPlan, OutputBuffer};
pub use config::{DeviceConfig, DeviceType, Globals, InventoryConfig};
pub use driver::{CliConnector, CliSession, Connector, Credentials, Response, Session, SessionBuilder};
pub use error::Error;
pub use platform::PlatformDefinition;
