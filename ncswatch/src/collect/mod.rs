//! Diagnostic collection.
//!
//! Discovery finds a device's interfaces and line-card slots, the command
//! plan is expanded over them, and every response lands in the device's
//! output buffer. [`Batch`] repeats that for the whole inventory and archives
//! the result.

pub mod batch;
pub mod device;
pub mod discovery;
pub mod expand;
pub mod output;
pub mod plan;

pub use batch::{Batch, BatchOptions, BatchReport, DeviceFailure, DeviceOutcome, output_filename};
pub use device::run_device;
pub use discovery::{Topology, discover, parse_topology};
pub use expand::expand;
pub use output::{Block, OutputBuffer};
pub use plan::CommandPlan;
