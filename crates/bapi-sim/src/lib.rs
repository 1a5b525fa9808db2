//! bapi-sim - Simulated BAPI backend
//!
//! An in-memory stand-in for the remote system behind the
//! [`Connector`](bapi_core::Connector) seam. It declares the same function
//! signatures as the real business-object interface, buffers changes per
//! connection until `BAPI_TRANSACTION_COMMIT`, and reports business problems
//! through `RETURN` messages the way the real functions do.
//!
//! For tests it can keep a journal of every executed call (opt-in, see
//! [`SimulatedSystem::with_journal`]) and accepts one-shot [`Script`]s that
//! replace the next response of a function.
//!
//! ```ignore
//! use std::sync::Arc;
//! use bapi_sim::{SimConfig, SimulatedConnector, SimulatedSystem};
//!
//! let system = Arc::new(SimulatedSystem::with_demo_data().with_journal());
//! let connector = SimulatedConnector::new(system.clone(), SimConfig::default());
//! let destination = Destination::new("SAP_DEST", DestinationConfig::default(), Arc::new(connector));
//! ```

mod connection;
mod functions;
pub mod signatures;
mod system;

pub use connection::{SimConfig, SimulatedConnector};
pub use system::{Script, SimulatedSystem, UserRecord};
