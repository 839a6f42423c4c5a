//! Order management boundary
//!
//! The engine never talks to a broker directly. It hands an
//! [`OrderRequest`] to an [`ExecutionAdapter`] and advances its trade state
//! only on a returned [`Fill`].

pub mod execution;
pub mod types;

pub use execution::{ExecutionAdapter, PaperBroker};
pub use types::{Fill, OrderId, OrderPurpose, OrderRequest};
