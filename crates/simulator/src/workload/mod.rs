//! Workload generation for simulations.
//!
//! Workloads plug into the engine's transaction generator process through
//! [`powsim_core::TransactionSource`].

mod transfer;

pub use transfer::TransferWorkload;
