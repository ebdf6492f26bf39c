//! Inbound adapters that translate external requests into domain service
//! calls while keeping transport details at the edge.
//!
//! Chat commands arrive through [`telegram`]; the poll driver is started
//! directly by the binary.

pub mod telegram;
