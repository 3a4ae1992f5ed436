//! Terminal UI helpers for the host binary.

pub mod spinner;
