//! Application layer tying resolution, computation and history together.
//!
//! `TaxService` is the single entry point for a tax calculation. It depends on
//! the ports in `domain::ports` only, so storage and lookup sources can be
//! swapped without touching the orchestration.

pub mod cancel;
pub mod registry;
pub mod resolver;
pub mod service;
