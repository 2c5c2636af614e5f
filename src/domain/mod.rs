//! Domain types and the ports the application layer depends on.

pub mod calculator;
pub mod history;
pub mod money;
pub mod ports;
pub mod postal_code;
