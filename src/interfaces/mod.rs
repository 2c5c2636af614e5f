//! Adapters between the outside world and [`TaxService`](crate::application::service::TaxService).

pub mod csv;
pub mod response;
