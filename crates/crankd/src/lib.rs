mod clients;
mod service;
pub mod telemetry;
pub mod worker;

pub use clients::Clients;
pub use service::Crankd;
