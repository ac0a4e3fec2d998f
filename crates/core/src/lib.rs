// inkwell-core: versioned document store, audit log and background dispatch.

pub mod audit;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod store;
pub mod worker;
