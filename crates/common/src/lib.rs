// inkwell-common: shared types for the Inkwell workspace

pub mod error;
pub mod outcome;
pub mod task;
pub mod types;
