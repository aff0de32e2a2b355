//! Level metering.

pub mod peak;
