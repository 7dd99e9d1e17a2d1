pub mod app;
pub mod artifacts;
pub mod cleanup;
pub mod generate;
pub mod metrics;
pub mod upload;
