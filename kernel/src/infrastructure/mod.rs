/// Audit logging for lifecycle and process events.
pub mod audit;
/// Configuration management for the kernel.
pub mod config;
/// HTTP server wiring.
pub mod server;
/// Telemetry setup for logging and tracing.
pub mod telemetry;
