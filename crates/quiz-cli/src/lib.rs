pub mod cli;
pub mod cmd;
pub mod settings;
pub mod telemetry;
