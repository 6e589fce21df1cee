mod args;
mod config;

pub use args::{Args, CleanupArgs, Command, DriveArgs, InitArgs, RunArgs};
pub use config::{
    EndpointConfig, FaultConfig, ScenarioConfig, SuiteConfig, SuiteSettings, WorkloadConfig,
};
