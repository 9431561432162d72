pub mod batch;
pub mod config;
pub mod descriptor;
pub mod error;
pub mod horizontal;
pub mod material;
pub mod render;
pub mod solver;
pub mod types;
pub mod vertical;

pub use config::EngineConfig;
pub use error::{ConfigError, LabelError};
pub use solver::{Solver, optimize};
pub use types::{Cylinder, Infeasibility, Label, OptimizationOutcome, Solution};
