//! Application services: supervision built from domain logic and port calls.
//!
//! Services import only from `crate::domain` and `crate::application::ports`.

pub mod output_reader;
pub mod registry;
pub mod settings_session;
pub mod supervisor;

pub use output_reader::OutputReader;
pub use registry::{Exited, Registry};
pub use settings_session::{Persistence, SettingsSession};
pub use supervisor::{StartOutcome, StopOutcome, Supervisor, SupervisorContext};
