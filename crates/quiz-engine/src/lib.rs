pub mod autosave;
pub mod collab;
pub mod config;
pub mod controller;
pub mod error;
pub mod intake;
pub mod reducer;
pub mod state;

pub use autosave::{Autosaver, SaveAck};
pub use config::EngineConfig;
pub use controller::{EngineServices, QuizController, StepResult};
pub use error::{CollabError, EngineError};
pub use intake::build_intake_record;
pub use reducer::{Action, reduce};
pub use state::{Progress, QuizState, QuizStatus};
