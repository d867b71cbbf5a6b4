//! dristi-narrator: turns perception into speech
//!
//! Holds the narration policy (what to say for each mode), the hazard
//! taxonomy, the auto-narration timer, the key command dispatcher and the
//! session loop that ties frames, analyzers, commands and speech together.

pub mod commands;
pub mod error;
pub mod hazards;
pub mod policy;
pub mod session;
pub mod state;

pub use commands::{CommandDispatcher, Dispatch};
pub use error::SessionError;
pub use hazards::{HazardCategory, HazardGroups};
pub use policy::{pluralize, NarrationMode, NarrationPolicy, NarrationRequest};
pub use session::{Session, SessionEnd};
pub use state::NarrationState;
