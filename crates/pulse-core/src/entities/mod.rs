//! Record structs for everything fetched from the compliance API.
//!
//! Records are immutable once fetched and replaced wholesale on re-fetch.
//! All structs derive `Serialize`, `Deserialize`, and `JsonSchema` so the
//! expected upstream shapes can be published and validated.

mod control;
mod directory;
mod evidence;
mod project;
mod risk;

pub use control::{AuditorReview, Control, Subcontrol};
pub use directory::{Auditor, Framework, Todo, User};
pub use evidence::Evidence;
pub use project::Project;
pub use risk::Risk;
