//! Session state machine
//!
//! Pure transitions over session phases; the session runtime executes the
//! resulting effects.

mod effect;
pub mod event;
pub mod state;
pub(crate) mod transition;

#[cfg(test)]
mod proptests;

pub use effect::Effect;
pub use event::Event;
pub use state::{SessionContext, SessionPhase};
pub use transition::{transition, TransitionError};
