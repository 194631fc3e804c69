//! Conversation loop: phases, state, events, input and the controller.

pub mod events;
pub mod input;
pub mod runner;
pub mod types;

pub use events::*;
pub use input::*;
pub use runner::*;
pub use types::*;
