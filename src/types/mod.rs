//! Core types shared by the controller, executor and model providers.

pub mod draft;
pub mod generation;
pub mod message;

pub use draft::*;
pub use generation::*;
pub use message::*;
