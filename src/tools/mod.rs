//! Tool system: schemas, typed arguments, the tool trait and built-in tools.

pub mod arguments;
pub mod builtin;
pub mod schema;
pub mod tool;

pub use arguments::ToolArguments;
pub use schema::{FieldKind, FieldSpec, ParameterSchema, Validator};
pub use tool::{Tool, ToolContext, ToolResponse, ToolSet, ToolSpec};
