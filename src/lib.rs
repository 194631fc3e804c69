//! ticket-agent: a tool-calling conversation loop.
//!
//! A [`ConversationController`](agent_loop::ConversationController) alternates
//! between asking a chat model for its next action and running the requested
//! tools through a [`ToolExecutor`](executor::ToolExecutor), which validates
//! arguments and applies a timeout and retry budget to every call. The loop
//! stops when a termination predicate matches the history, the model gives a
//! final answer, or input runs out.
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use ticket_agent::prelude::*;
//!
//! # async fn example() -> ticket_agent::error::Result<()> {
//! let config = AgentConfig::load(None)?;
//! let model = create_chat_model(&config)?;
//! let controller = ConversationController::new(Arc::from(model), jira_tools(&config))
//!     .with_executor(ToolExecutor::new(config.execution_policy()));
//!
//! let mut state = ConversationState::new();
//! state.push_user("Create a Task in OPS: login page returns 500")?;
//! let outcome = controller.run(state).await;
//! println!("{:?}", outcome.reason());
//! # Ok(())
//! # }
//! ```

pub mod agent_loop;
pub mod config;
pub mod error;
pub mod executor;
pub mod prelude;
pub mod provider;
pub mod stop;
pub mod tools;
pub mod types;
pub mod util;

#[cfg(feature = "cli")]
pub mod cli;
