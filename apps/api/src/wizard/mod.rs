// Analysis wizard: asset form, linear step machine, model call and response parsing.
// Sessions live in memory only; see session.rs for the locking rules.

pub mod handlers;
pub mod models;
pub mod parser;
pub mod prompts;
pub mod risk;
pub mod session;
pub mod state_machine;
