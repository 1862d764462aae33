//! Tasks, their state machine and the services that run them

mod dashboard;
mod executor;
mod task;
mod task_state;

pub use dashboard::*;
pub use executor::*;
pub use task::*;
pub use task_state::*;
