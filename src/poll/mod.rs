//! Poll Executor
//!
//! The polling algorithm is written once, as the state machine in
//! [`machine`]. The async and blocking drivers in [`executor`] only differ in
//! how they wait and how they call the vendor.

pub mod executor;
pub mod machine;

pub use executor::{
    PollReport, poll_until_terminal, poll_until_terminal_blocking, poll_vendor,
};
pub use machine::{PollAction, PollMachine, PollOutcome};
