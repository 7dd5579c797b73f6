//! Utility modules for siumai-jobs

pub mod cancel;

pub use cancel::{CancelHandle, new_cancel_handle};
