//! State module for tracking chapter job progress
//!
//! # Components
//!
//! - `JobStatus`: The lifecycle of a single chapter job (pending, fetching, processing, archived, etc.)

mod job_state;

pub use job_state::JobStatus;
