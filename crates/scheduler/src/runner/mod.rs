//! Scheduler runner -- owns the worker pool and every shared structure.
//!
//! Split into focused submodules:
//! - `core`: Scheduler struct, constructor, lifecycle controls, and accessor methods
//! - `execution`: coordinator thread, worker loop, and task execution
//! - `scheduling`: pulling the next task with dependency gating

mod core;
mod execution;
mod scheduling;
#[cfg(test)]
mod tests;

pub use self::core::Scheduler;
