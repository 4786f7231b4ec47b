//! RCA Orchestrator - incident root-cause investigation over cluster telemetry
//!
//! A supervisor/worker loop: triage extracts symptoms, planning turns them
//! into prioritized tasks, workers investigate tasks concurrently through
//! diagnostic tools, and a supervisor either finalizes a report or requests
//! more work.

pub mod actors;
pub mod api;
pub mod config;
pub mod oracle;
pub mod tools;
