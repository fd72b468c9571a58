//! trialflow — stage sequencing engine for timed behavioral experiments.
//!
//! An experiment is a nested hierarchy of timed stages: blocks contain
//! ordered trials, trials contain ordered phases, and phases repeat across
//! trial repetitions. The sequencing core is tick-driven and cooperative;
//! phase pacing (tick counts, wall-clock durations, participant input,
//! operator cues) lives in pluggable variants behind a registry.

pub mod cli;
pub mod config;
pub mod error;
pub mod observability;
pub mod phases;
pub mod runner;
pub mod sequencer;
pub mod signals;
