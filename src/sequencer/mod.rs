//! The stage-sequencing core.
//!
//! A [`Block`](block::Block) owns ordered [`Trial`](trial::Trial)s; a Trial
//! owns ordered boxed [`Phase`](phase::Phase)s and steps them one tick at a
//! time across one or more repetitions. Control flows downward (block starts
//! trial, trial enters and ticks phases); completion notifications flow
//! upward as returned event values consumed by the owner within the same
//! tick.

pub mod block;
pub mod phase;
pub mod trial;

pub use block::{Block, BlockEvent, TrialId};
pub use phase::{Phase, PhaseId, PhaseTick};
pub use trial::{HookContext, NoHooks, Trial, TrialEvent, TrialHooks};
