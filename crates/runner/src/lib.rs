//! The check-in orchestrator: stage-probe seams and the bootstrap state
//! machine that drives one submission run end-to-end.
//!
//! A run walks a fixed stage sequence — login page, credentials, login
//! verdict, report page, confirm verdict, save, save verdict — and ends in
//! exactly one terminal outcome. Stage waits that exceed the driver deadline
//! trigger a bounded whole-run retry; every other fault is terminal. The
//! terminal branch captures a tagged screenshot, dispatches one notification,
//! and closes the browser session.
//!
//! Browser and mail live behind the [`SessionProvider`], [`ReportPage`] and
//! [`OutcomeNotifier`] seams so the state machine is testable with scripted
//! fakes.

pub mod bootstrap;
pub mod notify;
pub mod outcome;
pub mod probe;
pub mod shots;

pub use {
    bootstrap::{Bootstrap, BootstrapConfig},
    notify::OutcomeNotifier,
    outcome::{RetryState, RunOutcome},
    probe::{ProbeError, ReportPage, SessionProvider, StageVerdict, VerdictWire},
    shots::ShotStore,
};
