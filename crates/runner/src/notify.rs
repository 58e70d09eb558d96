//! Terminal-outcome notification seam.

use async_trait::async_trait;

use crate::outcome::RunOutcome;

/// Dispatches the terminal outcome of a run through a side channel.
///
/// Called exactly once per physical run, from the terminal branch only.
/// Implementations must swallow and log their own failures — notification is
/// best-effort and must never mask the run's outcome or prevent session
/// cleanup.
#[async_trait]
pub trait OutcomeNotifier: Send + Sync {
    async fn notify(&self, outcome: RunOutcome, message: &str);
}
