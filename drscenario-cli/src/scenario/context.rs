//! Mutable state of one scenario run.

use drscenario_cluster::TeardownReport;
use drscenario_core::phase::Phase;
use drscenario_core::types::{NamespaceSet, RunId};
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use tracing::debug;

/// Everything a run accumulates while its phases execute.
///
/// Owned by the caller and passed to [`Scenario::run`](super::Scenario::run),
/// so two runs never share state.
pub struct RunContext {
    pub run_id: RunId,
    pub namespaces: NamespaceSet,
    current_phase: Option<Phase>,
    executed: Vec<Phase>,
    workloads_created: usize,
    rng: StdRng,
    pub teardowns: Vec<TeardownReport>,
    pub images_removed: Vec<String>,
}

impl RunContext {
    /// `seed` makes namespace selection reproducible; `None` seeds from entropy.
    pub fn new(run_id: RunId, namespaces: NamespaceSet, seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            run_id,
            namespaces,
            current_phase: None,
            executed: Vec::new(),
            workloads_created: 0,
            rng,
            teardowns: Vec::new(),
            images_removed: Vec::new(),
        }
    }

    /// Last phase that completed; `None` before the first one.
    pub fn current_phase(&self) -> Option<Phase> {
        self.current_phase
    }

    /// Phases completed so far, in order.
    pub fn executed(&self) -> &[Phase] {
        &self.executed
    }

    /// Workloads deployed so far across every storage class.
    pub fn workloads_created(&self) -> usize {
        self.workloads_created
    }

    /// Records `phase` as completed.
    pub(crate) fn complete(&mut self, phase: Phase) {
        debug_assert!(self.current_phase.is_none_or(|p| p < phase));
        self.current_phase = Some(phase);
        self.executed.push(phase);
    }

    /// Claims the next run-wide workload index.
    pub(crate) fn next_workload_index(&mut self) -> usize {
        let index = self.workloads_created;
        self.workloads_created += 1;
        index
    }

    /// Picks a protected namespace uniformly at random.
    pub(crate) fn pick_namespace(&mut self) -> Option<String> {
        let picked = self.namespaces.as_slice().choose(&mut self.rng).cloned();
        debug!(namespace = ?picked, "picked namespace");
        picked
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context(count: usize, seed: u64) -> RunContext {
        let run_id = RunId::new("test-1");
        let namespaces = NamespaceSet::generate(&run_id, count);
        RunContext::new(run_id, namespaces, Some(seed))
    }

    #[test]
    fn fresh_context_has_no_phase() {
        let ctx = context(1, 0);
        assert_eq!(ctx.current_phase(), None);
        assert!(ctx.executed().is_empty());
        assert_eq!(ctx.workloads_created(), 0);
    }

    #[test]
    fn workload_indices_are_sequential() {
        let mut ctx = context(1, 0);
        assert_eq!(ctx.next_workload_index(), 0);
        assert_eq!(ctx.next_workload_index(), 1);
        assert_eq!(ctx.next_workload_index(), 2);
        assert_eq!(ctx.workloads_created(), 3);
    }

    #[test]
    fn picked_namespaces_belong_to_the_set() {
        let mut ctx = context(4, 7);
        for _ in 0..50 {
            let ns = ctx.pick_namespace().unwrap();
            assert!(ctx.namespaces.contains(&ns));
        }
    }

    #[test]
    fn same_seed_same_choices() {
        let mut a = context(5, 99);
        let mut b = context(5, 99);
        let picks_a: Vec<_> = (0..10).map(|_| a.pick_namespace()).collect();
        let picks_b: Vec<_> = (0..10).map(|_| b.pick_namespace()).collect();
        assert_eq!(picks_a, picks_b);
    }

    #[test]
    fn empty_set_picks_nothing() {
        let mut ctx = context(0, 1);
        assert_eq!(ctx.pick_namespace(), None);
    }

    #[test]
    fn completion_moves_forward() {
        let mut ctx = context(1, 0);
        ctx.complete(Phase::DeployApp);
        ctx.complete(Phase::EnableDr);
        assert_eq!(ctx.current_phase(), Some(Phase::EnableDr));
        assert_eq!(ctx.executed(), [Phase::DeployApp, Phase::EnableDr]);
    }
}
