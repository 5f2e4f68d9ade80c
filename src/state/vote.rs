//! Per-room timed voting protocol for host rotation.

use indexmap::IndexMap;
use rand::Rng;
use tokio::task::AbortHandle;
use uuid::Uuid;

/// Vote tally and countdown bookkeeping for one room.
///
/// The controller owns no timer itself; the service layer arms a countdown
/// task and hands its [`AbortHandle`] over via [`VoteController::arm`], so
/// starting a new vote always cancels the previous countdown. The epoch
/// guards a resolved or restarted vote against stale timer callbacks.
#[derive(Debug, Default)]
pub struct VoteController {
    running: bool,
    candidates: Vec<Uuid>,
    votes: IndexMap<Uuid, Uuid>,
    timer: Option<AbortHandle>,
    epoch: u64,
}

impl VoteController {
    /// Create an idle controller.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a vote round is currently running.
    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Epoch of the current (or last) vote round.
    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    /// Open a new vote round over `candidates`, clearing any previous tally.
    ///
    /// Returns the new epoch; a timer armed for an earlier epoch must not
    /// resolve this round.
    pub fn start(&mut self, candidates: Vec<Uuid>) -> u64 {
        self.running = true;
        self.candidates = candidates;
        self.votes.clear();
        self.epoch += 1;
        self.epoch
    }

    /// Install the countdown task handle, aborting any previously armed timer.
    pub fn arm(&mut self, handle: AbortHandle) {
        if let Some(previous) = self.timer.replace(handle) {
            previous.abort();
        }
    }

    /// Record a voter's choice; a later call overwrites the earlier one.
    pub fn cast(&mut self, voter: Uuid, candidate: Uuid) {
        self.votes.insert(voter, candidate);
    }

    /// Current voter-to-candidate map, in first-vote order.
    pub fn votes(&self) -> &IndexMap<Uuid, Uuid> {
        &self.votes
    }

    /// Candidates of the current round.
    pub fn candidates(&self) -> &[Uuid] {
        &self.candidates
    }

    /// Vote counts per candidate, in candidate order.
    pub fn tally(&self) -> IndexMap<Uuid, usize> {
        let mut counts: IndexMap<Uuid, usize> = self
            .candidates
            .iter()
            .map(|candidate| (*candidate, 0))
            .collect();
        for candidate in self.votes.values() {
            if let Some(count) = counts.get_mut(candidate) {
                *count += 1;
            }
        }
        counts
    }

    /// Pick the winner: the candidate with the strictly greatest positive
    /// vote count, ties broken by a uniform random choice over the whole
    /// tied set. Returns `None` when every candidate has zero votes.
    pub fn decide_winner<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<Uuid> {
        let counts = self.tally();
        let max = counts.values().copied().max().unwrap_or(0);
        if max == 0 {
            return None;
        }
        let tied: Vec<Uuid> = counts
            .iter()
            .filter(|(_, count)| **count == max)
            .map(|(candidate, _)| *candidate)
            .collect();
        let index = rng.random_range(0..tied.len());
        Some(tied[index])
    }

    /// Close the round: cancel the countdown and return to idle.
    ///
    /// The tally is kept until the next [`VoteController::start`] so the
    /// resolution broadcast can still read it.
    pub fn conclude(&mut self) {
        self.running = false;
        if let Some(timer) = self.timer.take() {
            timer.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{SeedableRng, rngs::StdRng};

    fn ids(n: usize) -> Vec<Uuid> {
        (0..n).map(|_| Uuid::new_v4()).collect()
    }

    #[test]
    fn later_vote_overwrites_earlier_one() {
        let candidates = ids(2);
        let voter = Uuid::new_v4();
        let mut vote = VoteController::new();
        vote.start(candidates.clone());

        vote.cast(voter, candidates[0]);
        vote.cast(voter, candidates[1]);

        let tally = vote.tally();
        assert_eq!(tally[&candidates[0]], 0);
        assert_eq!(tally[&candidates[1]], 1);
        assert_eq!(vote.votes().len(), 1);
    }

    #[test]
    fn zero_votes_yield_no_winner() {
        let mut vote = VoteController::new();
        vote.start(ids(3));

        let mut rng = StdRng::seed_from_u64(7);
        assert_eq!(vote.decide_winner(&mut rng), None);
    }

    #[test]
    fn single_candidate_with_one_vote_wins() {
        let candidates = ids(1);
        let mut vote = VoteController::new();
        vote.start(candidates.clone());
        vote.cast(Uuid::new_v4(), candidates[0]);

        let mut rng = StdRng::seed_from_u64(7);
        assert_eq!(vote.decide_winner(&mut rng), Some(candidates[0]));
    }

    #[test]
    fn winner_has_strictly_greatest_count() {
        let candidates = ids(3);
        let voters = ids(5);
        let mut vote = VoteController::new();
        vote.start(candidates.clone());

        vote.cast(voters[0], candidates[0]);
        vote.cast(voters[1], candidates[1]);
        vote.cast(voters[2], candidates[1]);
        vote.cast(voters[3], candidates[1]);
        vote.cast(voters[4], candidates[2]);

        let mut rng = StdRng::seed_from_u64(7);
        assert_eq!(vote.decide_winner(&mut rng), Some(candidates[1]));
    }

    #[test]
    fn tie_break_only_picks_from_the_tied_set() {
        let candidates = ids(4);
        let mut vote = VoteController::new();
        vote.start(candidates.clone());

        // Two-way tie between candidates 1 and 3; candidate 0 has fewer votes.
        vote.cast(Uuid::new_v4(), candidates[0]);
        for _ in 0..2 {
            vote.cast(Uuid::new_v4(), candidates[1]);
            vote.cast(Uuid::new_v4(), candidates[3]);
        }

        let mut seen = std::collections::HashSet::new();
        for seed in 0..64 {
            let mut rng = StdRng::seed_from_u64(seed);
            let winner = vote.decide_winner(&mut rng).expect("winner");
            assert!(winner == candidates[1] || winner == candidates[3]);
            seen.insert(winner);
        }
        // Across many seeds both tied candidates must be reachable.
        assert_eq!(seen.len(), 2);
    }

    #[test]
    fn votes_for_dropped_candidates_are_ignored() {
        let candidates = ids(2);
        let outsider = Uuid::new_v4();
        let mut vote = VoteController::new();
        vote.start(candidates.clone());
        vote.cast(Uuid::new_v4(), outsider);

        let tally = vote.tally();
        assert_eq!(tally.len(), 2);
        assert!(tally.values().all(|count| *count == 0));

        let mut rng = StdRng::seed_from_u64(7);
        assert_eq!(vote.decide_winner(&mut rng), None);
    }

    #[test]
    fn restart_clears_previous_tally_and_bumps_epoch() {
        let candidates = ids(2);
        let mut vote = VoteController::new();
        let first = vote.start(candidates.clone());
        vote.cast(Uuid::new_v4(), candidates[0]);

        let second = vote.start(candidates);
        assert!(second > first);
        assert!(vote.votes().is_empty());
        assert!(vote.is_running());
    }
}
