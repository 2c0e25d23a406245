//! The classification state machine for one modulus.
//!
//! ```text
//! InitialPass ──(no direct match)──────────────────────────▶ Failed(NoInitialSuccess)
//!      │
//!      ▼
//! Combining(step) ──(remaining empty)──────────────────────▶ Succeeded
//!      │  ▲    └──(zero progress, table says stop)─────────▶ Failed(LevelExhausted)
//!      │  ├──(progress: cursor = |successful| before merge)
//!      │  └──(zero progress, cursor > 0, table says stop: cursor = 0)
//!      └──(zero progress) ─▶ Combining(next step), cursor = 0
//! ```
//!
//! Only the orchestrator mutates the state, and only between rounds: every
//! round borrows `successful` immutably for its whole duration.

use std::time::{Duration, Instant};

use gamma_core::{GeneratorSet, GroupArithmetic};

use crate::combinations::multiset_count;
use crate::config::ClassifierOptions;
use crate::equivalence::{ClassFlag, EquivalenceClasses};
use crate::escalation::Strategy;
use crate::evaluator::LiftedSet;
use crate::pool::TaskExecutor;
use crate::report::{
    FailureReason, GeneratorStat, ModulusOutcome, PhaseTimings, RoundRecord, RunStatus, Witness,
};
use crate::scheduler::{collect_initial_round, collect_round, RoundOutcome};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    InitialPass,
    Combining(Strategy),
    Succeeded,
    Failed(FailureReason),
}

impl Phase {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Phase::Succeeded | Phase::Failed(_))
    }
}

/// The successful/remaining partition plus the escalation position.
#[derive(Debug, Clone)]
pub struct ClassificationState {
    successful: Vec<usize>,
    remaining: Vec<usize>,
    classified: Vec<bool>,
    step: usize,
    strategy: Option<Strategy>,
    anchor_cursor: usize,
    stats: Vec<GeneratorStat>,
}

impl ClassificationState {
    pub fn new(total: usize) -> Self {
        ClassificationState {
            successful: Vec::with_capacity(total),
            remaining: (0..total).collect(),
            classified: vec![false; total],
            step: 0,
            strategy: None,
            anchor_cursor: 0,
            stats: (0..total)
                .map(|index| GeneratorStat {
                    index,
                    products_tested: 0,
                    witness: Witness::Unresolved,
                })
                .collect(),
        }
    }

    /// Classified generators in the order they were classified.
    pub fn successful(&self) -> &[usize] {
        &self.successful
    }

    /// Unclassified generators, ascending.
    pub fn remaining(&self) -> &[usize] {
        &self.remaining
    }

    /// Current combination strategy, `None` before the first combination round.
    pub fn strategy(&self) -> Option<Strategy> {
        self.strategy
    }

    /// Current multiplication level (0 before combining starts).
    pub fn mult_level(&self) -> usize {
        self.strategy.map_or(0, |s| s.level())
    }

    pub fn anchor_cursor(&self) -> usize {
        self.anchor_cursor
    }

    pub fn stats(&self) -> &[GeneratorStat] {
        &self.stats
    }

    /// Disjoint, and together cover every index exactly once.
    pub fn partition_holds(&self) -> bool {
        let mut seen = vec![0u8; self.classified.len()];
        for &i in self.successful.iter().chain(self.remaining.iter()) {
            if i >= seen.len() {
                return false;
            }
            seen[i] += 1;
        }
        seen.iter().all(|&c| c == 1)
            && self.successful.iter().all(|&i| self.classified[i])
            && self.remaining.iter().all(|&i| !self.classified[i])
    }

    fn enter_step(&mut self, step: usize, strategy: Strategy) {
        self.step = step;
        self.strategy = Some(strategy);
        self.anchor_cursor = 0;
    }

    /// Append without touching `remaining`; callers filter it afterwards.
    fn classify(&mut self, index: usize, witness: Witness) -> bool {
        if self.classified[index] {
            return false;
        }
        self.classified[index] = true;
        self.successful.push(index);
        self.stats[index].witness = witness;
        true
    }

    fn drop_classified_from_remaining(&mut self) {
        let classified = &self.classified;
        self.remaining.retain(|&i| !classified[i]);
    }

    /// Fold a round into the partition. Qualifying candidates move to
    /// `successful` in submission order, each followed by the rest of its
    /// class when `classes` is given. Returns how many indices moved.
    pub fn merge_round(
        &mut self,
        outcome: &RoundOutcome,
        mut classes: Option<&mut EquivalenceClasses>,
    ) -> usize {
        let before = self.successful.len();
        for attempt in &outcome.attempts {
            self.stats[attempt.index].products_tested += attempt.products_tested;
            let Some(witness) = &attempt.witness else {
                continue;
            };
            if !self.classify(attempt.index, witness.clone()) {
                log::warn!("Generator {} reported twice in one round", attempt.index);
                continue;
            }
            if let Some(classes) = classes.as_deref_mut() {
                classes.resolve(attempt.index, ClassFlag::Successful);
                let members = classes.class_of(attempt.index).members().to_vec();
                for member in members {
                    self.classify(
                        member,
                        Witness::Propagated {
                            source: attempt.index,
                        },
                    );
                }
            }
        }
        self.drop_classified_from_remaining();
        self.successful.len() - before
    }

    /// After the initial pass: mark classes holding a direct match as
    /// successful and pull in their other members. Returns how many moved.
    fn propagate_initial(&mut self, classes: &mut EquivalenceClasses) -> usize {
        let before = self.successful.len();
        let direct: Vec<usize> = self.successful.clone();
        for source in direct {
            classes.resolve(source, ClassFlag::Successful);
            let members = classes.class_of(source).members().to_vec();
            for member in members {
                self.classify(member, Witness::Propagated { source });
            }
        }
        self.drop_classified_from_remaining();
        self.successful.len() - before
    }

    fn into_stats(self) -> Vec<GeneratorStat> {
        self.stats
    }
}

/// Upper bound on products built for one candidate in one round.
fn products_bound(successful: usize, cursor: usize, strategy: Strategy) -> u128 {
    let anchors = successful.saturating_sub(cursor) as u128;
    let others = match strategy.level() {
        1 => 1,
        level => multiset_count(successful, level - 1),
    };
    anchors * others * u128::from(strategy.arrangements())
}

/// One modulus being classified.
pub struct ClassificationRun<'a, A: GroupArithmetic> {
    lifted: LiftedSet<'a, A>,
    set: &'a GeneratorSet,
    options: &'a ClassifierOptions,
    state: ClassificationState,
    classes: Option<EquivalenceClasses>,
    phase: Phase,
    stalled: usize,
    max_level: usize,
    rounds: Vec<RoundRecord>,
    started: Instant,
    initial_pass: Duration,
    class_build: Duration,
    combining: Duration,
}

impl<'a, A: GroupArithmetic> ClassificationRun<'a, A> {
    pub fn new(arith: &'a A, set: &'a GeneratorSet, options: &'a ClassifierOptions) -> Self {
        let started = Instant::now();
        ClassificationRun {
            lifted: LiftedSet::new(arith, set),
            set,
            options,
            state: ClassificationState::new(set.len()),
            classes: None,
            phase: Phase::InitialPass,
            stalled: 0,
            max_level: 0,
            rounds: Vec::new(),
            started,
            initial_pass: Duration::ZERO,
            class_build: Duration::ZERO,
            combining: Duration::ZERO,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn state(&self) -> &ClassificationState {
        &self.state
    }

    /// Built after the initial pass.
    pub fn classes(&self) -> Option<&EquivalenceClasses> {
        self.classes.as_ref()
    }

    pub fn rounds(&self) -> &[RoundRecord] {
        &self.rounds
    }

    /// Representatives of the classes still unclassified: the next
    /// round's work list.
    pub fn pending_candidates(&self) -> Vec<usize> {
        match &self.classes {
            Some(classes) => self
                .state
                .remaining
                .iter()
                .copied()
                .filter(|&i| classes.is_representative(i))
                .collect(),
            None => self.state.remaining.clone(),
        }
    }

    /// Compute the next combination round without merging it.
    ///
    /// Returns `None` outside the `Combining` phase.
    pub fn preview_round<E: TaskExecutor>(&self, executor: &E) -> Option<RoundOutcome> {
        let Phase::Combining(strategy) = self.phase else {
            return None;
        };
        let work = self.pending_candidates();
        Some(collect_round(
            executor,
            &self.lifted,
            &work,
            &self.state.successful,
            strategy,
            self.state.anchor_cursor,
            self.options.batch_size,
        ))
    }

    /// Advance by one round (or one terminal transition).
    pub fn step<E: TaskExecutor>(&mut self, executor: &E) -> Phase {
        match self.phase {
            Phase::InitialPass => self.initial_pass(executor),
            Phase::Combining(strategy) => self.combine(executor, strategy),
            Phase::Succeeded | Phase::Failed(_) => {}
        }
        self.phase
    }

    /// Step until a terminal phase.
    pub fn run_to_end<E: TaskExecutor>(&mut self, executor: &E) -> Phase {
        while !self.phase.is_terminal() {
            self.step(executor);
        }
        self.phase
    }

    fn record_round(
        &mut self,
        strategy: Option<Strategy>,
        cursor: usize,
        candidates: usize,
        outcome: &RoundOutcome,
        moved: usize,
    ) {
        self.rounds.push(RoundRecord {
            round: self.rounds.len(),
            strategy,
            anchor_cursor: cursor,
            candidates,
            tasks: outcome.tasks,
            new_successes: moved,
            successful_after: self.state.successful.len(),
            remaining_after: self.state.remaining.len(),
            products_tested: outcome.products_tested(),
        });
    }

    fn initial_pass<E: TaskExecutor>(&mut self, executor: &E) {
        let modulus = self.set.modulus();
        let start = Instant::now();
        let outcome = collect_initial_round(executor, &self.lifted, self.options.batch_size);
        let found = self.state.merge_round(&outcome, None);
        self.initial_pass = start.elapsed();
        self.record_round(None, 0, self.set.len(), &outcome, found);

        log::info!(
            "Gamma({}): {} of {} generators satisfy the predicate directly",
            modulus,
            found,
            self.set.len()
        );

        if found == 0 {
            self.phase = Phase::Failed(FailureReason::NoInitialSuccess);
            return;
        }

        let start = Instant::now();
        let mut classes = if self.options.pruning {
            EquivalenceClasses::build(self.lifted.arith(), self.set)
        } else {
            EquivalenceClasses::singletons(self.set.len())
        };
        let propagated = self.state.propagate_initial(&mut classes);
        self.class_build = start.elapsed();
        log::info!(
            "Gamma({}): {} equivalence classes, {} generators resolved by propagation",
            modulus,
            classes.len(),
            propagated
        );
        self.classes = Some(classes);

        let first = self.options.escalation.strategy(0);
        self.state.enter_step(0, first);
        self.phase = Phase::Combining(first);
    }

    fn combine<E: TaskExecutor>(&mut self, executor: &E, strategy: Strategy) {
        let modulus = self.set.modulus();
        if self.state.remaining.is_empty() {
            self.phase = Phase::Succeeded;
            log::info!("Gamma({}) succeeded", modulus);
            return;
        }

        let start = Instant::now();
        let work = self.pending_candidates();
        let cursor = self.state.anchor_cursor;
        log::debug!(
            "Gamma({}) {}: {} candidates, at most {} products each",
            modulus,
            strategy,
            work.len(),
            products_bound(self.state.successful.len(), cursor, strategy)
        );
        let outcome = collect_round(
            executor,
            &self.lifted,
            &work,
            &self.state.successful,
            strategy,
            cursor,
            self.options.batch_size,
        );
        let next_cursor = self.state.successful.len();
        let moved = self.state.merge_round(&outcome, self.classes.as_mut());
        self.combining += start.elapsed();
        self.max_level = self.max_level.max(strategy.level());
        self.record_round(Some(strategy), cursor, work.len(), &outcome, moved);

        log::debug!(
            "Gamma({}) {}: cursor {} -> {} new, {} remaining",
            modulus,
            strategy,
            cursor,
            moved,
            self.state.remaining.len()
        );

        if moved > 0 {
            // Older anchors are exhausted at this strategy.
            self.stalled = 0;
            self.state.anchor_cursor = next_cursor;
            return;
        }

        let table = &self.options.escalation;
        if cursor > 0 && table.on_stall(self.state.step, self.stalled + 1).is_none() {
            // Old anchors were never paired with multipliers that joined
            // later. Sweep every anchor once more before giving up.
            log::info!(
                "Gamma({}): no progress at {}, rescanning from anchor 0",
                modulus,
                strategy
            );
            self.state.anchor_cursor = 0;
            return;
        }

        self.stalled += 1;
        match table.on_stall(self.state.step, self.stalled) {
            Some(next) => {
                let next_strategy = table.strategy(next);
                log::warn!(
                    "Gamma({}): no progress at {}, escalating to {}",
                    modulus,
                    strategy,
                    next_strategy
                );
                self.state.enter_step(next, next_strategy);
                self.phase = Phase::Combining(next_strategy);
            }
            None => {
                if let Some(classes) = self.classes.as_mut() {
                    for &i in &self.state.remaining {
                        classes.resolve(i, ClassFlag::Failed);
                    }
                }
                self.phase = Phase::Failed(FailureReason::LevelExhausted { strategy });
            }
        }
    }

    /// Consume the run into its report.
    pub fn into_outcome(self) -> ModulusOutcome {
        let (status, failure) = match self.phase {
            Phase::Succeeded => (RunStatus::Succeeded, None),
            Phase::Failed(reason) => (RunStatus::Failed, Some(reason)),
            // Not driven to the end; report what is known.
            Phase::InitialPass | Phase::Combining(_) => (RunStatus::Failed, None),
        };
        let timings = PhaseTimings::from_durations(
            self.initial_pass,
            self.class_build,
            self.combining,
            self.started.elapsed(),
        );
        let products_tested = self.rounds.iter().map(|r| r.products_tested).sum();
        ModulusOutcome {
            modulus: self.set.modulus(),
            status,
            failure,
            total_generators: self.set.len(),
            successful: self.state.successful.len(),
            remaining: self.state.remaining.len(),
            classes: self.classes.as_ref().map_or(0, EquivalenceClasses::len),
            final_strategy: self.rounds.iter().rev().find_map(|r| r.strategy),
            max_level: self.max_level,
            products_tested,
            rounds: self.rounds,
            timings,
            stats: self.state.into_stats(),
        }
    }
}

/// Classify one modulus from start to finish.
pub fn classify<A, E>(
    arith: &A,
    set: &GeneratorSet,
    executor: &E,
    options: &ClassifierOptions,
) -> ModulusOutcome
where
    A: GroupArithmetic,
    E: TaskExecutor,
{
    let mut run = ClassificationRun::new(arith, set, options);
    run.run_to_end(executor);
    run.into_outcome()
}
