use crate::{
    platform::Platform,
    snapshot::{History, Snapshot},
};

/// Read access to a sequence of recorded layouts, oldest first.
pub trait Lookback {
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// A cheap summary of the layout at `index`. Equal layouts have equal fingerprints.
    fn fingerprint(&self, index: usize) -> u64;

    /// `true` when the layouts at `a` and `b` match cell for cell.
    fn same(&self, a: usize, b: usize) -> bool;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Config {
    /// The most layouts the simulator will remember, the initial one included.
    pub history_capacity: usize,
}

impl Config {
    pub const DEFAULT_HISTORY_CAPACITY: usize = 1000;

    /// Anything smaller can never hold a repeat.
    pub const MIN_HISTORY_CAPACITY: usize = 2;

    pub fn with_history_capacity(mut self, history_capacity: usize) -> Self {
        self.history_capacity = history_capacity.max(Self::MIN_HISTORY_CAPACITY);
        self
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            history_capacity: Self::DEFAULT_HISTORY_CAPACITY,
        }
    }
}

/// Where cycle detection stands.
///
/// All indices are history indices: index `k` is the layout after `k` cycles.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Phase {
    /// No repeat seen yet.
    #[default]
    Searching,
    /// The layout at `end` looked like a repeat of the one at `start`.
    ///
    /// `confirmed` layouts after `end` have since matched the layouts after `start`.
    Validating {
        start: usize,
        end: usize,
        confirmed: usize,
    },
    /// From `start` onwards, the layouts repeat every `length` cycles.
    Resolved { start: usize, length: usize },
    /// The history ran out at `index` before a period was confirmed.
    Failed { index: usize },
}

impl Phase {
    /// The history index holding the layout after `target` cycles, if it is known.
    ///
    /// `len` is the number of layouts recorded so far.
    pub fn index_for(self, target: u64, len: usize) -> Option<usize> {
        if let Ok(target) = usize::try_from(target) {
            if target < len {
                return Some(target);
            }
        }
        match self {
            Phase::Resolved { start, length } => {
                let offset = (target - start as u64) % length as u64;
                // offset < length, so it fits
                Some(start + offset as usize)
            }
            _ => None,
        }
    }
}

/// Tracks the [`Phase`] as layouts are appended to a [`Lookback`].
#[derive(Clone, Copy, Debug, Default)]
pub struct Detector {
    phase: Phase,
}

impl Detector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Update the phase for the newest layout in `history`.
    pub fn observe(&mut self, history: &impl Lookback) -> Phase {
        let Some(current) = history.len().checked_sub(1) else {
            return self.phase;
        };

        self.phase = match self.phase {
            Phase::Searching => Self::search(history, current),
            Phase::Validating {
                start,
                end,
                confirmed,
            } => {
                let confirmed = confirmed + 1;
                debug_assert_eq!(current, end + confirmed, "one observation per layout");
                if !history.same(current, start + confirmed) {
                    log::debug!(
                        "layout {current} broke the candidate period {start}..{end}; searching again"
                    );
                    Self::search(history, current)
                } else if start + confirmed == end {
                    let (start, length) = (start + 1, end - start);
                    log::info!("confirmed period of {length} cycles starting at cycle {start}");
                    Phase::Resolved { start, length }
                } else {
                    Phase::Validating {
                        start,
                        end,
                        confirmed,
                    }
                }
            }
            settled @ (Phase::Resolved { .. } | Phase::Failed { .. }) => settled,
        };

        self.phase
    }

    /// Mark the detector as having run out of history at `index`.
    ///
    /// Returns the phase it was in beforehand.
    pub fn fail(&mut self, index: usize) -> Phase {
        std::mem::replace(&mut self.phase, Phase::Failed { index })
    }

    /// Look backwards from `current` for the nearest earlier layout which may be the same.
    fn search(history: &impl Lookback, current: usize) -> Phase {
        let fingerprint = history.fingerprint(current);
        match (0..current)
            .rev()
            .find(|&index| history.fingerprint(index) == fingerprint)
        {
            Some(start) => {
                log::debug!("layout {current} may repeat layout {start}");
                Phase::Validating {
                    start,
                    end: current,
                    confirmed: 0,
                }
            }
            None => Phase::Searching,
        }
    }
}

/// Spins a platform until the layout after any number of cycles can be read off its history.
#[derive(Debug)]
pub struct Simulator {
    platform: Platform,
    history: History,
    detector: Detector,
}

impl Simulator {
    pub fn new(platform: Platform) -> Self {
        Self::with_config(platform, Config::default())
    }

    pub fn with_config(platform: Platform, config: Config) -> Self {
        let capacity = config.history_capacity.max(Config::MIN_HISTORY_CAPACITY);
        let mut history = History::new(platform.width(), platform.height(), capacity);
        let initial = history.push(&platform);
        debug_assert_eq!(initial, Some(0));
        Self {
            platform,
            history,
            detector: Detector::new(),
        }
    }

    pub fn phase(&self) -> Phase {
        self.detector.phase()
    }

    /// How many cycles have actually been simulated so far.
    pub fn cycles_simulated(&self) -> usize {
        self.history.len() - 1
    }

    /// Run one more cycle, record it, and update the detector.
    pub fn step(&mut self) -> Result<Phase, Error> {
        if let phase @ (Phase::Resolved { .. } | Phase::Failed { .. }) = self.detector.phase() {
            return Ok(phase);
        }

        self.platform.cycle();
        let Some(index) = self.history.push(&self.platform) else {
            let index = self.cycles_simulated();
            let phase = self.detector.fail(index);
            log::warn!(
                "no period confirmed within {} recorded layouts ({phase:?})",
                self.history.capacity()
            );
            return Err(Error::CycleNotResolved {
                index,
                capacity: self.history.capacity(),
                phase,
            });
        };

        let phase = self.detector.observe(&self.history);
        log::trace!("cycle {index}: {phase:?}");
        Ok(phase)
    }

    /// The layout after `target` cycles.
    ///
    /// Simulates only as far as needed: either up to `target` itself, or until the
    /// layouts are proven to repeat, whichever comes first.
    pub fn run(&mut self, target: u64) -> Result<Snapshot, Error> {
        if target == 0 {
            return Err(Error::InvalidTargetCount { requested: target });
        }

        loop {
            let phase = self.detector.phase();
            if let Some(index) = phase.index_for(target, self.history.len()) {
                log::debug!(
                    "layout after {target} cycles is layout {index}; simulated {} cycles",
                    self.cycles_simulated()
                );
                return Ok(self.history.snapshot(index));
            }
            if let Phase::Failed { index } = phase {
                return Err(Error::CycleNotResolved {
                    index,
                    capacity: self.history.capacity(),
                    phase,
                });
            }
            self.step()?;
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    #[error("at least one cycle must be requested, but {requested} were")]
    InvalidTargetCount { requested: u64 },
    #[error(
        "no repeating period confirmed after {index} cycles; history holds {capacity} layouts (last phase: {phase:?})"
    )]
    CycleNotResolved {
        index: usize,
        capacity: usize,
        phase: Phase,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    /// A scripted sequence of layouts, where each layout is a label and its fingerprint
    /// is chosen freely, so that fingerprint collisions can be staged.
    struct Script {
        labels: Vec<char>,
        fingerprints: Vec<u64>,
    }

    impl Script {
        fn new() -> Self {
            Self {
                labels: Vec::new(),
                fingerprints: Vec::new(),
            }
        }

        fn push(&mut self, label: char, fingerprint: u64) {
            self.labels.push(label);
            self.fingerprints.push(fingerprint);
        }
    }

    impl Lookback for Script {
        fn len(&self) -> usize {
            self.labels.len()
        }

        fn fingerprint(&self, index: usize) -> u64 {
            self.fingerprints[index]
        }

        fn same(&self, a: usize, b: usize) -> bool {
            self.labels[a] == self.labels[b]
        }
    }

    /// Feed labels one at a time, fingerprinting each by its own label.
    fn feed(labels: &str) -> (Script, Detector, Vec<Phase>) {
        let mut script = Script::new();
        let mut detector = Detector::new();
        let mut phases = Vec::new();
        for label in labels.chars() {
            script.push(label, label as u64);
            phases.push(detector.observe(&script));
        }
        (script, detector, phases)
    }

    #[rstest]
    #[case("abcdcdcd", Phase::Resolved { start: 3, length: 2 })]
    #[case("aa", Phase::Validating { start: 0, end: 1, confirmed: 0 })]
    #[case("aaa", Phase::Resolved { start: 1, length: 1 })]
    #[case("abcabc", Phase::Validating { start: 0, end: 3, confirmed: 2 })]
    #[case("abcabca", Phase::Resolved { start: 1, length: 3 })]
    #[case("abcab", Phase::Validating { start: 0, end: 3, confirmed: 1 })]
    #[case("abcde", Phase::Searching)]
    fn detects_periods(#[case] labels: &str, #[case] expect: Phase) {
        let (_, detector, _) = feed(labels);
        assert_eq!(detector.phase(), expect);
    }

    #[test]
    fn nearest_match_wins() {
        // `a` appears at 0 and 2; the candidate must start at 2
        let (_, _, phases) = feed("abab");
        assert_eq!(phases[2], Phase::Validating { start: 0, end: 2, confirmed: 0 });
        let (_, _, phases) = feed("abaa");
        assert_eq!(phases[3], Phase::Validating { start: 2, end: 3, confirmed: 0 });
    }

    #[test]
    fn fingerprint_collision_is_discarded() {
        let mut script = Script::new();
        let mut detector = Detector::new();

        // `x` and `y` share a fingerprint but are different layouts
        for (label, fingerprint) in [('x', 7), ('p', 1), ('y', 7)] {
            script.push(label, fingerprint);
            detector.observe(&script);
        }
        assert_eq!(
            detector.phase(),
            Phase::Validating { start: 0, end: 2, confirmed: 0 }
        );

        // `q` should have matched `p` if `y` really repeated `x`
        script.push('q', 2);
        assert_eq!(detector.observe(&script), Phase::Searching);

        // the genuine repeat is still found afterwards
        for (label, fingerprint) in [('y', 7), ('q', 2), ('y', 7)] {
            script.push(label, fingerprint);
            detector.observe(&script);
        }
        assert_eq!(detector.phase(), Phase::Resolved { start: 3, length: 2 });
    }

    #[test]
    fn broken_candidate_returns_to_searching() {
        let mut script = Script::new();
        let mut detector = Detector::new();
        for (label, fingerprint) in [('a', 1), ('c', 3), ('a', 1)] {
            script.push(label, fingerprint);
            detector.observe(&script);
        }
        script.push('c', 3);
        assert_eq!(
            detector.observe(&script),
            Phase::Validating { start: 0, end: 2, confirmed: 1 }
        );
        script.push('d', 4);
        assert_eq!(detector.observe(&script), Phase::Searching);
    }

    #[test]
    fn settled_phases_stay_put() {
        let (mut script, mut detector, _) = feed("ababa");
        let resolved = detector.phase();
        assert!(matches!(resolved, Phase::Resolved { .. }));
        script.push('z', 99);
        assert_eq!(detector.observe(&script), resolved);

        assert_eq!(detector.fail(5), resolved);
        script.push('w', 98);
        assert_eq!(detector.observe(&script), Phase::Failed { index: 5 });
    }

    #[rstest]
    #[case(Phase::Searching, 3, 4, Some(3))]
    #[case(Phase::Searching, 4, 4, None)]
    #[case(Phase::Resolved { start: 2, length: 3 }, 2, 6, Some(2))]
    #[case(Phase::Resolved { start: 2, length: 3 }, 7, 6, Some(4))]
    #[case(Phase::Resolved { start: 2, length: 3 }, 8, 6, Some(2))]
    #[case(Phase::Resolved { start: 3, length: 7 }, 1_000_000_000, 11, Some(3 + (1_000_000_000 - 3) % 7))]
    #[case(Phase::Validating { start: 0, end: 2, confirmed: 1 }, 5, 4, None)]
    fn index_for(
        #[case] phase: Phase,
        #[case] target: u64,
        #[case] len: usize,
        #[case] expect: Option<usize>,
    ) {
        assert_eq!(phase.index_for(target, len), expect);
    }

    #[test]
    fn config_clamps_capacity() {
        assert_eq!(Config::default().history_capacity, 1000);
        assert_eq!(Config::default().with_history_capacity(0).history_capacity, 2);
        assert_eq!(Config::default().with_history_capacity(50).history_capacity, 50);
    }

    #[test]
    fn zero_cycles_is_rejected() {
        let platform: Platform = "O.\n.#".parse().unwrap();
        let mut simulator = Simulator::new(platform);
        assert_eq!(
            simulator.run(0).unwrap_err(),
            Error::InvalidTargetCount { requested: 0 }
        );
        assert_eq!(simulator.cycles_simulated(), 0);
    }

    #[test]
    fn small_targets_are_not_overshot() {
        let platform: Platform = "O.\n.#".parse().unwrap();
        let mut simulator = Simulator::new(platform);
        simulator.run(1).unwrap();
        assert_eq!(simulator.cycles_simulated(), 1);
    }

    #[test]
    fn exhausted_history_fails() {
        // a lone rock comes back to its corner every cycle, but proving that
        // takes more than two layouts
        let platform: Platform = "..\n.O".parse().unwrap();
        let config = Config::default().with_history_capacity(2);
        let mut simulator = Simulator::with_config(platform, config);
        let err = simulator.run(1_000).unwrap_err();
        assert!(matches!(err, Error::CycleNotResolved { capacity: 2, .. }));
        assert!(matches!(simulator.phase(), Phase::Failed { .. }));
        // asking again reports the failure without simulating further
        assert!(matches!(
            simulator.run(1_000),
            Err(Error::CycleNotResolved { index: 1, .. })
        ));
        assert_eq!(simulator.cycles_simulated(), 1);
    }
}
