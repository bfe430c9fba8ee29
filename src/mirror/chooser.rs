//! Mirror selection strategies.
//!
//! A chooser is a ranked snapshot of the health store taken at
//! construction time. It hands each candidate out at most once, so a
//! mirror that already failed within the current attempt is never
//! re-returned while an alternative exists. Concurrent tasks build their
//! own choosers and are unaffected by each other's consumption.

use rand::seq::SliceRandom;
use tracing::warn;

use super::{Mirror, MirrorError, MirrorStore, Result};

/// Ranking strategy applied when the chooser snapshot is built.
///
/// Strategies are a fixed set of variants rather than trait objects;
/// adding one means adding a variant and a ranking arm.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ChooserStrategy {
    /// Rank by descending success rate, tie-break on fewer failures,
    /// then insertion order.
    #[default]
    AvailabilityFirst,
    /// Hand out candidates in insertion order.
    RoundRobin,
    /// Hand out candidates in shuffled order.
    Random,
}

impl ChooserStrategy {
    /// Returns the stable config-file label for this strategy.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::AvailabilityFirst => "availability_first",
            Self::RoundRobin => "round_robin",
            Self::Random => "random",
        }
    }

    /// Parses a config-file label, falling back to the default with a
    /// warning on unknown names so a typo never disables resolution.
    #[must_use]
    pub fn from_config(label: &str) -> Self {
        match label {
            "availability_first" => Self::AvailabilityFirst,
            "round_robin" => Self::RoundRobin,
            "random" => Self::Random,
            unknown => {
                warn!(
                    strategy = %unknown,
                    "unknown chooser strategy; using availability_first"
                );
                Self::AvailabilityFirst
            }
        }
    }
}

impl std::fmt::Display for ChooserStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Ranked, consumable snapshot of mirror candidates.
#[derive(Debug)]
pub struct MirrorChooser {
    candidates: Vec<Mirror>,
    cursor: usize,
}

impl MirrorChooser {
    /// Builds a chooser over the given candidates with the strategy's
    /// ranking applied.
    #[must_use]
    pub fn new(mut candidates: Vec<Mirror>, strategy: ChooserStrategy) -> Self {
        match strategy {
            ChooserStrategy::AvailabilityFirst => {
                // Stable sort keeps insertion order for full ties.
                candidates.sort_by(|a, b| {
                    b.score()
                        .total_cmp(&a.score())
                        .then_with(|| a.failed_times.cmp(&b.failed_times))
                });
            }
            ChooserStrategy::RoundRobin => {}
            ChooserStrategy::Random => {
                candidates.shuffle(&mut rand::thread_rng());
            }
        }

        Self {
            candidates,
            cursor: 0,
        }
    }

    /// Builds a chooser from the health store's current state.
    ///
    /// The snapshot does not observe store updates made afterwards;
    /// callers wanting fresher statistics build a new chooser.
    ///
    /// # Errors
    ///
    /// Returns [`MirrorError::Database`] if reading the store fails.
    pub async fn from_store(store: &MirrorStore, strategy: ChooserStrategy) -> Result<Self> {
        let candidates = store.get_all().await?;
        Ok(Self::new(candidates, strategy))
    }

    /// Hands out the next candidate.
    ///
    /// # Errors
    ///
    /// Returns [`MirrorError::NoMirrorAvailable`] when the candidate set
    /// is empty or every candidate has already been handed out.
    pub fn next(&mut self) -> Result<Mirror> {
        let mirror = self
            .candidates
            .get(self.cursor)
            .cloned()
            .ok_or(MirrorError::NoMirrorAvailable)?;
        self.cursor += 1;
        Ok(mirror)
    }

    /// Total candidate count in the snapshot.
    ///
    /// Zero means the store holds no persisted mirrors; callers fall back
    /// to [`DEFAULT_MIRROR_URL`](super::DEFAULT_MIRROR_URL).
    #[must_use]
    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    /// Returns true when the snapshot holds no candidates.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }
}
