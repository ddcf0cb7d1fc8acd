//! Randomized greedy vertex partition
//!
//! Splits the vertices of an [`AdjacencyGraph`] into a sparse *seed* set
//! ("odd") and the *neighbor* set ("even") around it:
//!
//! 1. draw a vertex uniformly from the unassigned pool,
//! 2. put it in `seed` and all of its neighbors in `neighbor`,
//! 3. remove it and its neighbors from the pool,
//!
//! until the pool is empty. Each round removes at least the drawn vertex, so
//! a graph with `V` vertices finishes in at most `V` rounds. Mesh graphs
//! contain odd cycles, so this is a dominating-set style sweep rather than a
//! proper two-colouring.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use meshsmooth_core::{Error, Result};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{de, Deserialize, Deserializer, Serialize};
use tracing::{debug, info};

use crate::adjacency::AdjacencyGraph;

const PROGRESS_INTERVAL: usize = 1000;
const ABSENT: usize = usize::MAX;

/// Set of indices `0..n` supporting O(1) uniform draw and O(1) removal
#[derive(Debug, Clone)]
pub struct IndexPool {
    members: Vec<usize>,
    /// Slot of each index in `members`, or `ABSENT`
    slots: Vec<usize>,
}

impl IndexPool {
    /// Pool holding every index in `0..n`
    pub fn full(n: usize) -> Self {
        Self {
            members: (0..n).collect(),
            slots: (0..n).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn contains(&self, index: usize) -> bool {
        self.slots.get(index).is_some_and(|&slot| slot != ABSENT)
    }

    /// Remove `index`, returning whether it was present
    pub fn remove(&mut self, index: usize) -> bool {
        if !self.contains(index) {
            return false;
        }
        let slot = self.slots[index];
        let last = self.members.len() - 1;
        self.members.swap(slot, last);
        self.slots[self.members[slot]] = slot;
        self.members.pop();
        self.slots[index] = ABSENT;
        true
    }

    /// Uniformly chosen member, or `None` when the pool is empty
    pub fn sample<R: Rng>(&self, rng: &mut R) -> Option<usize> {
        if self.members.is_empty() {
            None
        } else {
            Some(self.members[rng.gen_range(0..self.members.len())])
        }
    }
}

/// Which partition set survives the reduction.
///
/// Config files accept the same names as [`FromStr`]; an unknown name fails
/// with the `InvalidSelector` message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum KeepSet {
    /// The drawn vertices ("odd"); the sparser set
    Seed,
    /// The vertices claimed around each draw ("even")
    #[default]
    Neighbor,
}

impl FromStr for KeepSet {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "seed" | "odd" => Ok(KeepSet::Seed),
            "neighbor" | "neighbour" | "even" => Ok(KeepSet::Neighbor),
            other => Err(Error::InvalidSelector(format!(
                "unknown partition set '{}', expected 'seed' (odd) or 'neighbor' (even)",
                other
            ))),
        }
    }
}

impl<'de> Deserialize<'de> for KeepSet {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let name = String::deserialize(deserializer)?;
        name.parse().map_err(de::Error::custom)
    }
}

impl fmt::Display for KeepSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeepSet::Seed => write!(f, "seed"),
            KeepSet::Neighbor => write!(f, "neighbor"),
        }
    }
}

/// In-progress partition: every vertex is in exactly one of the pool, `seed`
/// or `neighbor`
#[derive(Debug, Clone)]
pub struct PartitionState {
    unassigned: IndexPool,
    seed: BTreeSet<usize>,
    neighbor: BTreeSet<usize>,
    rounds: usize,
}

impl PartitionState {
    /// All `vertex_count` vertices unassigned
    pub fn new(vertex_count: usize) -> Self {
        Self {
            unassigned: IndexPool::full(vertex_count),
            seed: BTreeSet::new(),
            neighbor: BTreeSet::new(),
            rounds: 0,
        }
    }

    /// Run one round and return the drawn vertex, or `None` when complete.
    ///
    /// # Panics
    /// If `graph` has fewer vertices than the state was created with.
    pub fn step<R: Rng>(&mut self, graph: &AdjacencyGraph, rng: &mut R) -> Option<usize> {
        let current = self.unassigned.sample(rng)?;

        self.seed.insert(current);
        self.unassigned.remove(current);
        for &n in graph.neighbors(current) {
            self.neighbor.insert(n);
            self.unassigned.remove(n);
        }

        self.rounds += 1;
        Some(current)
    }

    pub fn unassigned_len(&self) -> usize {
        self.unassigned.len()
    }

    pub fn seed(&self) -> &BTreeSet<usize> {
        &self.seed
    }

    pub fn neighbor(&self) -> &BTreeSet<usize> {
        &self.neighbor
    }

    pub fn rounds(&self) -> usize {
        self.rounds
    }

    pub fn is_complete(&self) -> bool {
        self.unassigned.is_empty()
    }

    /// Resolve overlap and freeze the result.
    ///
    /// A vertex in both sets stays in `seed` and leaves `neighbor`, so the
    /// two sets remain disjoint and still cover every assigned vertex.
    pub fn finish(self) -> Partition {
        let neighbor: BTreeSet<usize> = self.neighbor.difference(&self.seed).copied().collect();
        Partition {
            seed: self.seed,
            neighbor,
            rounds: self.rounds,
        }
    }
}

/// Completed, disjoint partition of a graph's vertices
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Partition {
    pub seed: BTreeSet<usize>,
    pub neighbor: BTreeSet<usize>,
    /// Number of draws taken
    pub rounds: usize,
}

impl Partition {
    /// The set selected by `keep`, in ascending index order
    pub fn kept(&self, keep: KeepSet) -> &BTreeSet<usize> {
        match keep {
            KeepSet::Seed => &self.seed,
            KeepSet::Neighbor => &self.neighbor,
        }
    }

    /// Total number of partitioned vertices
    pub fn len(&self) -> usize {
        self.seed.len() + self.neighbor.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seed.is_empty() && self.neighbor.is_empty()
    }
}

/// Partition every vertex of `graph` using the supplied generator.
pub fn partition<R: Rng>(graph: &AdjacencyGraph, rng: &mut R) -> Partition {
    let mut state = PartitionState::new(graph.vertex_count());
    debug!("Partitioning {} vertices", graph.vertex_count());

    while state.step(graph, rng).is_some() {
        if state.rounds() % PROGRESS_INTERVAL == 0 {
            debug!(
                rounds = state.rounds(),
                "{} vertices left to categorize",
                state.unassigned_len()
            );
        }
    }

    let result = state.finish();
    info!(
        "Partitioned {} vertices in {} rounds: {} seed, {} neighbor",
        graph.vertex_count(),
        result.rounds,
        result.seed.len(),
        result.neighbor.len()
    );
    result
}

/// Partition with a generator seeded from `seed`, or from OS entropy when `None`.
pub fn partition_seeded(graph: &AdjacencyGraph, seed: Option<u64>) -> Partition {
    let mut rng = match seed {
        Some(s) => StdRng::seed_from_u64(s),
        None => StdRng::from_entropy(),
    };
    partition(graph, &mut rng)
}
