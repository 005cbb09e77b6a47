//! Subtype lattice over the type universe.
//!
//! A [`SubtypeLattice`] records immediate `child <: supertype` edges during a
//! build phase and answers reachability, meet and join once frozen.
//!
//! # Lifecycle
//!
//! ```text
//! Building --freeze()--> Frozen
//! ```
//!
//! - `add_edge` and `set_policy` only succeed while Building.
//! - Queries (`is_subtype`, `meet`, `join`, `supertypes_of`, `subtypes_of`)
//!   only succeed once Frozen. Every query takes `&self` and mutates
//!   nothing, so a frozen lattice can be read from any number of threads.
//!
//! # Acyclicity
//!
//! An edge is rejected with [`CoreError::CycleDetected`] when its supertype
//! already reaches its child. `freeze` re-checks the whole graph with a
//! topological sort before committing.
//!
//! # Subtyping
//!
//! `is_subtype` is the reflexive-transitive closure of the declared edges.
//! `never` and `any` get no implicit edges: `x <: any` holds only when a path
//! to `any` was declared.

use rustc_hash::FxHashMap;
use smallvec::SmallVec;

use crate::{CoreError, TypeBitSet, TypeId};

/// Declared neighbours of one node, in insertion order.
type EdgeList = SmallVec<[TypeId; 4]>;

type Adjacency = FxHashMap<TypeId, EdgeList>;

/// Lattice lifecycle stage.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Phase {
    /// Edges may be added; queries are rejected.
    Building,
    /// Read-only; queries are answered.
    Frozen,
}

/// How `meet` and `join` treat operands that are not ancestor-related.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum MeetJoinPolicy {
    /// Incomparable operands meet at `never` and join at `any`.
    #[default]
    Direct,
    /// Incomparable operands meet at their unique greatest common subtype
    /// and join at their unique least common supertype. No common bound, or
    /// several unrelated ones, falls back to `never` / `any`.
    CommonBound,
}

/// Directed graph of immediate subtype edges.
#[derive(Clone, Debug, Default)]
pub struct SubtypeLattice {
    /// child -> immediate supertypes.
    supertypes: Adjacency,
    /// supertype -> immediate subtypes.
    subtypes: Adjacency,
    edge_count: usize,
    frozen: bool,
    policy: MeetJoinPolicy,
}

impl SubtypeLattice {
    /// An empty lattice in the Building phase with the `Direct` policy.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_policy(policy: MeetJoinPolicy) -> Self {
        Self {
            policy,
            ..Self::default()
        }
    }

    pub fn phase(&self) -> Phase {
        if self.frozen {
            Phase::Frozen
        } else {
            Phase::Building
        }
    }

    pub fn is_frozen(&self) -> bool {
        self.frozen
    }

    pub fn policy(&self) -> MeetJoinPolicy {
        self.policy
    }

    /// Number of distinct declared edges.
    pub fn edge_count(&self) -> usize {
        self.edge_count
    }

    fn ensure_building(&self) -> Result<(), CoreError> {
        if self.frozen {
            Err(CoreError::LatticeAlreadyFrozen)
        } else {
            Ok(())
        }
    }

    fn ensure_frozen(&self) -> Result<(), CoreError> {
        if self.frozen {
            Ok(())
        } else {
            Err(CoreError::LatticeNotFrozen)
        }
    }

    // === Build phase ===

    pub fn set_policy(&mut self, policy: MeetJoinPolicy) -> Result<(), CoreError> {
        self.ensure_building()?;
        self.policy = policy;
        Ok(())
    }

    /// Declare `supertype` as an immediate supertype of `child`.
    ///
    /// Returns `false` if the edge was already declared. Rejects self edges
    /// and edges that would close a cycle, leaving the graph unchanged.
    #[tracing::instrument(level = "trace", skip(self))]
    pub fn add_edge(&mut self, child: TypeId, supertype: TypeId) -> Result<bool, CoreError> {
        child.index()?;
        supertype.index()?;
        self.ensure_building()?;

        if self
            .supertypes
            .get(&child)
            .is_some_and(|supers| supers.contains(&supertype))
        {
            return Ok(false);
        }
        if child == supertype || reaches(&self.supertypes, supertype, child) {
            tracing::debug!(%child, %supertype, "rejected cyclic subtype edge");
            return Err(CoreError::CycleDetected { child, supertype });
        }

        self.supertypes.entry(child).or_default().push(supertype);
        self.subtypes.entry(supertype).or_default().push(child);
        self.edge_count += 1;
        Ok(true)
    }

    /// End the build phase. The graph is read-only afterwards.
    pub fn freeze(&mut self) -> Result<(), CoreError> {
        self.ensure_building()?;
        self.check_acyclic()?;
        self.frozen = true;
        tracing::debug!(
            edges = self.edge_count,
            nodes = self.node_count(),
            policy = ?self.policy,
            "subtype lattice frozen"
        );
        Ok(())
    }

    /// Number of ids that appear in at least one edge.
    fn node_count(&self) -> usize {
        self.supertypes
            .keys()
            .chain(self.subtypes.keys())
            .fold(TypeBitSet::new(), |mut seen, id| {
                seen.insert_slot(id.slot());
                seen
            })
            .cardinality()
    }

    /// Kahn's algorithm over the supertype edges.
    fn check_acyclic(&self) -> Result<(), CoreError> {
        let mut pending: FxHashMap<TypeId, usize> = FxHashMap::default();
        for (&child, supers) in &self.supertypes {
            pending.entry(child).or_insert(0);
            for &s in supers {
                *pending.entry(s).or_insert(0) += 1;
            }
        }

        let mut ready: Vec<TypeId> = pending
            .iter()
            .filter(|&(_, &n)| n == 0)
            .map(|(&id, _)| id)
            .collect();
        let mut done = 0;
        while let Some(id) = ready.pop() {
            done += 1;
            for s in self.supertypes.get(&id).into_iter().flatten() {
                if let Some(n) = pending.get_mut(s) {
                    *n -= 1;
                    if *n == 0 {
                        ready.push(*s);
                    }
                }
            }
        }

        if done == pending.len() {
            return Ok(());
        }
        // Every node left with a non-zero count sits on or behind a cycle;
        // report an edge between two of them.
        let stuck = |id: TypeId| pending.get(&id).is_some_and(|&n| n > 0);
        for (&child, supers) in &self.supertypes {
            if let Some(&supertype) = supers.iter().find(|&&s| stuck(s)) {
                if stuck(child) {
                    return Err(CoreError::CycleDetected { child, supertype });
                }
            }
        }
        Err(CoreError::InvalidArgument("subtype graph is not acyclic"))
    }

    // === Inspection (any phase) ===

    /// Declared immediate supertypes of `id`, in declaration order.
    pub fn immediate_supertypes(&self, id: TypeId) -> Result<&[TypeId], CoreError> {
        id.index()?;
        Ok(self
            .supertypes
            .get(&id)
            .map(|s| s.as_slice())
            .unwrap_or_default())
    }

    /// Declared immediate subtypes of `id`, in declaration order.
    pub fn immediate_subtypes(&self, id: TypeId) -> Result<&[TypeId], CoreError> {
        id.index()?;
        Ok(self
            .subtypes
            .get(&id)
            .map(|s| s.as_slice())
            .unwrap_or_default())
    }

    // === Queries (Frozen only) ===

    /// Whether `a <: b`.
    pub fn is_subtype(&self, a: TypeId, b: TypeId) -> Result<bool, CoreError> {
        a.index()?;
        b.index()?;
        self.ensure_frozen()?;
        Ok(a == b || reaches(&self.supertypes, a, b))
    }

    /// `a` and everything it is a subtype of.
    pub fn supertypes_of(&self, a: TypeId) -> Result<TypeBitSet, CoreError> {
        a.index()?;
        self.ensure_frozen()?;
        Ok(closure(&self.supertypes, a))
    }

    /// `a` and everything that is a subtype of it.
    pub fn subtypes_of(&self, a: TypeId) -> Result<TypeBitSet, CoreError> {
        a.index()?;
        self.ensure_frozen()?;
        Ok(closure(&self.subtypes, a))
    }

    /// Greatest lower bound of `a` and `b`.
    pub fn meet(&self, a: TypeId, b: TypeId) -> Result<TypeId, CoreError> {
        a.index()?;
        b.index()?;
        self.ensure_frozen()?;
        if a == b || reaches(&self.supertypes, a, b) {
            return Ok(a);
        }
        if reaches(&self.supertypes, b, a) {
            return Ok(b);
        }
        Ok(match self.policy {
            MeetJoinPolicy::Direct => TypeId::NEVER,
            MeetJoinPolicy::CommonBound => {
                unique_nearest(&self.subtypes, a, b).unwrap_or(TypeId::NEVER)
            }
        })
    }

    /// Least upper bound of `a` and `b`.
    pub fn join(&self, a: TypeId, b: TypeId) -> Result<TypeId, CoreError> {
        a.index()?;
        b.index()?;
        self.ensure_frozen()?;
        if a == b || reaches(&self.supertypes, a, b) {
            return Ok(b);
        }
        if reaches(&self.supertypes, b, a) {
            return Ok(a);
        }
        Ok(match self.policy {
            MeetJoinPolicy::Direct => TypeId::ANY,
            MeetJoinPolicy::CommonBound => {
                unique_nearest(&self.supertypes, a, b).unwrap_or(TypeId::ANY)
            }
        })
    }
}

/// Breadth-first search from `from` along `edges`, stopping at `to`.
///
/// Each node is visited at most once, so the walk is bounded by the
/// universe size even on dense graphs.
fn reaches(edges: &Adjacency, from: TypeId, to: TypeId) -> bool {
    let mut visited = TypeBitSet::new();
    let mut queue = vec![from];
    visited.insert_slot(from.slot());

    let mut front = 0;
    while let Some(&current) = queue.get(front) {
        front += 1;
        for &next in edges.get(&current).into_iter().flatten() {
            if next == to {
                return true;
            }
            if visited.insert_slot(next.slot()) {
                queue.push(next);
            }
        }
    }
    false
}

/// Every node reachable from `start` along `edges`, including `start`.
fn closure(edges: &Adjacency, start: TypeId) -> TypeBitSet {
    let mut visited = TypeBitSet::new();
    let mut queue = vec![start];
    visited.insert_slot(start.slot());

    while let Some(current) = queue.pop() {
        for &next in edges.get(&current).into_iter().flatten() {
            if visited.insert_slot(next.slot()) {
                queue.push(next);
            }
        }
    }
    visited
}

/// The single nearest node reachable from both `a` and `b` along `edges`.
///
/// Common nodes that are themselves reachable from another common node are
/// not nearest. `None` when there is no common node or when several
/// unrelated ones tie.
fn unique_nearest(edges: &Adjacency, a: TypeId, b: TypeId) -> Option<TypeId> {
    let common = closure(edges, a).intersect(&closure(edges, b));
    let mut beyond = TypeBitSet::new();
    for id in &common {
        for &next in edges.get(&id).into_iter().flatten() {
            beyond.union_in_place(&closure(edges, next));
        }
    }
    let nearest = common.difference(&beyond);
    match nearest.cardinality() {
        1 => nearest.first(),
        _ => None,
    }
}
