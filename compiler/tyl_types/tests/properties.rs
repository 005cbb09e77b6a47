//! Property-based tests for the type-set algebra and the subtype lattice.
//!
//! Sets are generated two ways: dense random word arrays, which hit every
//! chunk of every width, and short id lists, which look like real type sets.

#![allow(clippy::unwrap_used, clippy::expect_used, reason = "Tests can panic")]
#![allow(
    clippy::doc_markdown,
    clippy::redundant_closure_for_method_calls,
    reason = "Proptest macros generate code with these patterns"
)]

use proptest::prelude::*;
use tyl_types::kernel::{Words, WORDS};
use tyl_types::{
    ChunkWidth, CoreError, MeetJoinPolicy, SetOp, SubtypeLattice, TypeBitSet, TypeId, UNIVERSE,
};

// -- Strategies --

fn words_strategy() -> impl Strategy<Value = Words> {
    prop::collection::vec(any::<u64>(), WORDS).prop_map(|v| {
        let mut words = [0u64; WORDS];
        words.copy_from_slice(&v);
        words
    })
}

fn dense_set() -> impl Strategy<Value = TypeBitSet> {
    words_strategy().prop_map(TypeBitSet::from_words)
}

fn sparse_set() -> impl Strategy<Value = TypeBitSet> {
    prop::collection::vec(0..UNIVERSE as u64, 0..48).prop_map(|raw| {
        let ids: Vec<TypeId> = raw.into_iter().map(TypeId::from_raw).collect();
        TypeBitSet::from_ids(&ids).unwrap()
    })
}

fn any_set() -> impl Strategy<Value = TypeBitSet> {
    prop_oneof![dense_set(), sparse_set()]
}

fn op_strategy() -> impl Strategy<Value = SetOp> {
    prop_oneof![
        Just(SetOp::Union),
        Just(SetOp::Intersection),
        Just(SetOp::Difference),
    ]
}

/// Nodes of generated lattices live at `FIRST_DYNAMIC..FIRST_DYNAMIC + NODES`.
const NODES: u64 = 16;

fn node(i: u64) -> TypeId {
    TypeId::from_raw(TypeId::FIRST_DYNAMIC + i)
}

/// Edges that always point from a higher node index to a lower one, so any
/// subset of them is acyclic.
fn dag_edges() -> impl Strategy<Value = Vec<(TypeId, TypeId)>> {
    prop::collection::vec((0..NODES, 0..NODES), 0..40).prop_map(|pairs| {
        pairs
            .into_iter()
            .filter(|(a, b)| a != b)
            .map(|(a, b)| (node(a.max(b)), node(a.min(b))))
            .collect()
    })
}

fn build(edges: &[(TypeId, TypeId)], policy: MeetJoinPolicy) -> SubtypeLattice {
    let mut lattice = SubtypeLattice::with_policy(policy);
    for &(child, supertype) in edges {
        lattice.add_edge(child, supertype).unwrap();
    }
    lattice.freeze().unwrap();
    lattice
}

fn policy_strategy() -> impl Strategy<Value = MeetJoinPolicy> {
    prop_oneof![
        Just(MeetJoinPolicy::Direct),
        Just(MeetJoinPolicy::CommonBound)
    ]
}

// -- Chunk widths --

proptest! {
    #![proptest_config(ProptestConfig::with_cases(10_000))]

    #[test]
    fn every_width_computes_the_same_words(
        a in words_strategy(),
        b in words_strategy(),
        op in op_strategy(),
    ) {
        let a = TypeBitSet::from_words(a);
        let b = TypeBitSet::from_words(b);
        let scalar = a.combine_with(&b, op, ChunkWidth::Scalar);
        for width in ChunkWidth::ALL {
            prop_assert_eq!(&a.combine_with(&b, op, width), &scalar, "{:?} {:?}", width, op);

            let mut acc = a.clone();
            acc.combine_in_place_with(&b, op, width);
            prop_assert_eq!(&acc, &scalar, "in place {:?} {:?}", width, op);
        }
    }
}

// -- Set laws --

proptest! {
    #[test]
    fn union_and_intersection_commute(a in any_set(), b in any_set()) {
        prop_assert_eq!(a.union(&b), b.union(&a));
        prop_assert_eq!(a.intersect(&b), b.intersect(&a));
    }

    #[test]
    fn union_and_intersection_associate(a in any_set(), b in any_set(), c in any_set()) {
        prop_assert_eq!(a.union(&b).union(&c), a.union(&b.union(&c)));
        prop_assert_eq!(a.intersect(&b).intersect(&c), a.intersect(&b.intersect(&c)));
    }

    #[test]
    fn operations_are_idempotent(a in any_set()) {
        prop_assert_eq!(&a.union(&a), &a);
        prop_assert_eq!(&a.intersect(&a), &a);
        prop_assert!(a.difference(&a).is_empty());
    }

    #[test]
    fn difference_is_intersection_with_complement(a in any_set(), b in any_set()) {
        prop_assert_eq!(a.difference(&b), a.intersect(&b.complement()));
    }

    #[test]
    fn subset_matches_intersection(a in any_set(), b in any_set()) {
        prop_assert_eq!(a.is_subset_of(&b), a.intersect(&b) == a);
        prop_assert!(a.intersect(&b).is_subset_of(&a));
        prop_assert!(a.is_subset_of(&a.union(&b)));
    }

    #[test]
    fn inclusion_exclusion(a in any_set(), b in any_set()) {
        prop_assert_eq!(
            a.union(&b).cardinality() + a.intersect(&b).cardinality(),
            a.cardinality() + b.cardinality()
        );
    }

    #[test]
    fn complement_partitions_the_universe(a in any_set()) {
        let c = a.complement();
        prop_assert!(a.intersect(&c).is_empty());
        prop_assert_eq!(a.cardinality() + c.cardinality(), UNIVERSE);
    }

    #[test]
    fn iteration_is_ascending_and_complete(a in any_set()) {
        let ids = a.to_vec();
        prop_assert_eq!(ids.len(), a.cardinality());
        prop_assert!(ids.windows(2).all(|w| w[0] < w[1]));
        for id in &ids {
            prop_assert_eq!(a.contains(*id), Ok(true));
        }
        prop_assert_eq!(a.first(), ids.first().copied());
        prop_assert_eq!(a.last(), ids.last().copied());
    }

    #[test]
    fn insert_contains_remove(raw in any::<u64>(), a in sparse_set()) {
        let id = TypeId::from_raw(raw);
        let mut set = a.clone();
        if id.is_valid() {
            let was_present = set.contains(id).unwrap();
            prop_assert_eq!(set.insert(id), Ok(!was_present));
            prop_assert_eq!(set.contains(id), Ok(true));
            prop_assert_eq!(set.remove(id), Ok(true));
            prop_assert_eq!(set.contains(id), Ok(false));
        } else {
            let err = CoreError::InvalidTypeId { raw };
            prop_assert_eq!(set.insert(id), Err(err));
            prop_assert_eq!(set.contains(id), Err(err));
            prop_assert_eq!(set.remove(id), Err(err));
            prop_assert_eq!(&set, &a);
        }
    }
}

// -- Lattice laws --

proptest! {
    #[test]
    fn generated_dags_always_freeze(edges in dag_edges()) {
        let lattice = build(&edges, MeetJoinPolicy::Direct);
        prop_assert!(lattice.is_frozen());
    }

    #[test]
    fn subtyping_is_a_partial_order(edges in dag_edges()) {
        let lattice = build(&edges, MeetJoinPolicy::Direct);
        for x in (0..NODES).map(node) {
            prop_assert_eq!(lattice.is_subtype(x, x), Ok(true));
            for y in (0..NODES).map(node) {
                let xy = lattice.is_subtype(x, y).unwrap();
                let yx = lattice.is_subtype(y, x).unwrap();
                if x != y {
                    prop_assert!(!(xy && yx), "{} and {} are mutual subtypes", x, y);
                }
                for z in (0..NODES).map(node) {
                    if xy && lattice.is_subtype(y, z).unwrap() {
                        prop_assert_eq!(lattice.is_subtype(x, z), Ok(true));
                    }
                }
            }
        }
    }

    #[test]
    fn closures_agree_with_is_subtype(edges in dag_edges()) {
        let lattice = build(&edges, MeetJoinPolicy::Direct);
        for x in (0..NODES).map(node) {
            let ups = lattice.supertypes_of(x).unwrap();
            let downs = lattice.subtypes_of(x).unwrap();
            for y in (0..NODES).map(node) {
                prop_assert_eq!(ups.contains(y), lattice.is_subtype(x, y));
                prop_assert_eq!(downs.contains(y), lattice.is_subtype(y, x));
            }
        }
    }

    #[test]
    fn meet_and_join_are_bounds(edges in dag_edges(), policy in policy_strategy()) {
        let lattice = build(&edges, policy);
        for a in (0..NODES).map(node) {
            for b in (0..NODES).map(node) {
                let meet = lattice.meet(a, b).unwrap();
                let join = lattice.join(a, b).unwrap();
                prop_assert_eq!(lattice.meet(b, a), Ok(meet));
                prop_assert_eq!(lattice.join(b, a), Ok(join));
                if meet != TypeId::NEVER {
                    prop_assert_eq!(lattice.is_subtype(meet, a), Ok(true));
                    prop_assert_eq!(lattice.is_subtype(meet, b), Ok(true));
                }
                if join != TypeId::ANY {
                    prop_assert_eq!(lattice.is_subtype(a, join), Ok(true));
                    prop_assert_eq!(lattice.is_subtype(b, join), Ok(true));
                }
                if lattice.is_subtype(a, b).unwrap() {
                    prop_assert_eq!(meet, a);
                    prop_assert_eq!(join, b);
                }
            }
        }
    }
}
