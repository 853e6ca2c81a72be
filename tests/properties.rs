//! Property-based tests for the universal vector invariants.

use proptest::prelude::*;

use bitvector::{BitSlice, ConcurrentVector, RoaringVector, Vector};

/// Model-checked bit-slice operations.
#[derive(Clone, Debug)]
enum SliceOp {
    Push(bool),
    Insert(usize, bool),
    Remove(usize),
    Set(usize, bool),
}

fn slice_op() -> impl Strategy<Value = SliceOp> {
    prop_oneof![
        any::<bool>().prop_map(SliceOp::Push),
        (0usize..300, any::<bool>()).prop_map(|(i, v)| SliceOp::Insert(i, v)),
        (0usize..300).prop_map(SliceOp::Remove),
        (0usize..300, any::<bool>()).prop_map(|(i, v)| SliceOp::Set(i, v)),
    ]
}

proptest! {
    /// The bit slice agrees with a Vec<bool> model under arbitrary
    /// push/insert/remove/set sequences.
    #[test]
    fn prop_bitslice_matches_model(ops in prop::collection::vec(slice_op(), 0..200)) {
        let mut slice = BitSlice::new();
        let mut model: Vec<bool> = Vec::new();

        for op in ops {
            match op {
                SliceOp::Push(v) => {
                    slice.push(v);
                    model.push(v);
                }
                SliceOp::Insert(i, v) => {
                    let ok = slice.insert(i, v);
                    prop_assert_eq!(ok, i <= model.len());
                    if ok {
                        model.insert(i, v);
                    }
                }
                SliceOp::Remove(i) => {
                    let ok = slice.remove(i);
                    prop_assert_eq!(ok, i < model.len());
                    if ok {
                        model.remove(i);
                    }
                }
                SliceOp::Set(i, v) => {
                    let ok = slice.set(i, v);
                    prop_assert_eq!(ok, i < model.len());
                    if ok {
                        model[i] = v;
                    }
                }
            }
        }

        prop_assert_eq!(slice.len(), model.len());
        for (i, &v) in model.iter().enumerate() {
            prop_assert_eq!(slice.get(i), v, "position {}", i);
        }
        let expected_ones = model.iter().filter(|&&v| v).count() as u64;
        prop_assert_eq!(slice.count_ones(), expected_ones);
        // Positions past the end read as zero
        prop_assert!(!slice.get(model.len()));
    }

    /// set/unset/xor/get on the simple dense vector, against the declared
    /// bit positions.
    #[test]
    fn prop_dense_set_get(
        capacity in 1u64..2000,
        indices in prop::collection::vec(0u64..2000, 1..64),
    ) {
        let mut vec = Vector::new(capacity).unwrap();
        for &i in &indices {
            if vec.set(i) {
                prop_assert_eq!(vec.get(i), 1);
                prop_assert!(vec.unset(i));
                prop_assert_eq!(vec.get(i), 0);
                let before = vec.get(i);
                prop_assert!(vec.xor(i));
                prop_assert!(vec.xor(i));
                prop_assert_eq!(vec.get(i), before);
            } else {
                prop_assert_eq!(vec.get(i), 0);
            }
        }
    }

    /// size() tracks popcount() across mixed dense mutations.
    #[test]
    fn prop_dense_size_matches_popcount(
        capacity in 64u64..4000,
        ops in prop::collection::vec((0u64..4000, 0u8..3), 0..200),
    ) {
        let mut vec = Vector::new(capacity).unwrap();
        for (i, kind) in ops {
            match kind {
                0 => { vec.set(i); }
                1 => { vec.unset(i); }
                _ => { vec.xor(i); }
            }
        }
        prop_assert_eq!(vec.size(), vec.popcount());

        let total: u64 = (0..capacity as usize / 8 * 8 + 8)
            .map(|i| vec.get(i as u64) as u64)
            .sum();
        prop_assert_eq!(vec.popcount(), total);
    }

    /// The concurrent vector maintains the same counter invariant.
    #[test]
    fn prop_concurrent_size_matches_popcount(
        capacity in 32u64..2000,
        ops in prop::collection::vec((0u64..2000, 0u8..3), 0..200),
    ) {
        let vec = ConcurrentVector::new(capacity, 2).unwrap();
        for (i, kind) in ops {
            match kind {
                0 => { vec.set(i); }
                1 => { vec.unset(i); }
                _ => { vec.xor(i); }
            }
        }
        prop_assert_eq!(vec.size(), vec.popcount());
    }

    /// Dense difference is the hamming distance of the two buffers.
    #[test]
    fn prop_dense_difference(
        a_bits in prop::collection::vec(0u64..512, 0..64),
        b_bits in prop::collection::vec(0u64..512, 0..64),
    ) {
        let mut a = Vector::new(512).unwrap();
        let mut b = Vector::new(512).unwrap();
        for &i in &a_bits {
            a.set(i);
        }
        for &i in &b_bits {
            b.set(i);
        }

        let expected: u64 = (0..520).map(|i| (a.get(i) ^ b.get(i)) as u64).sum();
        prop_assert_eq!(a.difference(&b).unwrap(), expected);
        prop_assert_eq!(b.difference(&a).unwrap(), expected);
        prop_assert_eq!(a.difference(&a.clone()).unwrap(), 0);
    }

    /// Dense merge is a bitwise union and keeps the counter honest.
    #[test]
    fn prop_dense_merge(
        a_bits in prop::collection::vec(0u64..512, 0..64),
        b_bits in prop::collection::vec(0u64..512, 0..64),
    ) {
        let mut a = Vector::new(512).unwrap();
        let mut b = Vector::new(512).unwrap();
        for &i in &a_bits {
            a.set(i);
        }
        for &i in &b_bits {
            b.set(i);
        }
        let a_pre = a.popcount();

        a.merge(&b).unwrap();
        for i in 0..520 {
            let expected = a_bits.contains(&i) || b_bits.contains(&i);
            prop_assert_eq!(a.get(i) == 1, expected, "bit {}", i);
        }
        prop_assert_eq!(a.size(), a.popcount());
        prop_assert!(a.popcount() >= a_pre.max(b.popcount()));
    }

    /// Roaring set/get/unset over sparse 64-bit keys.
    #[test]
    fn prop_roaring_set_get(keys in prop::collection::vec(any::<u64>(), 1..64)) {
        let mut vec = RoaringVector::new();
        for &x in &keys {
            assert!(vec.set(x));
            prop_assert_eq!(vec.get(x), 1);
        }

        let distinct: std::collections::BTreeSet<u64> = keys.iter().copied().collect();
        prop_assert_eq!(vec.popcount(), distinct.len() as u64);

        for &x in &distinct {
            prop_assert!(vec.unset(x));
            prop_assert_eq!(vec.get(x), 0);
        }
        prop_assert_eq!(vec.popcount(), 0);
        prop_assert!(vec.keys().is_empty());
    }

    /// Roaring keys stay strictly ascending whatever the insert order.
    #[test]
    fn prop_roaring_keys_sorted(keys in prop::collection::vec(any::<u64>(), 0..64)) {
        let mut vec = RoaringVector::new();
        for &x in &keys {
            vec.set(x);
        }
        prop_assert!(vec.keys().windows(2).all(|w| w[0] < w[1]));
    }

    /// difference(a, b) == popcount(a) + popcount(b) - 2 * popcount(a ∩ b)
    #[test]
    fn prop_roaring_difference_identity(
        a_keys in prop::collection::vec(0u64..(1 << 34), 0..48),
        b_keys in prop::collection::vec(0u64..(1 << 34), 0..48),
    ) {
        let mut a = RoaringVector::new();
        let mut b = RoaringVector::new();
        for &x in &a_keys {
            a.set(x);
        }
        for &x in &b_keys {
            b.set(x);
        }

        let mut inter = a.clone();
        inter.filter(&b).unwrap();

        prop_assert_eq!(a.difference(&a.clone()), 0);
        prop_assert_eq!(
            a.difference(&b),
            a.popcount() + b.popcount() - 2 * inter.popcount()
        );
        prop_assert_eq!(a.difference(&b), b.difference(&a));
    }

    /// Merging is a union; the receiver ends up containing both sides.
    #[test]
    fn prop_roaring_merge_union(
        a_keys in prop::collection::vec(0u64..(1 << 34), 0..48),
        b_keys in prop::collection::vec(0u64..(1 << 34), 0..48),
    ) {
        let mut a = RoaringVector::new();
        let mut b = RoaringVector::new();
        for &x in &a_keys {
            a.set(x);
        }
        for &x in &b_keys {
            b.set(x);
        }

        let mut merged = a.clone();
        merged.merge(&b).unwrap();
        for &x in a_keys.iter().chain(b_keys.iter()) {
            prop_assert_eq!(merged.get(x), 1, "bit {:#x}", x);
        }

        let distinct: std::collections::BTreeSet<u64> =
            a_keys.iter().chain(b_keys.iter()).copied().collect();
        prop_assert_eq!(merged.popcount(), distinct.len() as u64);
    }

    /// Mutating a clone never leaks into the original.
    #[test]
    fn prop_roaring_clone_independent(
        keys in prop::collection::vec(any::<u64>(), 1..48),
        extra in any::<u64>(),
    ) {
        let mut original = RoaringVector::new();
        for &x in &keys {
            original.set(x);
        }
        let before = original.popcount();

        let mut copy = original.clone();
        copy.set(extra);
        copy.unset(keys[0]);
        copy.xor(extra.wrapping_add(1));

        prop_assert_eq!(original.popcount(), before);
        for &x in &keys {
            prop_assert_eq!(original.get(x), 1, "bit {:#x}", x);
        }
    }

    /// Same independence through the lazy COW share.
    #[test]
    fn prop_roaring_share_independent(
        keys in prop::collection::vec(any::<u64>(), 1..48),
        extra in any::<u64>(),
    ) {
        let mut original = RoaringVector::new();
        for &x in &keys {
            original.set(x);
        }
        let before = original.popcount();

        let mut shared = original.share();
        shared.set(extra);
        shared.unset(keys[0]);

        prop_assert_eq!(original.popcount(), before);
        for &x in &keys {
            prop_assert_eq!(original.get(x), 1, "bit {:#x}", x);
        }
    }
}
