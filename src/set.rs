/*!
Finite sets of natural numbers over nested coordinate systems.

A [`Space`](space::Space) is a closed interval `[min,max]` that
anchors a coordinate system. A [`Domain`](domain::Domain) is a subset
of a `Space`, and a [`NaturalSet`](natural::NaturalSet) is a subset of
a `Domain`. Domains and sets share the same storage, an [`Extent`],
which is always in one of three shapes:

* `Empty`, the one canonical empty state
* `Closed { min, max }`, a continuous run of indices
* `Fragments(bitmap)`, anything else

Every operation that changes an `Extent` passes the result through
[`Extent::normalize`], so a continuous bitmap never survives and the
topology reported by [`FiniteSet::topology`] is never ambiguous.

Indices inside an `Extent` are relative to the parent coordinate
system: a `Domain` indexes into its `Space`, and a `NaturalSet`
indexes into the positions of its `Domain`, so that local index 0 is
the smallest position of the domain.
*/

pub mod bitmap;
pub mod collection;
pub mod domain;
pub mod natural;
pub mod space;

pub use self::bitmap::Bitmap;
pub use self::collection::SetCollection;
pub use self::domain::{Domain, DomainRef};
pub use self::natural::NaturalSet;
pub use self::space::{Space, SpaceRef};

use once_cell::sync::Lazy;
use regex::Regex;

use self::bitmap::Ones;

static TAGGED: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\[([^\]]*)\]:(.+)$")
        .expect("Failed to compile tagged extent pattern")
});

static BOUNDS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(\d+),(\d+)$").expect("Failed to compile bounds pattern")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Topology {
    Empty,
    Closed,
    Fragments,
}

/// The contract shared by spaces, domains, and sets. Positions are
/// absolute coordinates of the underlying space.
pub trait FiniteSet {
    fn topology(&self) -> Topology;

    /// The smallest position, `None` if the set is empty.
    fn min(&self) -> Option<usize>;

    /// The largest position, `None` if the set is empty.
    fn max(&self) -> Option<usize>;

    fn cardinality(&self) -> usize;

    /// The cardinality of the smallest continuous superset, 0 if
    /// the set is empty. A `NaturalSet` counts continuity in the local
    /// indices of its domain.
    fn closure_cardinality(&self) -> usize;

    fn contains(&self, position: usize) -> bool;

    #[inline]
    fn is_empty(&self) -> bool {
        self.topology() == Topology::Empty
    }

    #[inline]
    fn is_continuous(&self) -> bool {
        self.topology() != Topology::Fragments
    }
}

/// Storage for a subset of the indices `0..len` of some parent
/// coordinate system. The length is not stored; every operation that
/// may need to build a bitmap takes it as an argument.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Extent {
    Empty,
    Closed { min: usize, max: usize },
    Fragments(Bitmap),
}

impl Extent {
    /// The run `[min, max]`, or `Empty` if `min > max`.
    #[inline]
    pub fn closed(min: usize, max: usize) -> Extent {
        if min > max {
            Extent::Empty
        } else {
            Extent::Closed { min, max }
        }
    }

    /// Collapses a bitmap into the tightest representation.
    pub fn normalize(map: Bitmap) -> Extent {
        let count = map.count_ones();
        match (map.next_one(0), map.last_one()) {
            (Some(min), Some(max)) if max - min + 1 == count => {
                Extent::Closed { min, max }
            }
            (Some(_), Some(_)) => Extent::Fragments(map),
            _ => Extent::Empty,
        }
    }

    /// Expands into a bitmap of length `len`.
    pub fn vectorize(&self, len: usize) -> Bitmap {
        match self {
            Extent::Empty => Bitmap::new(len),
            Extent::Closed { min, max } => {
                let mut map = Bitmap::new(len);
                map.set_range(*min, *max);
                map
            }
            Extent::Fragments(map) => map.clone(),
        }
    }

    #[inline]
    pub fn topology(&self) -> Topology {
        match self {
            Extent::Empty => Topology::Empty,
            Extent::Closed { .. } => Topology::Closed,
            Extent::Fragments(_) => Topology::Fragments,
        }
    }

    pub fn min(&self) -> Option<usize> {
        match self {
            Extent::Empty => None,
            Extent::Closed { min, .. } => Some(*min),
            Extent::Fragments(map) => map.next_one(0),
        }
    }

    pub fn max(&self) -> Option<usize> {
        match self {
            Extent::Empty => None,
            Extent::Closed { max, .. } => Some(*max),
            Extent::Fragments(map) => map.last_one(),
        }
    }

    pub fn cardinality(&self) -> usize {
        match self {
            Extent::Empty => 0,
            Extent::Closed { min, max } => max - min + 1,
            Extent::Fragments(map) => map.count_ones(),
        }
    }

    pub fn closure_cardinality(&self) -> usize {
        match (self.min(), self.max()) {
            (Some(min), Some(max)) => max - min + 1,
            _ => 0,
        }
    }

    #[inline]
    pub fn contains(&self, ix: usize) -> bool {
        match self {
            Extent::Empty => false,
            Extent::Closed { min, max } => *min <= ix && ix <= *max,
            Extent::Fragments(map) => map.get(ix),
        }
    }

    pub fn union(&self, other: &Extent, len: usize) -> Extent {
        use Extent::*;
        match (self, other) {
            (Empty, x) | (x, Empty) => x.clone(),
            (Closed { min: a, max: b }, Closed { min: c, max: d })
                if *c <= b + 1 && *a <= d + 1 =>
            {
                Closed {
                    min: *a.min(c),
                    max: *b.max(d),
                }
            }
            _ => {
                let mut map = self.vectorize(len);
                map.union_with(&other.vectorize(len));
                Extent::normalize(map)
            }
        }
    }

    pub fn intersect(&self, other: &Extent, len: usize) -> Extent {
        use Extent::*;
        match (self, other) {
            (Empty, _) | (_, Empty) => Empty,
            (Closed { min: a, max: b }, Closed { min: c, max: d }) => {
                Extent::closed(*a.max(c), *b.min(d))
            }
            _ => {
                let mut map = self.vectorize(len);
                map.intersect_with(&other.vectorize(len));
                Extent::normalize(map)
            }
        }
    }

    pub fn xor(&self, other: &Extent, len: usize) -> Extent {
        use Extent::*;
        match (self, other) {
            (Empty, x) | (x, Empty) => x.clone(),
            _ => {
                let mut map = self.vectorize(len);
                map.xor_with(&other.vectorize(len));
                Extent::normalize(map)
            }
        }
    }

    /// Every index in `0..len` not in `self`.
    pub fn complement(&self, len: usize) -> Extent {
        if len == 0 {
            return Extent::Empty;
        }
        let last = len - 1;
        match self {
            Extent::Empty => Extent::Closed { min: 0, max: last },
            Extent::Closed { min, max } if *min == 0 && *max == last => {
                Extent::Empty
            }
            Extent::Closed { min, max } if *min == 0 => {
                Extent::Closed {
                    min: max + 1,
                    max: last,
                }
            }
            Extent::Closed { min, max } if *max == last => {
                Extent::Closed {
                    min: 0,
                    max: min - 1,
                }
            }
            _ => {
                let mut map = self.vectorize(len);
                map.xor_with(&Bitmap::full(len));
                Extent::normalize(map)
            }
        }
    }

    /// Drops every index below `ix`.
    pub fn remove_below(&self, ix: usize) -> Extent {
        match self {
            Extent::Empty => Extent::Empty,
            Extent::Closed { min, max } => Extent::closed(ix.max(*min), *max),
            Extent::Fragments(map) => {
                let mut map = map.clone();
                map.clear_below(ix);
                Extent::normalize(map)
            }
        }
    }

    /// Drops every index above `ix`.
    pub fn remove_above(&self, ix: usize) -> Extent {
        match self {
            Extent::Empty => Extent::Empty,
            Extent::Closed { min, max } => Extent::closed(*min, ix.min(*max)),
            Extent::Fragments(map) => {
                let mut map = map.clone();
                map.clear_above(ix);
                Extent::normalize(map)
            }
        }
    }

    /// The smallest index contained in exactly one of the two extents.
    pub fn first_difference(&self, other: &Extent, len: usize) -> Option<usize> {
        use Extent::*;
        match (self, other) {
            (Empty, x) | (x, Empty) => x.min(),
            (Closed { min: a, max: b }, Closed { min: c, max: d }) => {
                if a != c {
                    Some(*a.min(c))
                } else if b != d {
                    Some(b.min(d) + 1)
                } else {
                    None
                }
            }
            _ => {
                let mut map = self.vectorize(len);
                map.xor_with(&other.vectorize(len));
                map.next_one(0)
            }
        }
    }

    pub fn indices(&self) -> Indices<'_> {
        match self {
            Extent::Empty => Indices::Empty,
            Extent::Closed { min, max } => Indices::Range(*min..=*max),
            Extent::Fragments(map) => Indices::Ones(map.ones()),
        }
    }

    /// `"min,max"` for a run, the bit string for fragments, and
    /// `"empty"` for the empty extent.
    pub fn to_compact_string(&self) -> String {
        match self {
            Extent::Empty => "empty".to_string(),
            Extent::Closed { min, max } => format!("{},{}", min, max),
            Extent::Fragments(map) => map.to_binary_string(),
        }
    }
}

/// The part of an encoded domain or set inside its leading brackets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Body {
    Empty,
    Bounds(usize, usize),
    Bits(String),
}

/// Splits `"[<body>]:<parent>"` into the parsed body and the encoding
/// of the parent coordinate system.
pub(crate) fn split_encoding(value: &str) -> Option<(Body, &str)> {
    let caps = TAGGED.captures(value.trim())?;
    let inner = caps.get(1)?.as_str();
    let parent = caps.get(2)?.as_str();

    let body = if inner == "empty" {
        Body::Empty
    } else if let Some(bounds) = BOUNDS.captures(inner) {
        let min = bounds[1].parse::<usize>().ok()?;
        let max = bounds[2].parse::<usize>().ok()?;
        Body::Bounds(min, max)
    } else if !inner.is_empty() && inner.bytes().all(|b| b == b'0' || b == b'1') {
        Body::Bits(inner.to_string())
    } else {
        return None;
    };
    Some((body, parent))
}

/// Iterator over the indices of an [`Extent`], in increasing order
pub enum Indices<'a> {
    Empty,
    Range(std::ops::RangeInclusive<usize>),
    Ones(Ones<'a>),
}

impl<'a> Iterator for Indices<'a> {
    type Item = usize;

    #[inline]
    fn next(&mut self) -> Option<usize> {
        match self {
            Indices::Empty => None,
            Indices::Range(range) => range.next(),
            Indices::Ones(ones) => ones.next(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quickcheck::{quickcheck, Arbitrary, Gen};

    const LEN: usize = 80;

    #[derive(Debug, Clone)]
    struct ArbExtent(Extent);

    impl Arbitrary for ArbExtent {
        fn arbitrary<G: Gen>(g: &mut G) -> ArbExtent {
            let mut map = Bitmap::new(LEN);
            if bool::arbitrary(g) {
                let a = usize::arbitrary(g) % LEN;
                let b = usize::arbitrary(g) % LEN;
                map.set_range(a.min(b), a.max(b));
            } else {
                let bools: Vec<bool> = Vec::arbitrary(g);
                bools
                    .into_iter()
                    .take(LEN)
                    .enumerate()
                    .filter(|(_, b)| *b)
                    .for_each(|(ix, _)| map.set(ix));
            }
            ArbExtent(Extent::normalize(map))
        }
    }

    fn is_normal(extent: &Extent) -> bool {
        match extent {
            Extent::Empty => true,
            Extent::Closed { min, max } => min <= max,
            Extent::Fragments(map) => {
                Extent::normalize(map.clone()).topology() == Topology::Fragments
            }
        }
    }

    #[test]
    fn normalize_picks_tightest_shape() {
        let mut map = Bitmap::new(10);
        assert_eq!(Extent::normalize(map.clone()), Extent::Empty);

        map.set_range(2, 5);
        assert_eq!(
            Extent::normalize(map.clone()),
            Extent::Closed { min: 2, max: 5 }
        );

        map.set(7);
        assert_eq!(
            Extent::normalize(map.clone()).topology(),
            Topology::Fragments
        );
    }

    #[test]
    fn closed_fast_paths() {
        let a = Extent::closed(2, 5);
        let b = Extent::closed(6, 8);
        assert_eq!(a.union(&b, 10), Extent::closed(2, 8));
        assert_eq!(a.intersect(&b, 10), Extent::Empty);
        assert_eq!(a.complement(10).cardinality(), 6);
        assert_eq!(Extent::closed(0, 5).complement(10), Extent::closed(6, 9));
        assert_eq!(Extent::closed(3, 9).complement(10), Extent::closed(0, 2));
        assert_eq!(a.first_difference(&Extent::closed(2, 7), 10), Some(6));
    }

    #[test]
    fn split_encoding_bodies() {
        let (body, parent) = split_encoding("[2,5]:[0,9]:[0,9]").unwrap();
        assert_eq!(body, Body::Bounds(2, 5));
        assert_eq!(parent, "[0,9]:[0,9]");

        let (body, parent) = split_encoding("[0110]:[0,3]").unwrap();
        assert_eq!(body, Body::Bits("0110".to_string()));
        assert_eq!(parent, "[0,3]");

        let (body, _) = split_encoding("[empty]:[0,3]").unwrap();
        assert_eq!(body, Body::Empty);

        assert!(split_encoding("[0,3]").is_none());
        assert!(split_encoding("[01x]:[0,3]").is_none());
    }

    quickcheck! {
        fn prop_operations_stay_normal(a: ArbExtent, b: ArbExtent) -> bool {
            let (a, b) = (a.0, b.0);
            is_normal(&a.union(&b, LEN))
                && is_normal(&a.intersect(&b, LEN))
                && is_normal(&a.xor(&b, LEN))
                && is_normal(&a.complement(LEN))
        }
    }

    quickcheck! {
        fn prop_fast_paths_agree(a: ArbExtent, b: ArbExtent) -> bool {
            let (a, b) = (a.0, b.0);
            let mut union = a.vectorize(LEN);
            union.union_with(&b.vectorize(LEN));
            let mut inter = a.vectorize(LEN);
            inter.intersect_with(&b.vectorize(LEN));
            a.union(&b, LEN) == Extent::normalize(union)
                && a.intersect(&b, LEN) == Extent::normalize(inter)
        }
    }

    quickcheck! {
        fn prop_first_difference(a: ArbExtent, b: ArbExtent) -> bool {
            let (a, b) = (a.0, b.0);
            let mut diff = a.vectorize(LEN);
            diff.xor_with(&b.vectorize(LEN));
            a.first_difference(&b, LEN) == diff.next_one(0)
        }
    }
}
