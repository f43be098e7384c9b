use std::cmp::Ordering;
use std::sync::Arc;

use crate::error::{ArgError, Result};

use super::{
    split_encoding, Bitmap, Body, Domain, DomainRef, Extent, FiniteSet,
    Indices, Topology,
};

/// A set of positions of a [`Domain`]. The extent is stored in the
/// local indices of the domain.
#[derive(Clone)]
pub struct NaturalSet {
    domain: DomainRef,
    extent: Extent,
}

impl NaturalSet {
    #[inline]
    fn with_extent(domain: &DomainRef, extent: Extent) -> NaturalSet {
        NaturalSet {
            domain: domain.clone(),
            extent,
        }
    }

    pub fn empty(domain: &DomainRef) -> NaturalSet {
        NaturalSet::with_extent(domain, Extent::Empty)
    }

    /// Every position of the domain.
    pub fn complete(domain: &DomainRef) -> NaturalSet {
        let extent = match domain.cardinality() {
            0 => Extent::Empty,
            n => Extent::Closed { min: 0, max: n - 1 },
        };
        NaturalSet::with_extent(domain, extent)
    }

    /// Every position of the domain between `min` and `max`, both
    /// absolute. Fails if either lies outside the space.
    pub fn closed(domain: &DomainRef, min: usize, max: usize) -> Result<NaturalSet> {
        domain.space().to_relative(min)?;
        domain.space().to_relative(max)?;
        let lo = domain.rank(min);
        let hi = domain.rank(max.saturating_add(1));
        let extent = if min > max || hi <= lo {
            Extent::Empty
        } else {
            Extent::Closed {
                min: lo,
                max: hi - 1,
            }
        };
        Ok(NaturalSet::with_extent(domain, extent))
    }

    pub fn singleton(domain: &DomainRef, position: usize) -> Result<NaturalSet> {
        let local = domain.to_local(position)?;
        Ok(NaturalSet::with_extent(domain, Extent::closed(local, local)))
    }

    /// A set from a bitmap over the local indices of `domain`.
    pub fn from_bitmap(domain: &DomainRef, map: Bitmap) -> Result<NaturalSet> {
        if map.len() != domain.cardinality() {
            return Err(ArgError::mismatch(format!(
                "bitmap of length {} does not cover {}",
                map.len(),
                domain
            )));
        }
        Ok(NaturalSet::with_extent(domain, Extent::normalize(map)))
    }

    pub fn from_positions<I>(domain: &DomainRef, positions: I) -> Result<NaturalSet>
    where
        I: IntoIterator<Item = usize>,
    {
        let mut map = Bitmap::new(domain.cardinality());
        for pos in positions {
            map.set(domain.to_local(pos)?);
        }
        Ok(NaturalSet::with_extent(domain, Extent::normalize(map)))
    }

    #[inline]
    pub fn domain(&self) -> &DomainRef {
        &self.domain
    }

    #[inline]
    pub(crate) fn extent(&self) -> &Extent {
        &self.extent
    }

    #[inline]
    fn local_len(&self) -> usize {
        self.domain.cardinality()
    }

    fn check(&self, other: &NaturalSet) -> Result<()> {
        if Domain::same(&self.domain, &other.domain) {
            Ok(())
        } else {
            Err(ArgError::mismatch(format!(
                "{} and {} are defined over different domains",
                self, other
            )))
        }
    }

    pub fn union(&mut self, other: &NaturalSet) -> Result<()> {
        self.check(other)?;
        self.extent = self.extent.union(&other.extent, self.local_len());
        Ok(())
    }

    pub fn intersect(&mut self, other: &NaturalSet) -> Result<()> {
        self.check(other)?;
        self.extent = self.extent.intersect(&other.extent, self.local_len());
        Ok(())
    }

    pub fn xor(&mut self, other: &NaturalSet) -> Result<()> {
        self.check(other)?;
        self.extent = self.extent.xor(&other.extent, self.local_len());
        Ok(())
    }

    /// Replaces the set with its complement in the domain.
    pub fn inverse(&mut self) {
        self.extent = self.extent.complement(self.local_len());
    }

    pub fn inverted(&self) -> NaturalSet {
        let mut set = self.clone();
        set.inverse();
        set
    }

    /// Non-mutating intersection.
    pub fn intersection(&self, other: &NaturalSet) -> Result<NaturalSet> {
        let mut set = self.clone();
        set.intersect(other)?;
        Ok(set)
    }

    /// Non-mutating union.
    pub fn union_with(&self, other: &NaturalSet) -> Result<NaturalSet> {
        let mut set = self.clone();
        set.union(other)?;
        Ok(set)
    }

    /// Non-mutating symmetric difference.
    pub fn xor_with(&self, other: &NaturalSet) -> Result<NaturalSet> {
        let mut set = self.clone();
        set.xor(other)?;
        Ok(set)
    }

    pub fn intersection_count(&self, other: &NaturalSet) -> Result<usize> {
        self.check(other)?;
        let count = match (&self.extent, &other.extent) {
            (Extent::Fragments(a), Extent::Fragments(b)) => {
                let mut map = a.clone();
                map.intersect_with(b);
                map.count_ones()
            }
            (a, b) => a.intersect(b, self.local_len()).cardinality(),
        };
        Ok(count)
    }

    /// Unions `other` into the set and returns the growth in
    /// cardinality.
    pub fn union_and_compare(&mut self, other: &NaturalSet) -> Result<isize> {
        let before = self.cardinality() as isize;
        self.union(other)?;
        Ok(self.cardinality() as isize - before)
    }

    /// Drops every position below `position`.
    pub fn remove_below(&mut self, position: usize) {
        let cut = self.domain.rank(position);
        self.extent = self.extent.remove_below(cut);
    }

    /// Drops every position above `position`.
    pub fn remove_above(&mut self, position: usize) {
        let keep = self.domain.rank(position.saturating_add(1));
        self.extent = if keep == 0 {
            Extent::Empty
        } else {
            self.extent.remove_above(keep - 1)
        };
    }

    /// The positions at or above `position`.
    pub fn copy_from(&self, position: usize) -> NaturalSet {
        let mut set = self.clone();
        set.remove_below(position);
        set
    }

    /// The positions at or below `position`.
    pub fn copy_up_to(&self, position: usize) -> NaturalSet {
        let mut set = self.clone();
        set.remove_above(position);
        set
    }

    /// Re-expresses the set over `target`, keeping the positions that
    /// `target` contains. Both domains must share a space.
    pub fn project_onto(&self, target: &DomainRef) -> Result<NaturalSet> {
        if Domain::same(&self.domain, target) {
            return Ok(NaturalSet::with_extent(target, self.extent.clone()));
        }
        let (source_space, target_space) = (self.domain.space(), target.space());
        if !Arc::ptr_eq(source_space, target_space) && source_space != target_space
        {
            return Err(ArgError::mismatch(format!(
                "cannot project {} onto {}",
                self, target
            )));
        }

        match (&self.extent, self.domain.topology()) {
            (Extent::Empty, _) => Ok(NaturalSet::empty(target)),
            (Extent::Closed { .. }, Topology::Closed) => {
                let (min, max) = (self.min(), self.max());
                match (min, max) {
                    (Some(min), Some(max)) => NaturalSet::closed(target, min, max),
                    _ => Ok(NaturalSet::empty(target)),
                }
            }
            _ => {
                let mut map = Bitmap::new(target.cardinality());
                for pos in self.iter() {
                    if let Ok(local) = target.to_local(pos) {
                        map.set(local);
                    }
                }
                Ok(NaturalSet::with_extent(target, Extent::normalize(map)))
            }
        }
    }

    /// Lexicographic order over the bit vectors: the set holding the
    /// smallest position found in only one of the two sorts first.
    pub fn try_cmp(&self, other: &NaturalSet) -> Result<Ordering> {
        self.check(other)?;
        let ordering = match self.extent.first_difference(&other.extent, self.local_len()) {
            None => Ordering::Equal,
            Some(ix) if self.extent.contains(ix) => Ordering::Less,
            Some(_) => Ordering::Greater,
        };
        Ok(ordering)
    }

    /// Absolute positions in increasing order.
    pub fn iter(&self) -> impl Iterator<Item = usize> + '_ {
        let domain = &self.domain;
        self.extent.indices().map(move |local| domain.absolute(local))
    }

    /// Local indices in increasing order.
    pub fn local_indices(&self) -> Indices<'_> {
        self.extent.indices()
    }

    /// The smallest local index, `None` if the set is empty.
    #[inline]
    pub fn local_min(&self) -> Option<usize> {
        self.extent.min()
    }

    /// The largest local index, `None` if the set is empty.
    #[inline]
    pub fn local_max(&self) -> Option<usize> {
        self.extent.max()
    }

    /// One character per position of the domain.
    pub fn to_binary_string(&self) -> String {
        self.extent.vectorize(self.local_len()).to_binary_string()
    }

    pub fn to_compact_string(&self) -> String {
        match (&self.extent, self.min(), self.max()) {
            (Extent::Closed { .. }, Some(min), Some(max)) => {
                format!("{},{}", min, max)
            }
            (extent, _, _) => extent.to_compact_string(),
        }
    }

    /// Parses the output of `Display`.
    pub fn decode(value: &str) -> Result<NaturalSet> {
        let (body, parent) = split_encoding(value)
            .ok_or_else(|| ArgError::undecodable(value, "set"))?;
        let domain = Domain::decode(parent)?;
        match body {
            Body::Empty => Ok(NaturalSet::empty(&domain)),
            Body::Bounds(min, max) => NaturalSet::closed(&domain, min, max),
            Body::Bits(bits) => {
                let map = Bitmap::from_binary_str(&bits, domain.cardinality())
                    .ok_or_else(|| ArgError::undecodable(value, "set"))?;
                NaturalSet::from_bitmap(&domain, map)
            }
        }
    }
}

impl FiniteSet for NaturalSet {
    #[inline]
    fn topology(&self) -> Topology {
        self.extent.topology()
    }

    fn min(&self) -> Option<usize> {
        self.extent.min().map(|local| self.domain.absolute(local))
    }

    fn max(&self) -> Option<usize> {
        self.extent.max().map(|local| self.domain.absolute(local))
    }

    #[inline]
    fn cardinality(&self) -> usize {
        self.extent.cardinality()
    }

    /// Measured in the local indices of the domain, so over a
    /// fragmented domain it is the number of domain positions between
    /// `min()` and `max()`, not `max() - min() + 1`.
    #[inline]
    fn closure_cardinality(&self) -> usize {
        self.extent.closure_cardinality()
    }

    fn contains(&self, position: usize) -> bool {
        match self.domain.to_local(position) {
            Ok(local) => self.extent.contains(local),
            Err(_) => false,
        }
    }
}

impl PartialEq for NaturalSet {
    fn eq(&self, other: &NaturalSet) -> bool {
        Domain::same(&self.domain, &other.domain) && self.extent == other.extent
    }
}

impl PartialOrd for NaturalSet {
    fn partial_cmp(&self, other: &NaturalSet) -> Option<Ordering> {
        self.try_cmp(other).ok()
    }
}

impl std::fmt::Display for NaturalSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}]:{}", self.to_compact_string(), self.domain)
    }
}

impl std::fmt::Debug for NaturalSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "NaturalSet{}", self)
    }
}
