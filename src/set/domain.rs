use std::sync::Arc;

use crate::error::{ArgError, Result};

use super::{
    split_encoding, Bitmap, Body, Extent, FiniteSet, NaturalSet, Space,
    SpaceRef, Topology,
};

pub type DomainRef = Arc<Domain>;

/// A subset of a [`Space`] that serves as the coordinate system of
/// [`NaturalSet`]s. The extent is stored in space-relative indices;
/// the local index of a position is its rank among the positions of
/// the domain.
#[derive(Clone)]
pub struct Domain {
    space: SpaceRef,
    extent: Extent,
    // space-relative indices, only filled when fragmented
    positions: Vec<usize>,
}

impl Domain {
    pub(crate) fn from_extent(space: SpaceRef, extent: Extent) -> Domain {
        let positions = match &extent {
            Extent::Fragments(map) => map.ones().collect(),
            _ => Vec::new(),
        };
        Domain {
            space,
            extent,
            positions,
        }
    }

    /// The complete domain over the space `[0, cardinality - 1]`.
    pub fn with_cardinality(cardinality: usize) -> Result<DomainRef> {
        let space = Space::with_cardinality(cardinality)?;
        Ok(Space::complete_domain(&space))
    }

    /// The complete domain over a new space `[min, max]`.
    pub fn closed(min: usize, max: usize) -> Result<DomainRef> {
        let space = Space::new(min, max)?;
        Ok(Space::complete_domain(&space))
    }

    /// The positions `[min, max]` of an existing space.
    pub fn with_bounds(
        space: &SpaceRef,
        min: usize,
        max: usize,
    ) -> Result<DomainRef> {
        let rel_min = space.to_relative(min)?;
        let rel_max = space.to_relative(max)?;
        let extent = Extent::closed(rel_min, rel_max);
        Ok(Arc::new(Domain::from_extent(space.clone(), extent)))
    }

    /// A domain from a bitmap over the relative indices of `space`.
    pub fn from_bitmap(space: &SpaceRef, map: Bitmap) -> Result<DomainRef> {
        if map.len() != space.cardinality() {
            return Err(ArgError::mismatch(format!(
                "bitmap of length {} does not cover {}",
                map.len(),
                space
            )));
        }
        let extent = Extent::normalize(map);
        Ok(Arc::new(Domain::from_extent(space.clone(), extent)))
    }

    pub fn from_positions<I>(space: &SpaceRef, positions: I) -> Result<DomainRef>
    where
        I: IntoIterator<Item = usize>,
    {
        let mut map = Bitmap::new(space.cardinality());
        for pos in positions {
            map.set(space.to_relative(pos)?);
        }
        Domain::from_bitmap(space, map)
    }

    #[inline]
    pub fn space(&self) -> &SpaceRef {
        &self.space
    }

    #[inline]
    pub(crate) fn extent(&self) -> &Extent {
        &self.extent
    }

    /// True if both refer to the same domain, either the same
    /// allocation or equal positions over equal spaces.
    #[inline]
    pub fn same(a: &DomainRef, b: &DomainRef) -> bool {
        Arc::ptr_eq(a, b) || **a == **b
    }

    fn check_space(&self, other: &Domain) -> Result<()> {
        if Arc::ptr_eq(&self.space, &other.space) || self.space == other.space
        {
            Ok(())
        } else {
            Err(ArgError::mismatch(format!(
                "spaces {} and {} differ",
                self.space, other.space
            )))
        }
    }

    fn out_of_range(&self, position: usize) -> ArgError {
        ArgError::OutOfRange {
            position,
            range: self.to_string(),
        }
    }

    /// The local index of an absolute position.
    pub fn to_local(&self, position: usize) -> Result<usize> {
        let rel = self.space.to_relative(position)?;
        match &self.extent {
            Extent::Closed { min, max } if *min <= rel && rel <= *max => {
                Ok(rel - min)
            }
            Extent::Fragments(_) => self
                .positions
                .binary_search(&rel)
                .map_err(|_| self.out_of_range(position)),
            _ => Err(self.out_of_range(position)),
        }
    }

    /// The absolute position of a local index.
    pub fn to_absolute(&self, local: usize) -> Result<usize> {
        match &self.extent {
            Extent::Closed { min, max } if min + local <= *max => {
                Ok(self.space.origin() + min + local)
            }
            Extent::Fragments(_) => self
                .positions
                .get(local)
                .map(|rel| self.space.origin() + rel)
                .ok_or_else(|| self.out_of_range(local)),
            _ => Err(self.out_of_range(local)),
        }
    }

    /// Absolute position of a local index known to be valid.
    #[inline]
    pub(crate) fn absolute(&self, local: usize) -> usize {
        let base = self.space.origin();
        match &self.extent {
            Extent::Fragments(_) => base + self.positions[local],
            Extent::Closed { min, .. } => base + min + local,
            Extent::Empty => base + local,
        }
    }

    /// The number of positions of the domain strictly below
    /// `position`. Accepts any position, inside the space or not.
    pub fn rank(&self, position: usize) -> usize {
        let base = self.space.origin();
        if position <= base {
            return 0;
        }
        let rel = position - base;
        match &self.extent {
            Extent::Empty => 0,
            Extent::Closed { min, max } => {
                rel.saturating_sub(*min).min(max - min + 1)
            }
            Extent::Fragments(_) => match self.positions.binary_search(&rel) {
                Ok(ix) | Err(ix) => ix,
            },
        }
    }

    pub fn union(&mut self, other: &Domain) -> Result<()> {
        self.check_space(other)?;
        let extent =
            self.extent.union(&other.extent, self.space.cardinality());
        *self = Domain::from_extent(self.space.clone(), extent);
        Ok(())
    }

    pub fn intersect(&mut self, other: &Domain) -> Result<()> {
        self.check_space(other)?;
        let extent =
            self.extent.intersect(&other.extent, self.space.cardinality());
        *self = Domain::from_extent(self.space.clone(), extent);
        Ok(())
    }

    pub fn xor(&mut self, other: &Domain) -> Result<()> {
        self.check_space(other)?;
        let extent = self.extent.xor(&other.extent, self.space.cardinality());
        *self = Domain::from_extent(self.space.clone(), extent);
        Ok(())
    }

    /// The domain, over the same space, holding exactly the positions
    /// of `set`, which must be defined over this domain.
    pub fn sub_domain(&self, set: &NaturalSet) -> Result<DomainRef> {
        if **set.domain() != *self {
            return Err(ArgError::mismatch(format!(
                "{} is not defined over {}",
                set, self
            )));
        }
        let extent = match (&self.extent, set.extent()) {
            (Extent::Closed { min, .. }, Extent::Closed { min: a, max: b }) => {
                Extent::closed(min + a, min + b)
            }
            _ => {
                let base = self.space.origin();
                let mut map = Bitmap::new(self.space.cardinality());
                set.iter().for_each(|pos| map.set(pos - base));
                Extent::normalize(map)
            }
        };
        Ok(Arc::new(Domain::from_extent(self.space.clone(), extent)))
    }

    /// Re-expresses `set` over `target`.
    #[inline]
    pub fn project(target: &DomainRef, set: &NaturalSet) -> Result<NaturalSet> {
        set.project_onto(target)
    }

    /// The absolute positions of the domain, in increasing order.
    pub fn iter(&self) -> impl Iterator<Item = usize> + '_ {
        let base = self.space.origin();
        self.extent.indices().map(move |rel| base + rel)
    }

    /// One character per position of the space.
    pub fn to_binary_string(&self) -> String {
        self.extent
            .vectorize(self.space.cardinality())
            .to_binary_string()
    }

    /// Parses the output of `Display`.
    pub fn decode(value: &str) -> Result<DomainRef> {
        let (body, parent) = split_encoding(value)
            .ok_or_else(|| ArgError::undecodable(value, "domain"))?;
        let space = Space::decode(parent)?;
        match body {
            Body::Empty => {
                Ok(Arc::new(Domain::from_extent(space, Extent::Empty)))
            }
            Body::Bounds(min, max) => Domain::with_bounds(&space, min, max),
            Body::Bits(bits) => {
                let map = Bitmap::from_binary_str(&bits, space.cardinality())
                    .ok_or_else(|| ArgError::undecodable(value, "domain"))?;
                Domain::from_bitmap(&space, map)
            }
        }
    }
}

impl FiniteSet for Domain {
    #[inline]
    fn topology(&self) -> Topology {
        self.extent.topology()
    }

    fn min(&self) -> Option<usize> {
        let base = self.space.origin();
        self.extent.min().map(|rel| base + rel)
    }

    fn max(&self) -> Option<usize> {
        let base = self.space.origin();
        self.extent.max().map(|rel| base + rel)
    }

    #[inline]
    fn cardinality(&self) -> usize {
        self.extent.cardinality()
    }

    #[inline]
    fn closure_cardinality(&self) -> usize {
        self.extent.closure_cardinality()
    }

    fn contains(&self, position: usize) -> bool {
        match self.space.to_relative(position) {
            Ok(rel) => self.extent.contains(rel),
            Err(_) => false,
        }
    }
}

impl PartialEq for Domain {
    fn eq(&self, other: &Domain) -> bool {
        self.space == other.space && self.extent == other.extent
    }
}

impl Eq for Domain {}

impl std::fmt::Display for Domain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let body = match &self.extent {
            Extent::Empty => "empty".to_string(),
            Extent::Closed { .. } => format!(
                "{},{}",
                self.min().unwrap_or(0),
                self.max().unwrap_or(0)
            ),
            Extent::Fragments(map) => map.to_binary_string(),
        };
        write!(f, "[{}]:{}", body, self.space)
    }
}

impl std::fmt::Debug for Domain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Domain{}", self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fragmented() -> DomainRef {
        let space = Space::new(10, 19).unwrap();
        Domain::from_positions(&space, vec![11, 13, 14, 18]).unwrap()
    }

    #[test]
    fn local_coordinates() {
        let domain = fragmented();
        assert_eq!(domain.topology(), Topology::Fragments);
        assert_eq!(domain.cardinality(), 4);
        assert_eq!(domain.closure_cardinality(), 8);
        assert_eq!(domain.min(), Some(11));
        assert_eq!(domain.max(), Some(18));

        assert_eq!(domain.to_local(11).unwrap(), 0);
        assert_eq!(domain.to_local(18).unwrap(), 3);
        assert_eq!(domain.to_absolute(2).unwrap(), 14);
        assert!(domain.to_local(12).is_err());
        assert!(domain.to_local(25).is_err());
        assert!(domain.to_absolute(4).is_err());

        assert_eq!(domain.rank(5), 0);
        assert_eq!(domain.rank(13), 1);
        assert_eq!(domain.rank(15), 3);
        assert_eq!(domain.rank(100), 4);
    }

    #[test]
    fn closed_domain_inside_space() {
        let space = Space::new(0, 99).unwrap();
        let domain = Domain::with_bounds(&space, 20, 29).unwrap();
        assert_eq!(domain.to_local(20).unwrap(), 0);
        assert_eq!(domain.to_absolute(9).unwrap(), 29);
        assert!(domain.to_absolute(10).is_err());
        assert_eq!(domain.rank(25), 5);
        assert_eq!(domain.iter().collect::<Vec<_>>(), (20..30).collect::<Vec<_>>());
    }

    #[test]
    fn algebra_requires_same_space() {
        let space = Space::new(0, 9).unwrap();
        let mut a = (*Domain::with_bounds(&space, 0, 3).unwrap()).clone();
        let b = Domain::with_bounds(&space, 6, 9).unwrap();
        a.union(&b).unwrap();
        assert_eq!(a.topology(), Topology::Fragments);
        assert_eq!(a.cardinality(), 8);

        let c = Domain::with_bounds(&space, 4, 5).unwrap();
        a.union(&c).unwrap();
        assert_eq!(a.topology(), Topology::Closed);

        let other = Domain::with_cardinality(10).unwrap();
        assert!(a.intersect(&other).is_ok());
        let far = Domain::closed(0, 11).unwrap();
        assert!(matches!(a.xor(&far), Err(ArgError::DomainMismatch(_))));
    }

    #[test]
    fn decode_roundtrip() {
        let domain = fragmented();
        let text = domain.to_string();
        assert_eq!(text, "[0101100010]:[10,19]");
        assert_eq!(*Domain::decode(&text).unwrap(), *domain);

        let closed = Domain::closed(3, 8).unwrap();
        assert_eq!(closed.to_string(), "[3,8]:[3,8]");
        assert_eq!(*Domain::decode(&closed.to_string()).unwrap(), *closed);
        assert!(Domain::decode("[3,8]").is_err());
    }
}
