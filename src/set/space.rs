use std::sync::Arc;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::{ArgError, Result};

use super::{Bitmap, Domain, DomainRef, Extent, FiniteSet, Topology};

pub type SpaceRef = Arc<Space>;

static SPACE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\[(\d+),(\d+)\]$").expect("Failed to compile space pattern")
});

/// The closed interval `[min, max]` anchoring a coordinate system.
/// Relative index 0 is `min`.
#[derive(Clone)]
pub struct Space {
    min: usize,
    max: usize,
}

impl Space {
    pub fn new(min: usize, max: usize) -> Result<SpaceRef> {
        if min > max {
            return Err(ArgError::InvalidSpace(format!(
                "[{},{}] contains no positions",
                min, max
            )));
        }
        (max - min).checked_add(1).ok_or_else(|| {
            ArgError::InvalidSpace(format!("[{},{}] has too many positions", min, max))
        })?;
        Ok(Arc::new(Space { min, max }))
    }

    /// The space `[0, cardinality - 1]`.
    pub fn with_cardinality(cardinality: usize) -> Result<SpaceRef> {
        if cardinality == 0 {
            return Err(ArgError::InvalidSpace(
                "a space must contain at least one position".to_string(),
            ));
        }
        Space::new(0, cardinality - 1)
    }

    /// The absolute position of relative index 0.
    #[inline]
    pub fn origin(&self) -> usize {
        self.min
    }

    /// The largest relative index.
    #[inline]
    pub fn last(&self) -> usize {
        self.max - self.min
    }

    /// A bitmap with every relative index set.
    pub fn full(&self) -> Bitmap {
        Bitmap::full(self.cardinality())
    }

    pub fn to_relative(&self, position: usize) -> Result<usize> {
        if self.contains(position) {
            Ok(position - self.min)
        } else {
            Err(self.out_of_range(position))
        }
    }

    pub fn to_absolute(&self, relative: usize) -> Result<usize> {
        if relative <= self.last() {
            Ok(self.min + relative)
        } else {
            Err(self.out_of_range(relative))
        }
    }

    /// The domain covering every position of the space.
    pub fn complete_domain(space: &SpaceRef) -> DomainRef {
        Arc::new(Domain::from_extent(
            space.clone(),
            Extent::Closed {
                min: 0,
                max: space.last(),
            },
        ))
    }

    pub(crate) fn out_of_range(&self, position: usize) -> ArgError {
        ArgError::OutOfRange {
            position,
            range: self.to_string(),
        }
    }

    /// Parses `"[min,max]"`.
    pub fn decode(value: &str) -> Result<SpaceRef> {
        let caps = SPACE
            .captures(value.trim())
            .ok_or_else(|| ArgError::undecodable(value, "space"))?;
        let min = caps[1]
            .parse::<usize>()
            .map_err(|_| ArgError::undecodable(value, "space"))?;
        let max = caps[2]
            .parse::<usize>()
            .map_err(|_| ArgError::undecodable(value, "space"))?;
        Space::new(min, max)
    }
}

impl FiniteSet for Space {
    #[inline]
    fn topology(&self) -> Topology {
        Topology::Closed
    }

    #[inline]
    fn min(&self) -> Option<usize> {
        Some(self.min)
    }

    #[inline]
    fn max(&self) -> Option<usize> {
        Some(self.max)
    }

    #[inline]
    fn cardinality(&self) -> usize {
        self.max - self.min + 1
    }

    #[inline]
    fn closure_cardinality(&self) -> usize {
        self.cardinality()
    }

    #[inline]
    fn contains(&self, position: usize) -> bool {
        self.min <= position && position <= self.max
    }
}

impl PartialEq for Space {
    fn eq(&self, other: &Space) -> bool {
        self.min == other.min && self.max == other.max
    }
}

impl Eq for Space {}

impl std::fmt::Display for Space {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{},{}]", self.min, self.max)
    }
}

impl std::fmt::Debug for Space {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Space{}", self)
    }
}
