use std::cmp::Ordering;

use crate::error::{ArgError, Result};

use super::{Bitmap, Domain, DomainRef, FiniteSet, NaturalSet};

/// An ordered collection of sets, all defined over the same domain.
#[derive(Debug, Clone)]
pub struct SetCollection {
    domain: DomainRef,
    sets: Vec<NaturalSet>,
}

impl SetCollection {
    pub fn new(domain: &DomainRef) -> Self {
        SetCollection {
            domain: domain.clone(),
            sets: Vec::new(),
        }
    }

    #[inline]
    pub fn domain(&self) -> &DomainRef {
        &self.domain
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.sets.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.sets.is_empty()
    }

    #[inline]
    pub fn get(&self, ix: usize) -> Option<&NaturalSet> {
        self.sets.get(ix)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, NaturalSet> {
        self.sets.iter()
    }

    fn check_domain(&self, domain: &DomainRef) -> Result<()> {
        if Domain::same(&self.domain, domain) {
            Ok(())
        } else {
            Err(ArgError::mismatch(format!(
                "collection over {} cannot hold sets over {}",
                self.domain, domain
            )))
        }
    }

    pub fn push(&mut self, set: NaturalSet) -> Result<()> {
        self.check_domain(set.domain())?;
        self.sets.push(set);
        Ok(())
    }

    /// Stable sort in set order.
    pub fn sort(&mut self) {
        self.sets
            .sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));
    }

    /// Sorts and removes repeated sets.
    pub fn dedup(&mut self) {
        self.sort();
        self.sets.dedup();
    }

    fn sorted(&self) -> Vec<&NaturalSet> {
        let mut sets = self.sets.iter().collect::<Vec<_>>();
        sets.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));
        sets
    }

    /// The number of sets shared by the two collections, counting
    /// repeats as often as they occur in both.
    pub fn intersect_count(&self, other: &SetCollection) -> Result<usize> {
        self.check_domain(&other.domain)?;
        let left = self.sorted();
        let right = other.sorted();

        let mut count = 0;
        let (mut i, mut j) = (0, 0);
        while i < left.len() && j < right.len() {
            match left[i].try_cmp(right[j])? {
                Ordering::Equal => {
                    count += 1;
                    i += 1;
                    j += 1;
                }
                Ordering::Less => i += 1,
                Ordering::Greater => j += 1,
            }
        }
        Ok(count)
    }

    /// The sets found in both collections, in sorted order.
    pub fn intersection(&self, other: &SetCollection) -> Result<SetCollection> {
        self.check_domain(&other.domain)?;
        let left = self.sorted();
        let right = other.sorted();

        let mut result = SetCollection::new(&self.domain);
        let (mut i, mut j) = (0, 0);
        while i < left.len() && j < right.len() {
            match left[i].try_cmp(right[j])? {
                Ordering::Equal => {
                    result.sets.push(left[i].clone());
                    i += 1;
                    j += 1;
                }
                Ordering::Less => i += 1,
                Ordering::Greater => j += 1,
            }
        }
        Ok(result)
    }

    /// Replaces every set `s` with `s xor set`.
    pub fn xor_each(&mut self, set: &NaturalSet) -> Result<()> {
        self.check_domain(set.domain())?;
        for s in self.sets.iter_mut() {
            s.xor(set)?;
        }
        Ok(())
    }

    /// Replaces the `i`th set with its symmetric difference with the
    /// `i`th set of `other`.
    pub fn xor_pairwise(&mut self, other: &SetCollection) -> Result<()> {
        self.check_domain(&other.domain)?;
        if self.len() != other.len() {
            return Err(ArgError::mismatch(format!(
                "collections of {} and {} sets",
                self.len(),
                other.len()
            )));
        }
        for (s, o) in self.sets.iter_mut().zip(other.sets.iter()) {
            s.xor(o)?;
        }
        Ok(())
    }

    /// Swaps the roles of sets and positions: the result holds one set
    /// per position of the domain, over a new domain with one position
    /// per set, where set `j` contains `i` iff set `i` contained the
    /// `j`th position.
    pub fn transpose(&self) -> Result<SetCollection> {
        let target = Domain::with_cardinality(self.len())?;
        let mut maps = (0..self.domain.cardinality())
            .map(|_| Bitmap::new(self.len()))
            .collect::<Vec<_>>();

        for (i, set) in self.sets.iter().enumerate() {
            for local in set.local_indices() {
                maps[local].set(i);
            }
        }

        let mut result = SetCollection::new(&target);
        for map in maps {
            result.sets.push(NaturalSet::from_bitmap(&target, map)?);
        }
        Ok(result)
    }

    pub fn into_vec(self) -> Vec<NaturalSet> {
        self.sets
    }
}

impl std::ops::Index<usize> for SetCollection {
    type Output = NaturalSet;

    #[inline]
    fn index(&self, ix: usize) -> &NaturalSet {
        &self.sets[ix]
    }
}

impl<'a> IntoIterator for &'a SetCollection {
    type Item = &'a NaturalSet;
    type IntoIter = std::slice::Iter<'a, NaturalSet>;

    fn into_iter(self) -> Self::IntoIter {
        self.sets.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn collection(domain: &DomainRef, sets: &[&[usize]]) -> SetCollection {
        let mut coll = SetCollection::new(domain);
        for positions in sets {
            let set =
                NaturalSet::from_positions(domain, positions.iter().copied())
                    .unwrap();
            coll.push(set).unwrap();
        }
        coll
    }

    #[test]
    fn push_checks_domain() {
        let domain = Domain::with_cardinality(5).unwrap();
        let other = Domain::with_cardinality(6).unwrap();
        let mut coll = SetCollection::new(&domain);
        assert!(coll.push(NaturalSet::complete(&other)).is_err());
        assert!(coll.push(NaturalSet::complete(&domain)).is_ok());
    }

    #[test]
    fn shared_sets() {
        let domain = Domain::with_cardinality(6).unwrap();
        let a = collection(&domain, &[&[1, 2], &[3], &[0, 4], &[5]]);
        let b = collection(&domain, &[&[5], &[1, 2], &[2, 3]]);
        assert_eq!(a.intersect_count(&b).unwrap(), 2);
        assert_eq!(b.intersect_count(&a).unwrap(), 2);

        let shared = a.intersection(&b).unwrap();
        assert_eq!(shared.len(), 2);
        assert_eq!(shared[0].iter().collect::<Vec<_>>(), vec![1, 2]);
    }

    #[test]
    fn dedup_after_sort() {
        let domain = Domain::with_cardinality(4).unwrap();
        let mut coll = collection(&domain, &[&[2, 3], &[0], &[2, 3], &[1]]);
        coll.dedup();
        assert_eq!(coll.len(), 3);
        assert_eq!(coll[0].min(), Some(0));
        assert_eq!(coll[2].min(), Some(2));
    }

    #[test]
    fn transpose_swaps_axes() {
        let domain = Domain::with_cardinality(3).unwrap();
        let coll = collection(&domain, &[&[0, 1], &[1, 2]]);
        let t = coll.transpose().unwrap();
        assert_eq!(t.len(), 3);
        assert_eq!(t[0].iter().collect::<Vec<_>>(), vec![0]);
        assert_eq!(t[1].iter().collect::<Vec<_>>(), vec![0, 1]);
        assert_eq!(t[2].iter().collect::<Vec<_>>(), vec![1]);
    }

    #[test]
    fn xor_operations() {
        let domain = Domain::with_cardinality(4).unwrap();
        let mut coll = collection(&domain, &[&[0, 1], &[2]]);
        let mask = NaturalSet::closed(&domain, 1, 2).unwrap();
        coll.xor_each(&mask).unwrap();
        assert_eq!(coll[0].iter().collect::<Vec<_>>(), vec![0, 2]);
        assert_eq!(coll[1].iter().collect::<Vec<_>>(), vec![1]);

        let other = collection(&domain, &[&[0], &[1]]);
        coll.xor_pairwise(&other).unwrap();
        assert_eq!(coll[0].iter().collect::<Vec<_>>(), vec![2]);
        assert!(coll[1].is_empty());

        let short = collection(&domain, &[&[0]]);
        assert!(coll.xor_pairwise(&short).is_err());
    }
}
