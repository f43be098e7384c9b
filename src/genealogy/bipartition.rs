/*!
Clade bipartitions of a tree-shaped [`Genealogy`].

Every edge of a tree splits the leaves into those below it and the
rest. A bipartition is stored as the set of haplotype positions on the
side that does not contain the smallest haplotype, so that both halves
of the same split compare equal.
*/

use fnv::FnvHashMap;
use rayon::prelude::*;

#[allow(unused_imports)]
use log::{debug, error, info, trace};

use crate::error::Result;
use crate::index::EdgeIx;
use crate::set::{FiniteSet, NaturalSet, SetCollection};

use super::Genealogy;

impl Genealogy {
    /// The non-trivial bipartitions of the tree, sorted and without
    /// repeats. Splits that separate a single haplotype, or all but
    /// one, are left out. Returns `None` if the genealogy has
    /// recombinations or no root.
    pub fn bipartitions(&self) -> Result<Option<SetCollection>> {
        let root = match self.gmrca() {
            Some(root) if self.is_tree() => root,
            _ => return Ok(None),
        };
        let haplotypes = self.haplotype_domain();
        let mut below: FnvHashMap<EdgeIx, NaturalSet> = FnvHashMap::default();

        let mut current = Some(root);
        while let Some(v) = current {
            let mut next = None;
            let mut back = None;
            for &e in self.vertex(v).edges() {
                let edge = self.edge(e);
                if edge.source == v && !below.contains_key(&e) {
                    next = Some(e);
                    break;
                } else if edge.target == v {
                    back = Some(e);
                }
            }

            current = if self.is_leaf(v) {
                match back {
                    Some(b) => {
                        let leaf = NaturalSet::singleton(haplotypes, self.label(v))?;
                        below.insert(b, leaf);
                        Some(self.edge(b).source)
                    }
                    None => None,
                }
            } else if let Some(n) = next {
                Some(self.edge(n).target)
            } else if let Some(b) = back {
                let mut clade = NaturalSet::empty(haplotypes);
                for e in self.outgoing(v) {
                    if let Some(child) = below.get(&e) {
                        clade.union(child)?;
                    }
                }
                below.insert(b, clade);
                Some(self.edge(b).source)
            } else {
                None
            };
        }

        let n = haplotypes.cardinality();
        let mut result = SetCollection::new(haplotypes);
        for (_, mut split) in below {
            let card = split.cardinality();
            if card > 1 && card + 1 < n {
                if let Some(min) = haplotypes.min() {
                    if split.contains(min) {
                        split.inverse();
                    }
                }
                result.push(split)?;
            }
        }
        result.dedup();
        Ok(Some(result))
    }

    /// The bipartitions of the local tree of every recombination-free
    /// region, computed in parallel.
    pub fn local_tree_bipartitions(
        &self,
    ) -> Result<Vec<(NaturalSet, Option<SetCollection>)>> {
        let frames = self.recombination_free_regions()?;
        frames
            .iter()
            .filter(|frame| !frame.is_empty())
            .collect::<Vec<_>>()
            .into_par_iter()
            .map(|frame| -> Result<(NaturalSet, Option<SetCollection>)> {
                let tree = self.clip(frame)?;
                Ok((frame.clone(), tree.bipartitions()?))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::VertexIx;
    use crate::set::Domain;

    // ((0,1),(2,3)) with labels 4, 5 and root 6
    fn balanced() -> Genealogy {
        let snps = Domain::with_cardinality(6).unwrap();
        let haps = Domain::with_cardinality(4).unwrap();
        let mut graph = Genealogy::new(&snps, &haps);
        let e = graph.create_ancestor(VertexIx(0), 4).unwrap();
        let v4 = graph.edge(e).source();
        graph.connect_to_ancestor(VertexIx(1), v4).unwrap();
        let e = graph.create_ancestor(VertexIx(2), 5).unwrap();
        let v5 = graph.edge(e).source();
        graph.connect_to_ancestor(VertexIx(3), v5).unwrap();
        let e = graph.create_ancestor(v4, 6).unwrap();
        let root = graph.edge(e).source();
        graph.connect_to_ancestor(v5, root).unwrap();
        graph.set_gmrca(root);
        graph.sort();
        graph
    }

    #[test]
    fn balanced_tree_has_one_split() {
        let graph = balanced();
        let splits = graph.bipartitions().unwrap().unwrap();
        assert_eq!(splits.len(), 1);
        assert_eq!(splits[0].iter().collect::<Vec<_>>(), vec![2, 3]);
    }

    #[test]
    fn splits_are_non_trivial() {
        let snps = Domain::with_cardinality(3).unwrap();
        let haps = Domain::with_cardinality(6).unwrap();
        let mut graph = Genealogy::new(&snps, &haps);
        // caterpillar (((((0,1),2),3),4),5)
        let mut top = VertexIx(0);
        for (leaf, label) in (1..6).zip(6..) {
            let e = graph.create_ancestor(top, label).unwrap();
            top = graph.edge(e).source();
            graph.connect_to_ancestor(VertexIx(leaf), top).unwrap();
        }
        graph.set_gmrca(top);
        graph.sort();

        let splits = graph.bipartitions().unwrap().unwrap();
        let n = graph.haplotype_domain().cardinality();
        assert_eq!(splits.len(), 3);
        for split in splits.iter() {
            assert!(split.cardinality() > 1 && split.cardinality() < n - 1);
            assert!(!split.contains(0));
        }
    }

    #[test]
    fn graphs_with_recombination_have_none() {
        let mut graph = balanced();
        let root = graph.gmrca().unwrap();
        graph.connect_to_ancestor(VertexIx(3), root).unwrap();
        assert!(!graph.is_tree());
        assert!(graph.bipartitions().unwrap().is_none());
    }
}
