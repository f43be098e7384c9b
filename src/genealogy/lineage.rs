/*!
Tracing the mutations inherited along the lineages of a vertex.
*/

use std::collections::VecDeque;

use fnv::{FnvHashMap, FnvHashSet};

#[allow(unused_imports)]
use log::{debug, error, info, trace};

use crate::error::{ArgError, Result};
use crate::index::VertexIx;
use crate::set::{Bitmap, Domain, FiniteSet, NaturalSet, SetCollection};

use super::Genealogy;

impl Genealogy {
    /// Every SNP in `region` that mutated on the way from the root to
    /// `v`. A mutation counts only if the edge carrying it is ancestral
    /// to `v` at the mutated position.
    pub fn mutations_at(&self, v: VertexIx, region: &NaturalSet) -> Result<NaturalSet> {
        if !Domain::same(region.domain(), self.snp_domain()) {
            return Err(ArgError::mismatch(format!(
                "region {} is not defined over the SNP domain {}",
                region,
                self.snp_domain()
            )));
        }

        // positions of each ancestor that reach v
        let mut activity: FnvHashMap<VertexIx, NaturalSet> = FnvHashMap::default();
        activity.insert(v, self.in_active_region(v)?.intersection(region)?);

        let mut queue = VecDeque::new();
        let mut queued = FnvHashSet::default();
        queue.push_back(v);
        queued.insert(v);

        while let Some(current) = queue.pop_front() {
            queued.remove(&current);
            let reaching = match activity.get(&current) {
                Some(set) => set.clone(),
                None => continue,
            };
            for e in self.incoming(current) {
                let edge = self.edge(e);
                let inherited = reaching.intersection(&edge.active)?;
                if inherited.is_empty() {
                    continue;
                }
                let grown = match activity.get_mut(&edge.source) {
                    Some(known) => known.union_and_compare(&inherited)? > 0,
                    None => {
                        activity.insert(edge.source, inherited);
                        true
                    }
                };
                if grown && queued.insert(edge.source) {
                    queue.push_back(edge.source);
                }
            }
        }

        let domain = self.snp_domain();
        let mut map = Bitmap::new(domain.cardinality());
        let mut visited = FnvHashSet::default();
        let mut stack = vec![v];
        visited.insert(v);

        while let Some(current) = stack.pop() {
            let reaching = match activity.get(&current) {
                Some(set) => set,
                None => continue,
            };
            for e in self.incoming(current) {
                let edge = self.edge(e);
                let active = edge.active.intersection(reaching)?;
                if active.is_empty() {
                    continue;
                }
                for m in edge.mutations.iter() {
                    if active.contains(m.position) {
                        map.set(domain.to_local(m.position)?);
                    }
                }
                if visited.insert(edge.source) {
                    stack.push(edge.source);
                }
            }
        }

        NaturalSet::from_bitmap(domain, map)
    }

    /// The alleles of `v` on `region`: the ancestral sequence, flipped
    /// at every inherited mutation.
    pub fn haplotype_at(&self, v: VertexIx, region: &NaturalSet) -> Result<NaturalSet> {
        let mut haplotype = self.mutations_at(v, region)?;
        haplotype.xor(&self.ancestral_sequence().intersection(region)?)?;
        Ok(haplotype)
    }

    /// The inherited mutations of every leaf, ordered by label.
    pub fn mutations(&self, region: &NaturalSet) -> Result<SetCollection> {
        let mut result = SetCollection::new(self.snp_domain());
        for leaf in self.leaves() {
            result.push(self.mutations_at(leaf, region)?)?;
        }
        Ok(result)
    }

    /// The haplotype of every leaf, ordered by label.
    pub fn haplotypes(&self, region: &NaturalSet) -> Result<SetCollection> {
        let mut result = SetCollection::new(self.snp_domain());
        for leaf in self.leaves() {
            result.push(self.haplotype_at(leaf, region)?)?;
        }
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::set::DomainRef;

    // Leaf 1 inherits [0,4] through vertex 3 and [5,9] through vertex
    // 4. Mutations: 1 above vertex 3, 7 above vertex 4, 2 on the edge
    // into leaf 0, and 8 above vertex 3, which leaf 1 does not inherit.
    fn recombinant() -> (Genealogy, DomainRef) {
        let snps = Domain::with_cardinality(10).unwrap();
        let haps = Domain::with_cardinality(2).unwrap();
        let mut graph = Genealogy::new(&snps, &haps);
        let left = NaturalSet::closed(&snps, 0, 4).unwrap();
        let right = NaturalSet::closed(&snps, 5, 9).unwrap();

        let e = graph.create_ancestor(VertexIx(0), 3).unwrap();
        graph.mutate(e, 2);
        let v3 = graph.edge(e).source();
        graph.add_edge(v3, VertexIx(1), left);
        let e = graph.create_ancestor_with(VertexIx(1), 4, right);
        let v4 = graph.edge(e).source();

        let root = graph.add_vertex(5);
        let e = graph.connect_to_ancestor(v3, root).unwrap();
        graph.mutate(e, 1);
        graph.mutate(e, 8);
        let e = graph.connect_to_ancestor(v4, root).unwrap();
        graph.mutate(e, 7);
        graph.set_gmrca(root);
        graph.sort();
        (graph, snps)
    }

    fn positions(set: &NaturalSet) -> Vec<usize> {
        set.iter().collect()
    }

    #[test]
    fn mutations_follow_active_regions() {
        let (graph, snps) = recombinant();
        let all = NaturalSet::complete(&snps);

        let leaf0 = graph.mutations_at(VertexIx(0), &all).unwrap();
        assert_eq!(positions(&leaf0), vec![1, 2, 8]);

        let leaf1 = graph.mutations_at(VertexIx(1), &all).unwrap();
        assert_eq!(positions(&leaf1), vec![1, 7]);

        let right = NaturalSet::closed(&snps, 5, 9).unwrap();
        let leaf1 = graph.mutations_at(VertexIx(1), &right).unwrap();
        assert_eq!(positions(&leaf1), vec![7]);
    }

    #[test]
    fn haplotypes_flip_the_ancestral_sequence() {
        let (mut graph, snps) = recombinant();
        let ancestral = NaturalSet::from_positions(&snps, vec![1, 5]).unwrap();
        graph.set_ancestral_sequence(ancestral).unwrap();

        let all = NaturalSet::complete(&snps);
        let haplotypes = graph.haplotypes(&all).unwrap();
        assert_eq!(haplotypes.len(), 2);
        assert_eq!(positions(&haplotypes[0]), vec![2, 5, 8]);
        assert_eq!(positions(&haplotypes[1]), vec![5, 7]);

        let mutations = graph.mutations(&all).unwrap();
        assert_eq!(positions(&mutations[1]), vec![1, 7]);
    }

    #[test]
    fn foreign_regions_are_rejected() {
        let (graph, _) = recombinant();
        let other = Domain::with_cardinality(3).unwrap();
        let region = NaturalSet::complete(&other);
        assert!(graph.mutations_at(VertexIx(0), &region).is_err());
    }
}
