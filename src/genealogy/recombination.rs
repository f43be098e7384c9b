/*!
Recombination breakpoints of a [`Genealogy`].

A vertex with more than one incoming edge is a recombination vertex.
Sorting its non-empty incoming regions and dropping the last leaves one
region per breakpoint, and the breakpoint lies right after the largest
position of that region.
*/

#[allow(unused_imports)]
use log::{debug, error, info, trace};

use crate::error::Result;
use crate::set::{Bitmap, FiniteSet, NaturalSet, SetCollection};

use super::Genealogy;

impl Genealogy {
    /// The local SNP index of every breakpoint, once per recombination.
    fn breakpoints(&self) -> Vec<usize> {
        let mut breakpoints = Vec::new();
        for v in self.vertices() {
            if self.in_degree(v) < 2 {
                continue;
            }
            let mut fragments = self
                .incoming(v)
                .map(|e| self.edge(e).active_region())
                .filter(|region| !region.is_empty())
                .collect::<Vec<_>>();
            fragments.sort_by(|a, b| {
                a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal)
            });
            fragments.pop();
            breakpoints.extend(fragments.into_iter().filter_map(|r| r.local_max()));
        }
        breakpoints
    }

    /// The number of recombinations between each SNP and the next, by
    /// local index of the SNP domain.
    pub fn recombination_rates(&self) -> Vec<usize> {
        let mut rates = vec![0; self.snp_domain().cardinality()];
        for ix in self.breakpoints() {
            rates[ix] += 1;
        }
        rates
    }

    /// The SNPs followed by at least one recombination.
    pub fn recombination_positions(&self) -> Result<NaturalSet> {
        let mut map = Bitmap::new(self.snp_domain().cardinality());
        for ix in self.breakpoints() {
            map.set(ix);
        }
        NaturalSet::from_bitmap(self.snp_domain(), map)
    }

    /// The maximal runs of SNPs not separated by a recombination, in
    /// order. Together they cover the SNP domain.
    pub fn recombination_free_regions(&self) -> Result<SetCollection> {
        let domain = self.snp_domain();
        let positions = self.recombination_positions()?;
        let mut regions = SetCollection::new(domain);

        let mut left = 0;
        for right in positions.local_indices() {
            regions.push(NaturalSet::closed(
                domain,
                domain.absolute(left),
                domain.absolute(right),
            )?)?;
            left = right + 1;
        }
        let n = domain.cardinality();
        if left < n {
            regions.push(NaturalSet::closed(
                domain,
                domain.absolute(left),
                domain.absolute(n - 1),
            )?)?;
        }

        regions.sort();
        Ok(regions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::VertexIx;
    use crate::set::{Domain, DomainRef};

    // Leaf 1 sits with leaf 0 on [0,4] and with the cherry (2,3) on
    // [5,9]. Labels: 4 = (0,1), 5 = lineage of 1 on [5,9], 6 = (2,3),
    // 7 = (5,6), root 8 = (4,7).
    fn recombinant() -> (Genealogy, DomainRef) {
        let snps = Domain::with_cardinality(10).unwrap();
        let haps = Domain::with_cardinality(4).unwrap();
        let mut graph = Genealogy::new(&snps, &haps);
        let left = NaturalSet::closed(&snps, 0, 4).unwrap();
        let right = NaturalSet::closed(&snps, 5, 9).unwrap();

        let e = graph.create_ancestor(VertexIx(0), 4).unwrap();
        let v4 = graph.edge(e).source();
        graph.add_edge(v4, VertexIx(1), left);
        let e = graph.create_ancestor_with(VertexIx(1), 5, right);
        let v5 = graph.edge(e).source();

        let e = graph.create_ancestor(VertexIx(2), 6).unwrap();
        let v6 = graph.edge(e).source();
        graph.connect_to_ancestor(VertexIx(3), v6).unwrap();

        let e = graph.create_ancestor(v5, 7).unwrap();
        let v7 = graph.edge(e).source();
        graph.connect_to_ancestor(v6, v7).unwrap();

        let e = graph.create_ancestor(v4, 8).unwrap();
        let root = graph.edge(e).source();
        graph.connect_to_ancestor(v7, root).unwrap();
        graph.set_gmrca(root);
        graph.sort();
        (graph, snps)
    }

    #[test]
    fn one_breakpoint_after_position_four() {
        let (graph, snps) = recombinant();
        let rates = graph.recombination_rates();
        assert_eq!(rates.len(), 10);
        assert_eq!(rates.iter().sum::<usize>(), 1);
        assert_eq!(rates[4], 1);

        let positions = graph.recombination_positions().unwrap();
        assert_eq!(positions, NaturalSet::singleton(&snps, 4).unwrap());
    }

    #[test]
    fn free_regions_cover_the_domain() {
        let (graph, snps) = recombinant();
        let regions = graph.recombination_free_regions().unwrap();
        assert_eq!(regions.len(), 2);
        assert_eq!(regions[0], NaturalSet::closed(&snps, 0, 4).unwrap());
        assert_eq!(regions[1], NaturalSet::closed(&snps, 5, 9).unwrap());
    }

    #[test]
    fn trees_have_a_single_free_region() {
        let snps = Domain::with_cardinality(5).unwrap();
        let haps = Domain::with_cardinality(2).unwrap();
        let mut graph = Genealogy::new(&snps, &haps);
        let e = graph.create_ancestor(VertexIx(0), 2).unwrap();
        let root = graph.edge(e).source();
        graph.connect_to_ancestor(VertexIx(1), root).unwrap();
        graph.set_gmrca(root);

        assert!(graph.recombination_positions().unwrap().is_empty());
        let regions = graph.recombination_free_regions().unwrap();
        assert_eq!(regions.len(), 1);
        assert_eq!(regions[0], NaturalSet::complete(&snps));
    }

    #[test]
    fn local_trees_of_each_region() {
        let (graph, snps) = recombinant();
        assert!(graph.bipartitions().unwrap().is_none());

        let trees = graph.local_tree_bipartitions().unwrap();
        assert_eq!(trees.len(), 2);
        for (frame, splits) in trees {
            assert!(frame.iter().all(|p| p < 10));
            let splits = splits.unwrap();
            assert_eq!(splits.len(), 1);
            assert_eq!(splits[0].iter().collect::<Vec<_>>(), vec![2, 3]);
            assert_eq!(frame.domain(), &snps);
        }
    }
}
