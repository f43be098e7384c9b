/*!
Consistency checks for genealogies.

[`validate`] checks the structure of a graph and logs every problem it
finds. [`HaplotypeCheck`] compares the haplotypes a genealogy implies
with the haplotypes that were observed.
*/

use fnv::FnvHashSet;

#[allow(unused_imports)]
use log::{debug, error, info, trace};

use crate::error::{ArgError, Result};
use crate::genealogy::Genealogy;
use crate::haplotype::HaplotypeSet;
use crate::set::{Bitmap, Domain, FiniteSet, NaturalSet, SetCollection};

/// Checks that every incident edge of a live vertex is live and
/// attached to it, that every live edge is listed by both endpoints,
/// that the root is the only vertex without ancestors, and that every
/// inner vertex passes on exactly the region it inherits.
pub fn validate(graph: &Genealogy) -> bool {
    info!("validating {}", graph);

    let mut success = true;

    let vertices = graph.vertices().collect::<FnvHashSet<_>>();
    let edges = graph.edges().collect::<FnvHashSet<_>>();

    for &v in vertices.iter() {
        for &e in graph.vertex(v).edges() {
            if !edges.contains(&e) {
                info!("vertex {} lists missing edge {}", graph.label(v), e);
                success = false;
                continue;
            }
            let edge = graph.edge(e);
            if edge.source() != v && edge.target() != v {
                info!("vertex {} lists edge {} of other vertices", graph.label(v), e);
                success = false;
            }
        }
    }

    for &e in edges.iter() {
        let edge = graph.edge(e);
        for end in [edge.source(), edge.target()].iter() {
            if !vertices.contains(end) {
                info!("edge {} ends at a missing vertex {}", e, end);
                success = false;
            } else if !graph.vertex(*end).edges().contains(&e) {
                info!("edge {} is not listed by vertex {}", e, graph.label(*end));
                success = false;
            }
        }
        if !Domain::same(edge.active_region().domain(), graph.snp_domain()) {
            info!("edge {} has a region outside of the SNP domain", e);
            success = false;
        }
    }

    if !success {
        error!("errors when validating graph structure");
        return false;
    }

    let roots = graph
        .vertices()
        .filter(|&v| graph.is_root(v))
        .collect::<Vec<_>>();
    match (roots.as_slice(), graph.gmrca()) {
        ([root], Some(gmrca)) if *root == gmrca => {}
        (_, gmrca) => {
            info!(
                "{} vertices without ancestors, root {:?}",
                roots.len(),
                gmrca.map(|v| graph.label(v))
            );
            success = false;
        }
    }

    for v in graph.vertices() {
        if graph.is_root(v) || graph.is_leaf(v) {
            continue;
        }
        let (inherited, passed) = match (graph.in_active_region(v), graph.out_active_region(v)) {
            (Ok(inherited), Ok(passed)) => (inherited, passed),
            (Err(err), _) | (_, Err(err)) => {
                info!("vertex {}: {}", graph.label(v), err);
                success = false;
                continue;
            }
        };
        if inherited != passed {
            info!(
                "vertex {} inherits {} but passes on {}",
                graph.label(v),
                inherited,
                passed
            );
            success = false;
        }
    }

    if success {
        info!("graph successfully validated");
    } else {
        error!("errors when validating graph");
    }
    success
}

/// The difference between the haplotypes traced through a genealogy
/// and the observed ones.
///
/// A SNP where every haplotype differs from the traced mutations is
/// taken to have the derived allele at the root, and is reported in
/// the ancestral sequence instead of as an error.
#[derive(Debug, Clone)]
pub struct HaplotypeCheck {
    errors: SetCollection,
    error_columns: NaturalSet,
    ancestral: NaturalSet,
}

impl HaplotypeCheck {
    /// Fails if the haplotypes have missing values or do not match the
    /// domains and leaves of `graph`.
    pub fn new(graph: &Genealogy, haplotypes: &HaplotypeSet) -> Result<Self> {
        if haplotypes.iter().any(|h| !h.missing().is_empty()) {
            return Err(ArgError::malformed(
                0,
                "haplotypes with missing values cannot be checked",
            ));
        }
        let snps = graph.snp_domain();
        let mut errors = graph.mutations(&NaturalSet::complete(snps))?;
        errors.xor_pairwise(&haplotypes.markers()?)?;

        let columns = errors.transpose()?;
        let n = errors.len();
        let mut error_map = Bitmap::new(snps.cardinality());
        let mut ancestral_map = Bitmap::new(snps.cardinality());
        for (ix, column) in columns.iter().enumerate() {
            match column.cardinality() {
                0 => {}
                c if c == n => ancestral_map.set(ix),
                _ => error_map.set(ix),
            }
        }

        Ok(HaplotypeCheck {
            errors,
            error_columns: NaturalSet::from_bitmap(snps, error_map)?,
            ancestral: NaturalSet::from_bitmap(snps, ancestral_map)?,
        })
    }

    #[inline]
    pub fn has_errors(&self) -> bool {
        !self.error_columns.is_empty()
    }

    /// The number of SNPs with at least one wrong haplotype.
    #[inline]
    pub fn error_count(&self) -> usize {
        self.error_columns.cardinality()
    }

    #[inline]
    pub fn error_columns(&self) -> &NaturalSet {
        &self.error_columns
    }

    /// For each haplotype, the SNPs where it differs from its leaf.
    #[inline]
    pub fn errors(&self) -> &SetCollection {
        &self.errors
    }

    /// The root alleles implied by the observed haplotypes.
    #[inline]
    pub fn ancestral_sequence(&self) -> &NaturalSet {
        &self.ancestral
    }

    pub fn report(&self) {
        if self.has_errors() {
            error!("errors found on {} columns", self.error_count());
            error!("{}", self.error_columns.to_binary_string());
            for (ix, set) in self.errors.iter().enumerate() {
                error!("{}\t{}", ix, set.to_binary_string());
            }
        } else {
            info!("genealogy valid");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::factory::GenealogyFactory;
    use crate::haplotype::HaplotypeReader;
    use crate::index::VertexIx;
    use crate::options::BuildOptions;
    use crate::set::DomainRef;
    use std::io::Cursor;

    fn cherry(snps: &DomainRef, haps: &DomainRef) -> Genealogy {
        let mut factory = GenealogyFactory::new(snps, haps, BuildOptions::default());
        factory.start();
        factory.mutate(0, 2, 1).unwrap();
        factory.coalesce(2, 1, 3).unwrap();
        factory.finish().unwrap()
    }

    fn haplotypes(lines: &str) -> HaplotypeSet {
        let text = format!("1 1 3\n10\n20\n30\n{}", lines);
        HaplotypeReader::new(Cursor::new(text))
            .unwrap()
            .read_haplotype_set()
            .unwrap()
    }

    #[test]
    fn built_graphs_are_valid() {
        let snps = Domain::with_cardinality(3).unwrap();
        let haps = Domain::with_cardinality(2).unwrap();
        assert!(validate(&cherry(&snps, &haps)));
    }

    #[test]
    fn flux_violations_are_found() {
        let snps = Domain::with_cardinality(10).unwrap();
        let haps = Domain::with_cardinality(2).unwrap();
        let mut graph = Genealogy::new(&snps, &haps);
        let root = graph.add_vertex(3);
        let inner = graph.add_vertex(2);
        graph.add_edge(root, inner, NaturalSet::complete(&snps));
        let left = NaturalSet::closed(&snps, 0, 4).unwrap();
        graph.add_edge(inner, VertexIx(0), left.clone());
        graph.add_edge(inner, VertexIx(1), left);
        graph.set_gmrca(root);
        assert!(!validate(&graph));
    }

    #[test]
    fn extra_roots_are_found() {
        let snps = Domain::with_cardinality(3).unwrap();
        let haps = Domain::with_cardinality(3).unwrap();
        let mut graph = Genealogy::new(&snps, &haps);
        let e = graph.create_ancestor(VertexIx(0), 3).unwrap();
        let root = graph.edge(e).source();
        graph.connect_to_ancestor(VertexIx(1), root).unwrap();
        graph.set_gmrca(root);
        assert!(!validate(&graph));
    }

    #[test]
    fn matching_haplotypes() {
        let snps = Domain::with_cardinality(3).unwrap();
        let haps = Domain::with_cardinality(2).unwrap();
        let graph = cherry(&snps, &haps);

        let check = HaplotypeCheck::new(&graph, &haplotypes("010\n000\n")).unwrap();
        assert!(!check.has_errors());
        assert!(check.ancestral_sequence().is_empty());

        let check = HaplotypeCheck::new(&graph, &haplotypes("011\n001\n")).unwrap();
        assert!(!check.has_errors());
        assert_eq!(check.ancestral_sequence().iter().collect::<Vec<_>>(), vec![2]);
    }

    #[test]
    fn mismatching_haplotypes() {
        let snps = Domain::with_cardinality(3).unwrap();
        let haps = Domain::with_cardinality(2).unwrap();
        let graph = cherry(&snps, &haps);

        let check = HaplotypeCheck::new(&graph, &haplotypes("000\n000\n")).unwrap();
        assert!(check.has_errors());
        assert_eq!(check.error_count(), 1);
        assert_eq!(check.error_columns().iter().collect::<Vec<_>>(), vec![1]);
        assert_eq!(check.errors()[0].iter().collect::<Vec<_>>(), vec![1]);

        assert!(HaplotypeCheck::new(&graph, &haplotypes("0M0\n000\n")).is_err());
    }
}
