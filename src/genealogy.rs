/*!
The ancestral recombination graph of one sample.

A [`Genealogy`] owns its vertices and edges in two arenas, and refers
to them by [`VertexIx`] and [`EdgeIx`]. Edges point forward in time,
from an ancestor (the source) to a descendant (the target). Every
edge carries the region of SNP positions on which it is ancestral,
and the mutations that happened along it.

The graph algorithms are split across the submodules:

* [`vertex`] has the degree queries and the edit primitives used while
  building a graph
* [`clip`] extracts the sub-history of a region as a new genealogy
* [`bipartition`] enumerates the clade bipartitions of a tree
* [`recombination`] derives breakpoint statistics
* [`lineage`] traces the mutations inherited by a vertex
*/

#[allow(unused_imports)]
use log::{debug, error, info, trace};

use crate::error::Result;
use crate::index::{EdgeIx, VertexIx};
use crate::set::{DomainRef, FiniteSet, NaturalSet};

pub mod bipartition;
pub mod clip;
pub mod lineage;
pub mod recombination;
pub mod vertex;

/// A mutation at an absolute SNP position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Mutation {
    position: usize,
}

impl Mutation {
    #[inline]
    pub fn new(position: usize) -> Self {
        Mutation { position }
    }

    #[inline]
    pub fn position(&self) -> usize {
        self.position
    }
}

#[derive(Debug, Clone)]
pub struct Edge {
    pub(crate) source: VertexIx,
    pub(crate) target: VertexIx,
    pub(crate) active: NaturalSet,
    pub(crate) mutations: Vec<Mutation>,
}

impl Edge {
    #[inline]
    pub fn source(&self) -> VertexIx {
        self.source
    }

    #[inline]
    pub fn target(&self) -> VertexIx {
        self.target
    }

    /// The SNP positions on which this edge is ancestral.
    #[inline]
    pub fn active_region(&self) -> &NaturalSet {
        &self.active
    }

    #[inline]
    pub fn mutations(&self) -> &[Mutation] {
        &self.mutations
    }

    pub fn has_mutations_in(&self, region: &NaturalSet) -> bool {
        self.mutations.iter().any(|m| region.contains(m.position))
    }
}

#[derive(Debug, Clone)]
pub struct Vertex {
    pub(crate) label: usize,
    pub(crate) edges: Vec<EdgeIx>,
}

impl Vertex {
    /// The external label. Leaves are labeled by their haplotype
    /// position; other labels are assigned by the event log and may
    /// change as the graph is edited.
    #[inline]
    pub fn label(&self) -> usize {
        self.label
    }

    /// Every incident edge, incoming and outgoing.
    #[inline]
    pub fn edges(&self) -> &[EdgeIx] {
        &self.edges
    }
}

#[derive(Debug, Clone)]
pub struct Genealogy {
    snp_domain: DomainRef,
    haplotype_domain: DomainRef,
    ancestral: NaturalSet,
    vertices: Vec<Vertex>,
    edges: Vec<Edge>,
    // live vertices and edges, in canonical order after `sort`
    vertex_order: Vec<VertexIx>,
    edge_order: Vec<EdgeIx>,
    gmrca: Option<VertexIx>,
}

impl Genealogy {
    /// A graph holding one unconnected leaf per haplotype, labeled by
    /// the haplotype's position.
    pub fn new(snp_domain: &DomainRef, haplotype_domain: &DomainRef) -> Self {
        let ancestral = NaturalSet::empty(snp_domain);
        let mut graph =
            Genealogy::with_parts(snp_domain, haplotype_domain, ancestral);
        for label in haplotype_domain.iter() {
            graph.add_vertex(label);
        }
        graph
    }

    pub(crate) fn with_parts(
        snp_domain: &DomainRef,
        haplotype_domain: &DomainRef,
        ancestral: NaturalSet,
    ) -> Self {
        Genealogy {
            snp_domain: snp_domain.clone(),
            haplotype_domain: haplotype_domain.clone(),
            ancestral,
            vertices: Vec::new(),
            edges: Vec::new(),
            vertex_order: Vec::new(),
            edge_order: Vec::new(),
            gmrca: None,
        }
    }

    #[inline]
    pub fn snp_domain(&self) -> &DomainRef {
        &self.snp_domain
    }

    #[inline]
    pub fn haplotype_domain(&self) -> &DomainRef {
        &self.haplotype_domain
    }

    /// The allele of the root at each SNP position.
    #[inline]
    pub fn ancestral_sequence(&self) -> &NaturalSet {
        &self.ancestral
    }

    pub fn set_ancestral_sequence(&mut self, sequence: NaturalSet) -> Result<()> {
        self.ancestral = sequence.project_onto(&self.snp_domain)?;
        Ok(())
    }

    /// The live vertices, in canonical order after a call to `sort`.
    pub fn vertices(&self) -> impl Iterator<Item = VertexIx> + '_ {
        self.vertex_order.iter().copied()
    }

    /// The live edges, in canonical order after a call to `sort`.
    pub fn edges(&self) -> impl Iterator<Item = EdgeIx> + '_ {
        self.edge_order.iter().copied()
    }

    #[inline]
    pub fn vertex_count(&self) -> usize {
        self.vertex_order.len()
    }

    #[inline]
    pub fn edge_count(&self) -> usize {
        self.edge_order.len()
    }

    #[inline]
    pub fn vertex(&self, ix: VertexIx) -> &Vertex {
        &self.vertices[ix.index()]
    }

    #[inline]
    pub fn edge(&self, ix: EdgeIx) -> &Edge {
        &self.edges[ix.index()]
    }

    #[inline]
    pub fn label(&self, ix: VertexIx) -> usize {
        self.vertices[ix.index()].label
    }

    #[inline]
    pub fn gmrca(&self) -> Option<VertexIx> {
        self.gmrca
    }

    #[inline]
    pub(crate) fn set_gmrca(&mut self, root: VertexIx) {
        self.gmrca = Some(root);
    }

    /// The live vertex with the given label, if there is one.
    pub fn find_label(&self, label: usize) -> Option<VertexIx> {
        self.vertices().find(|&v| self.label(v) == label)
    }

    /// The vertices without outgoing edges, ordered by label.
    pub fn leaves(&self) -> Vec<VertexIx> {
        let mut leaves = self
            .vertices()
            .filter(|&v| self.is_leaf(v))
            .collect::<Vec<_>>();
        leaves.sort_by_key(|&v| self.label(v));
        leaves
    }

    /// True if the graph has no recombination vertices.
    #[inline]
    pub fn is_tree(&self) -> bool {
        self.vertex_order.len() == self.edge_order.len() + 1
    }

    pub(crate) fn add_vertex(&mut self, label: usize) -> VertexIx {
        let ix = VertexIx::from(self.vertices.len());
        self.vertices.push(Vertex {
            label,
            edges: Vec::new(),
        });
        self.vertex_order.push(ix);
        ix
    }

    pub(crate) fn add_edge(
        &mut self,
        source: VertexIx,
        target: VertexIx,
        active: NaturalSet,
    ) -> EdgeIx {
        let ix = EdgeIx::from(self.edges.len());
        self.edges.push(Edge {
            source,
            target,
            active,
            mutations: Vec::new(),
        });
        self.vertices[source.index()].edges.push(ix);
        self.vertices[target.index()].edges.push(ix);
        self.edge_order.push(ix);
        ix
    }

    /// Takes a vertex out of the live set. Its edges must already
    /// have been moved to another vertex.
    pub(crate) fn retire_vertex(&mut self, ix: VertexIx) {
        self.vertex_order.retain(|&v| v != ix);
        self.vertices[ix.index()].edges.clear();
    }

    /// Puts the graph in canonical order: vertices by label, edges and
    /// each vertex's incident edges by active region, and mutations by
    /// position. All sorts are stable.
    pub fn sort(&mut self) {
        let vertices = &self.vertices;
        self.vertex_order.sort_by_key(|v| vertices[v.index()].label);

        let edges = &self.edges;
        let by_region = |a: &EdgeIx, b: &EdgeIx| {
            let (x, y) = (&edges[a.index()].active, &edges[b.index()].active);
            x.partial_cmp(y).unwrap_or(std::cmp::Ordering::Equal)
        };
        self.edge_order.sort_by(by_region);
        for vertex in self.vertices.iter_mut() {
            vertex.edges.sort_by(by_region);
        }

        for edge in self.edges.iter_mut() {
            edge.mutations.sort();
        }
    }

    /// Logs every edge with an empty active region and returns how
    /// many there are.
    pub fn report_empty_regions(&self) -> usize {
        let mut count = 0;
        for e in self.edges() {
            let edge = self.edge(e);
            if edge.active.is_empty() {
                count += 1;
                error!(
                    "empty active region for edge {} -> {}",
                    self.label(edge.source),
                    self.label(edge.target)
                );
            }
        }
        if count > 0 {
            error!("found {} edges with empty active region", count);
        }
        count
    }
}

impl std::fmt::Display for Genealogy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Genealogy {{ SNP: {}, SEQ: {}, V: {}, E: {} }}",
            self.snp_domain,
            self.haplotype_domain,
            self.vertex_count(),
            self.edge_count()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::set::Domain;

    #[test]
    fn new_graph_has_one_leaf_per_haplotype() {
        let snps = Domain::with_cardinality(10).unwrap();
        let haps = Domain::closed(3, 6).unwrap();
        let graph = Genealogy::new(&snps, &haps);

        assert_eq!(graph.vertex_count(), 4);
        assert_eq!(graph.edge_count(), 0);
        assert!(graph.gmrca().is_none());
        let labels = graph
            .leaves()
            .into_iter()
            .map(|v| graph.label(v))
            .collect::<Vec<_>>();
        assert_eq!(labels, vec![3, 4, 5, 6]);
        assert!(graph.ancestral_sequence().is_empty());
    }

    #[test]
    fn sort_orders_vertices_edges_and_mutations() {
        let snps = Domain::with_cardinality(10).unwrap();
        let haps = Domain::with_cardinality(2).unwrap();
        let mut graph = Genealogy::new(&snps, &haps);
        let root = graph.add_vertex(7);
        let parent = graph.add_vertex(5);

        let right = NaturalSet::closed(&snps, 5, 9).unwrap();
        let left = NaturalSet::closed(&snps, 0, 4).unwrap();
        let e1 = graph.add_edge(parent, VertexIx(0), right);
        let e2 = graph.add_edge(parent, VertexIx(1), left);
        let e3 = graph.add_edge(root, parent, NaturalSet::complete(&snps));
        graph.mutate(e1, 8);
        graph.mutate(e1, 6);

        graph.sort();

        let labels = graph.vertices().map(|v| graph.label(v)).collect::<Vec<_>>();
        assert_eq!(labels, vec![0, 1, 5, 7]);
        assert_eq!(graph.vertex(parent).edges(), &[e3, e2, e1]);
        assert_eq!(graph.edges().collect::<Vec<_>>(), vec![e3, e2, e1]);
        let positions = graph
            .edge(e1)
            .mutations()
            .iter()
            .map(|m| m.position())
            .collect::<Vec<_>>();
        assert_eq!(positions, vec![6, 8]);
    }

    #[test]
    fn empty_regions_are_counted() {
        let snps = Domain::with_cardinality(4).unwrap();
        let haps = Domain::with_cardinality(1).unwrap();
        let mut graph = Genealogy::new(&snps, &haps);
        let root = graph.add_vertex(1);
        graph.add_edge(root, VertexIx(0), NaturalSet::empty(&snps));
        assert_eq!(graph.report_empty_regions(), 1);
    }
}
