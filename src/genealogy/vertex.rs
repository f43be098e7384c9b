/*!
Degree queries and the edit primitives of a [`Genealogy`].

All edits go through the owning genealogy, since a vertex only holds
the indices of its incident edges.
*/

#[allow(unused_imports)]
use log::{debug, error, info, trace};

use crate::error::Result;
use crate::index::{EdgeIx, VertexIx};
use crate::set::{FiniteSet, NaturalSet};

use super::{Genealogy, Mutation};

impl Genealogy {
    /// The edges entering `v`, i.e. those from its ancestors.
    pub fn incoming(&self, v: VertexIx) -> impl Iterator<Item = EdgeIx> + '_ {
        self.vertex(v)
            .edges
            .iter()
            .copied()
            .filter(move |&e| self.edge(e).target == v)
    }

    /// The edges leaving `v`, i.e. those to its descendants.
    pub fn outgoing(&self, v: VertexIx) -> impl Iterator<Item = EdgeIx> + '_ {
        self.vertex(v)
            .edges
            .iter()
            .copied()
            .filter(move |&e| self.edge(e).source == v)
    }

    #[inline]
    pub fn in_degree(&self, v: VertexIx) -> usize {
        self.incoming(v).count()
    }

    #[inline]
    pub fn out_degree(&self, v: VertexIx) -> usize {
        self.outgoing(v).count()
    }

    /// The number of incoming edges active somewhere on `region`.
    pub fn in_degree_on(&self, v: VertexIx, region: &NaturalSet) -> Result<usize> {
        let mut count = 0;
        for e in self.incoming(v) {
            if self.edge(e).active.intersection_count(region)? > 0 {
                count += 1;
            }
        }
        Ok(count)
    }

    /// The number of outgoing edges active somewhere on `region`.
    pub fn out_degree_on(&self, v: VertexIx, region: &NaturalSet) -> Result<usize> {
        let mut count = 0;
        for e in self.outgoing(v) {
            if self.edge(e).active.intersection_count(region)? > 0 {
                count += 1;
            }
        }
        Ok(count)
    }

    /// The first outgoing edge active somewhere on `region`.
    pub(crate) fn first_outgoing_on(
        &self,
        v: VertexIx,
        region: &NaturalSet,
    ) -> Result<Option<EdgeIx>> {
        for e in self.outgoing(v) {
            if self.edge(e).active.intersection_count(region)? > 0 {
                return Ok(Some(e));
            }
        }
        Ok(None)
    }

    /// True if `v` has exactly one incoming and one outgoing edge
    /// active on `region`.
    pub fn is_degenerate(&self, v: VertexIx, region: &NaturalSet) -> Result<bool> {
        Ok(self.in_degree_on(v, region)? == 1
            && self.out_degree_on(v, region)? == 1)
    }

    #[inline]
    pub fn is_leaf(&self, v: VertexIx) -> bool {
        self.outgoing(v).next().is_none()
    }

    #[inline]
    pub fn is_root(&self, v: VertexIx) -> bool {
        self.incoming(v).next().is_none()
    }

    fn union_of<I>(&self, edges: I) -> Result<NaturalSet>
    where
        I: Iterator<Item = EdgeIx>,
    {
        let mut region = NaturalSet::empty(self.snp_domain());
        for e in edges {
            region.union(&self.edge(e).active)?;
        }
        Ok(region)
    }

    /// The union of the regions of the incoming edges, or the whole
    /// SNP domain for a root. Fails if an edge region is defined over
    /// another domain.
    pub fn in_active_region(&self, v: VertexIx) -> Result<NaturalSet> {
        if self.is_root(v) {
            Ok(NaturalSet::complete(self.snp_domain()))
        } else {
            self.union_of(self.incoming(v))
        }
    }

    /// The union of the regions of the outgoing edges, or the whole
    /// SNP domain for a leaf.
    pub fn out_active_region(&self, v: VertexIx) -> Result<NaturalSet> {
        if self.is_leaf(v) {
            Ok(NaturalSet::complete(self.snp_domain()))
        } else {
            self.union_of(self.outgoing(v))
        }
    }

    /// Changes the external label of `v`.
    #[inline]
    pub fn set_label(&mut self, v: VertexIx, label: usize) {
        self.vertices[v.index()].label = label;
    }

    /// Adds a new vertex as the parent of `v`, ancestral on all of
    /// `v`'s outgoing region.
    pub fn create_ancestor(&mut self, v: VertexIx, label: usize) -> Result<EdgeIx> {
        let region = self.out_active_region(v)?;
        Ok(self.create_ancestor_with(v, label, region))
    }

    /// Adds a new vertex as the parent of `v`, ancestral on `region`.
    pub fn create_ancestor_with(
        &mut self,
        v: VertexIx,
        label: usize,
        region: NaturalSet,
    ) -> EdgeIx {
        let ancestor = self.add_vertex(label);
        self.add_edge(ancestor, v, region)
    }

    /// Connects `v` to an existing ancestor over all of `v`'s outgoing
    /// region.
    pub fn connect_to_ancestor(
        &mut self,
        v: VertexIx,
        ancestor: VertexIx,
    ) -> Result<EdgeIx> {
        let region = self.out_active_region(v)?;
        Ok(self.add_edge(ancestor, v, region))
    }

    /// Splits `v` at a breakpoint. A new vertex labeled `label` takes
    /// over every outgoing region above `position`, along with the
    /// mutations in it; `v` keeps the positions up to and including
    /// `position`.
    pub fn split(&mut self, v: VertexIx, label: usize, position: usize) -> VertexIx {
        let split = self.add_vertex(label);
        let outgoing = self.outgoing(v).collect::<Vec<_>>();

        for e in outgoing {
            let (target, upper, moved) = {
                let edge = &mut self.edges[e.index()];
                let upper = edge.active.copy_from(position.saturating_add(1));
                let (moved, kept): (Vec<Mutation>, Vec<Mutation>) = edge
                    .mutations
                    .drain(..)
                    .partition(|m| upper.contains(m.position));
                edge.mutations = kept;
                edge.active.remove_above(position);
                (edge.target, upper, moved)
            };
            let new_edge = self.add_edge(split, target, upper);
            self.edges[new_edge.index()].mutations = moved;
        }

        split
    }

    /// Moves every edge of `other` onto `v`, retires `other`, and
    /// relabels `v`.
    pub fn merge(&mut self, v: VertexIx, label: usize, other: VertexIx) -> VertexIx {
        let moved = std::mem::take(&mut self.vertices[other.index()].edges);
        for e in moved {
            let edge = &mut self.edges[e.index()];
            if edge.source == other {
                edge.source = v;
            }
            if edge.target == other {
                edge.target = v;
            }
            self.vertices[v.index()].edges.push(e);
        }
        self.retire_vertex(other);
        if self.gmrca == Some(other) {
            self.gmrca = Some(v);
        }
        self.set_label(v, label);
        v
    }

    /// Records a mutation at `position` on edge `e`.
    #[inline]
    pub fn mutate(&mut self, e: EdgeIx, position: usize) {
        self.edges[e.index()].mutations.push(Mutation::new(position));
    }
}
