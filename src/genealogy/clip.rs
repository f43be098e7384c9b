/*!
Extraction of the sub-history of a SNP region as a new [`Genealogy`].
*/

use std::collections::VecDeque;

use fnv::FnvHashMap;

#[allow(unused_imports)]
use log::{debug, error, info, trace};

use crate::error::{ArgError, Result};
use crate::index::VertexIx;
use crate::options::ClipOptions;
use crate::set::{Domain, FiniteSet, NaturalSet};

use super::{Genealogy, Mutation};

/// An edge of the clip whose source has been copied, but whose target
/// still refers to the original graph.
struct Pending {
    source: VertexIx,
    target: VertexIx,
    active: NaturalSet,
    mutations: Vec<Mutation>,
}

impl Genealogy {
    /// The sub-history of `region`, rooted at the first branch point
    /// below the root.
    pub fn clip(&self, region: &NaturalSet) -> Result<Genealogy> {
        let root = self.gmrca().ok_or_else(|| {
            ArgError::UnsatisfiableClip("the genealogy has no root".to_string())
        })?;
        self.clip_with(region, root, ClipOptions::default())
    }

    /// An independent copy, clipped to the complete SNP domain.
    pub fn duplicate(&self) -> Result<Genealogy> {
        self.clip(&NaturalSet::complete(self.snp_domain()))
    }

    /// The sub-history of `region` below `start`.
    ///
    /// The new genealogy is defined over the sub-domain of the SNP
    /// domain that holds exactly the positions of `region`. Starting
    /// from `start`, the copy first descends past every vertex with a
    /// single outgoing edge active on `region`, then copies forward in
    /// time, following only edges whose active region meets `region`.
    /// Every original vertex is copied at most once. If
    /// `options.collapse` is set, vertices with a single incoming and
    /// a single outgoing edge on `region` are skipped and their
    /// mutations are moved onto the surviving edge.
    ///
    /// If `start` is not the root, the haplotype domain of the clip
    /// holds only the labels of the leaves reached.
    pub fn clip_with(
        &self,
        region: &NaturalSet,
        start: VertexIx,
        options: ClipOptions,
    ) -> Result<Genealogy> {
        if !Domain::same(region.domain(), self.snp_domain()) {
            return Err(ArgError::mismatch(format!(
                "clip region {} is not defined over the SNP domain {}",
                region,
                self.snp_domain()
            )));
        }
        if region.is_empty() {
            return Err(ArgError::UnsatisfiableClip(format!(
                "region {} is empty",
                region
            )));
        }

        let sub_domain = self.snp_domain().sub_domain(region)?;
        let ancestral = self.ancestral_sequence().project_onto(&sub_domain)?;
        let mut clip =
            Genealogy::with_parts(&sub_domain, self.haplotype_domain(), ancestral);

        let mut top = start;
        while self.out_degree_on(top, region)? == 1 {
            match self.first_outgoing_on(top, region)? {
                Some(e) => top = self.edge(e).target,
                None => break,
            }
        }

        let mut copies: FnvHashMap<VertexIx, VertexIx> = FnvHashMap::default();
        let mut queue: VecDeque<Pending> = VecDeque::new();

        let root = self.copy_vertex(&mut clip, top, &mut queue)?;
        copies.insert(top, root);
        clip.set_gmrca(root);

        while let Some(pending) = queue.pop_front() {
            let mut target = pending.target;
            let mut mutations = pending.mutations;
            let mut copy = copies.get(&target).copied();

            if copy.is_none() && options.collapse {
                while self.is_degenerate(target, region)? {
                    let next = match self.first_outgoing_on(target, region)? {
                        Some(e) => e,
                        None => break,
                    };
                    let edge = self.edge(next);
                    mutations.extend(
                        edge.mutations
                            .iter()
                            .filter(|m| region.contains(m.position))
                            .copied(),
                    );
                    target = edge.target;
                }
                copy = copies.get(&target).copied();
            }

            let copy = match copy {
                Some(copy) => copy,
                None => {
                    let copy = self.copy_vertex(&mut clip, target, &mut queue)?;
                    copies.insert(target, copy);
                    copy
                }
            };

            let e = clip.add_edge(pending.source, copy, pending.active);
            clip.edges[e.index()].mutations = mutations;
        }

        clip.sort();

        if self.gmrca() != Some(start) {
            let labels = clip
                .leaves()
                .into_iter()
                .map(|v| clip.label(v))
                .collect::<Vec<_>>();
            let reached = NaturalSet::from_positions(self.haplotype_domain(), labels)?;
            clip.haplotype_domain = self.haplotype_domain().sub_domain(&reached)?;
        }

        debug!(
            "clipped {} vertices and {} edges to {} and {}",
            self.vertex_count(),
            self.edge_count(),
            clip.vertex_count(),
            clip.edge_count()
        );

        Ok(clip)
    }

    /// Adds a copy of `original` to `clip` and queues each of its
    /// outgoing edges that stays active on the clip's SNP domain.
    fn copy_vertex(
        &self,
        clip: &mut Genealogy,
        original: VertexIx,
        queue: &mut VecDeque<Pending>,
    ) -> Result<VertexIx> {
        let copy = clip.add_vertex(self.label(original));
        for e in self.outgoing(original) {
            let edge = self.edge(e);
            let active = edge.active.project_onto(clip.snp_domain())?;
            if active.is_empty() {
                continue;
            }
            let mutations = edge
                .mutations
                .iter()
                .filter(|m| active.contains(m.position))
                .copied()
                .collect();
            queue.push_back(Pending {
                source: copy,
                target: edge.target,
                active,
                mutations,
            });
        }
        Ok(copy)
    }
}
