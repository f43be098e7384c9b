/*!
Replays coalescence, mutation and recombination events into a
[`Genealogy`].

The factory keeps a table of stubs: the vertices that currently have
no ancestor, keyed by the integer the event log uses for them. Each
event consumes one or two stubs and replaces them with the vertices
it creates, so the table always holds the lineages that are still
open. When the log for a graph ends, the remaining stub is the root.
*/

use fnv::FnvHashMap;

#[allow(unused_imports)]
use log::{debug, error, info, trace, warn};

use crate::error::{ArgError, Result};
use crate::genealogy::Genealogy;
use crate::index::VertexIx;
use crate::options::BuildOptions;
use crate::set::{Domain, DomainRef, FiniteSet, NaturalSet};

pub struct GenealogyFactory {
    snp_domain: DomainRef,
    haplotype_domain: DomainRef,
    snp_filter: NaturalSet,
    options: BuildOptions,
    stubs: FnvHashMap<usize, VertexIx>,
    genealogy: Option<Genealogy>,
}

impl GenealogyFactory {
    pub fn new(
        snp_domain: &DomainRef,
        haplotype_domain: &DomainRef,
        options: BuildOptions,
    ) -> Self {
        GenealogyFactory {
            snp_domain: snp_domain.clone(),
            haplotype_domain: haplotype_domain.clone(),
            snp_filter: NaturalSet::complete(snp_domain),
            options,
            stubs: FnvHashMap::default(),
            genealogy: None,
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

    #[inline]
    pub fn options(&self) -> BuildOptions {
        self.options
    }

    /// Restricts every finished genealogy to the SNPs of `region`.
    pub fn filter_snp(&mut self, region: &NaturalSet) -> Result<()> {
        self.snp_filter = Domain::project(&self.snp_domain, region)?;
        Ok(())
    }

    /// Begins a new genealogy, with one stub per haplotype.
    pub fn start(&mut self) {
        let genealogy = Genealogy::new(&self.snp_domain, &self.haplotype_domain);
        self.stubs.clear();
        for v in genealogy.vertices() {
            self.stubs.insert(genealogy.label(v), v);
        }
        self.genealogy = Some(genealogy);
    }

    /// True between `start` and `finish`.
    #[inline]
    pub fn is_building(&self) -> bool {
        self.genealogy.is_some()
    }

    fn graph(&mut self) -> Result<&mut Genealogy> {
        self.genealogy
            .as_mut()
            .ok_or_else(|| ArgError::malformed(0, "event outside of a genealogy"))
    }

    fn take_stub(&mut self, key: usize) -> Result<VertexIx> {
        self.stubs
            .remove(&key)
            .ok_or_else(|| ArgError::malformed(0, format!("unknown lineage {}", key)))
    }

    /// A mutation at `marker` on the lineage of `target`, whose
    /// ancestor becomes the stub `source`.
    pub fn mutate(&mut self, target: usize, source: usize, marker: usize) -> Result<()> {
        trace!("mu {} {} {}", target, source, marker);
        self.snp_domain.to_local(marker)?;
        let child = self.take_stub(target)?;
        let multifurcate = self.options.multifurcate;
        let graph = self.graph()?;

        let ancestor = if multifurcate && graph.out_degree(child) == 1 {
            let below = graph.outgoing(child).next();
            if let Some(e) = below {
                graph.mutate(e, marker);
            }
            graph.set_label(child, source);
            child
        } else {
            let e = graph.create_ancestor(child, source)?;
            graph.mutate(e, marker);
            graph.edge(e).source()
        };

        self.stubs.insert(source, ancestor);
        Ok(())
    }

    /// Joins the lineages `one` and `two` in the stub `parent`.
    pub fn coalesce(&mut self, one: usize, two: usize, parent: usize) -> Result<()> {
        trace!("co {} {} {}", one, two, parent);
        let one = self.take_stub(one)?;
        let two = self.take_stub(two)?;
        let multifurcate = self.options.multifurcate;
        let graph = self.graph()?;

        let ancestor = if !multifurcate {
            let e = graph.create_ancestor(one, parent)?;
            let ancestor = graph.edge(e).source();
            graph.connect_to_ancestor(two, ancestor)?;
            ancestor
        } else {
            match (graph.is_leaf(one), graph.is_leaf(two)) {
                (false, false) => graph.merge(one, parent, two),
                (true, true) => {
                    let e = graph.create_ancestor(one, parent)?;
                    let ancestor = graph.edge(e).source();
                    graph.connect_to_ancestor(two, ancestor)?;
                    ancestor
                }
                (leaf_one, _) => {
                    let (leaf, internal) = if leaf_one { (one, two) } else { (two, one) };
                    graph.set_label(internal, parent);
                    graph.connect_to_ancestor(leaf, internal)?;
                    internal
                }
            }
        };

        self.stubs.insert(parent, ancestor);
        Ok(())
    }

    /// Splits the lineage of `child` after SNP `breakpoint`: the stub
    /// `left` inherits the positions up to and including it, the stub
    /// `right` the positions above.
    pub fn recombine(
        &mut self,
        child: usize,
        left: usize,
        right: usize,
        breakpoint: usize,
    ) -> Result<()> {
        trace!("re {} {} {} {}", child, left, right, breakpoint);
        self.snp_domain.to_local(breakpoint)?;
        let vertex = self.take_stub(child)?;
        let multifurcate = self.options.multifurcate;
        let graph = self.graph()?;

        let (left_vertex, right_vertex) = if multifurcate && graph.out_degree(vertex) == 1 {
            graph.set_label(vertex, left);
            let split = graph.split(vertex, right, breakpoint);
            (vertex, split)
        } else {
            let activity = graph.out_active_region(vertex)?;
            let lower = activity.copy_up_to(breakpoint);
            let upper = activity.copy_from(breakpoint.saturating_add(1));
            let e = graph.create_ancestor_with(vertex, left, lower);
            let left_vertex = graph.edge(e).source();
            let e = graph.create_ancestor_with(vertex, right, upper);
            (left_vertex, graph.edge(e).source())
        };

        self.stubs.insert(left, left_vertex);
        self.stubs.insert(right, right_vertex);
        Ok(())
    }

    /// Completes the current genealogy: sorts it, picks the root, and
    /// clips it to the SNP filter. If more than one lineage is still
    /// open, they are joined under a new root labeled one above the
    /// largest label in the graph.
    pub fn finish(&mut self) -> Result<Genealogy> {
        let mut graph = self
            .genealogy
            .take()
            .ok_or_else(|| ArgError::malformed(0, "no genealogy to finish"))?;
        let mut stubs = std::mem::take(&mut self.stubs)
            .into_iter()
            .collect::<Vec<_>>();
        stubs.sort();

        graph.sort();

        let root = match stubs.as_slice() {
            [] => {
                return Err(ArgError::UnsatisfiableClip(
                    "no open lineage is left to be the root".to_string(),
                ))
            }
            [(_, root)] => *root,
            [(_, first), rest @ ..] => {
                let label = graph
                    .vertices()
                    .map(|v| graph.label(v))
                    .max()
                    .map_or(0, |max| max + 1);
                warn!(
                    "{} lineages are still open, joining them under a new root {}",
                    stubs.len(),
                    label
                );
                let e = graph.create_ancestor(*first, label)?;
                let root = graph.edge(e).source();
                for (_, v) in rest {
                    graph.connect_to_ancestor(*v, root)?;
                }
                root
            }
        };
        graph.set_gmrca(root);

        let mut clip = graph.clip_with(&self.snp_filter, root, self.options.clip)?;

        if self.options.multifurcate {
            let order = clip.vertices().collect::<Vec<_>>();
            for (label, v) in order.into_iter().enumerate() {
                clip.set_label(v, label);
            }
        }

        debug!(
            "built {} from {} vertices over {} SNPs",
            clip,
            graph.vertex_count(),
            self.snp_filter.cardinality()
        );
        Ok(clip)
    }
}
