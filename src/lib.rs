/*!
Ancestral recombination graphs and the coordinate sets they are
defined over.

# Overview

An ancestral recombination graph, or ARG, records how a sample of
sequences descends from a common ancestor through coalescences,
mutations and recombinations. Every edge of the graph is ancestral on
some region of the sequence, so the crate is built on two parts:

* [`set`] is a set algebra over nested coordinate systems. A
  [`Space`](set::Space) anchors a closed interval of positions, a
  [`Domain`](set::Domain) selects a subset of a space, and a
  [`NaturalSet`](set::NaturalSet) selects a subset of a domain. Sets
  switch between a run and a bitmap as needed.
* [`genealogy`] holds the graph itself, a [`Genealogy`] that owns its
  vertices and edges in arenas indexed by [`VertexIx`](index::VertexIx)
  and [`EdgeIx`](index::EdgeIx).

# Building genealogies

A [`GenealogyReader`] replays an event log into one genealogy per ARG,
using a [`GenealogyFactory`] for the graph edits. The factory can also
be driven directly.

```
use argraph::GenealogyReader;
use std::io::Cursor;

let log = "%ARGINFERENCE\n4 6 NA NA NA NA NA NA\n%ARGS\nARG 0\n\
           1 co 0 1 4\n2 co 2 3 5\n3 co 4 5 6\n";
let mut reader = GenealogyReader::new(Cursor::new(log)).unwrap();
let graph = reader.read_next().unwrap().unwrap();
assert!(graph.is_tree());
assert_eq!(graph.gmrca().map(|v| graph.label(v)), Some(6));
```

# Algorithms

* [`Genealogy::clip`] extracts the history of a region as a new
  genealogy.
* [`Genealogy::bipartitions`] lists the splits of a tree, and
  [`Genealogy::local_tree_bipartitions`] does so for every
  recombination free region.
* [`Genealogy::recombination_rates`] and its siblings locate the
  breakpoints of recombination vertices.
* [`Statistics`] accumulates recombination counts and local tree
  correlations over many genealogies of one sample, and writes them as
  XML.
* [`validate`] checks the structure of a graph and compares it with
  observed haplotypes.

*/

pub mod error;
pub mod index;
pub mod options;
pub mod set;

pub mod genealogy;

pub mod factory;
pub mod haplotype;
pub mod reader;

pub mod statistics;
pub mod validate;

pub use self::error::{ArgError, Result};
pub use self::factory::GenealogyFactory;
pub use self::genealogy::Genealogy;
pub use self::haplotype::{HaplotypeReader, HaplotypeSet};
pub use self::options::{BuildOptions, ClipOptions, DistanceMetric};
pub use self::reader::{GenealogyReader, ReadState};
pub use self::statistics::Statistics;
