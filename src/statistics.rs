/*!
Recombination and local tree statistics accumulated over many
genealogies of the same sample.

For every SNP the statistics count the recombinations between it and
the next SNP. For every pair of SNPs `(i, j)` with `j <= i` they sum a
score comparing the local trees that cover `i` and `j`: the number of
bipartitions the two trees share, or the number found in only one of
them, depending on the [`DistanceMetric`].
*/

use std::io::Write;

#[allow(unused_imports)]
use log::{debug, error, info, trace};

use crate::error::{ArgError, Result};
use crate::genealogy::Genealogy;
use crate::haplotype::HaplotypeSet;
use crate::options::DistanceMetric;
use crate::set::{Domain, DomainRef, FiniteSet, NaturalSet, SetCollection};

#[derive(Debug, Clone)]
pub struct Statistics {
    name: String,
    metric: DistanceMetric,
    snp_domain: DomainRef,
    haplotype_domain: DomainRef,
    base_pair_domain: DomainRef,
    marker_positions: Vec<usize>,
    recombinations: Vec<usize>,
    // lower triangle, row i holds the columns 0..=i
    correlation: Vec<Vec<usize>>,
    genealogies: usize,
}

impl Statistics {
    /// Empty statistics for the sample of a haplotype file.
    pub fn new(name: &str, haplotypes: &HaplotypeSet, metric: DistanceMetric) -> Self {
        Self::with_parts(
            name,
            metric,
            haplotypes.snp_domain(),
            haplotypes.haplotype_domain(),
            haplotypes.base_pair_domain(),
            haplotypes.marker_positions().to_vec(),
        )
    }

    /// Empty statistics for a sample without base pair positions. Each
    /// SNP is placed at its own position.
    pub fn with_domains(
        name: &str,
        snp_domain: &DomainRef,
        haplotype_domain: &DomainRef,
        metric: DistanceMetric,
    ) -> Self {
        Self::with_parts(
            name,
            metric,
            snp_domain,
            haplotype_domain,
            snp_domain,
            snp_domain.iter().collect(),
        )
    }

    fn with_parts(
        name: &str,
        metric: DistanceMetric,
        snp_domain: &DomainRef,
        haplotype_domain: &DomainRef,
        base_pair_domain: &DomainRef,
        marker_positions: Vec<usize>,
    ) -> Self {
        let n = snp_domain.cardinality();
        Statistics {
            name: name.to_string(),
            metric,
            snp_domain: snp_domain.clone(),
            haplotype_domain: haplotype_domain.clone(),
            base_pair_domain: base_pair_domain.clone(),
            marker_positions,
            recombinations: vec![0; n],
            correlation: (0..n).map(|i| vec![0; i + 1]).collect(),
            genealogies: 0,
        }
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: &str) {
        self.name = name.to_string();
    }

    #[inline]
    pub fn metric(&self) -> DistanceMetric {
        self.metric
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
    pub fn base_pair_domain(&self) -> &DomainRef {
        &self.base_pair_domain
    }

    #[inline]
    pub fn marker_positions(&self) -> &[usize] {
        &self.marker_positions
    }

    /// The number of genealogies added so far.
    #[inline]
    pub fn genealogies(&self) -> usize {
        self.genealogies
    }

    fn check_domains(&self, snps: &DomainRef, haplotypes: &DomainRef) -> Result<()> {
        if Domain::same(&self.snp_domain, snps)
            && Domain::same(&self.haplotype_domain, haplotypes)
        {
            Ok(())
        } else {
            Err(ArgError::mismatch(format!(
                "statistics over {} and {} cannot take data over {} and {}",
                self.snp_domain, self.haplotype_domain, snps, haplotypes
            )))
        }
    }

    /// Adds the recombinations and the local trees of `genealogy`.
    pub fn add_genealogy(&mut self, genealogy: &Genealogy) -> Result<()> {
        self.check_domains(genealogy.snp_domain(), genealogy.haplotype_domain())?;

        for (count, rate) in self
            .recombinations
            .iter_mut()
            .zip(genealogy.recombination_rates())
        {
            *count += rate;
        }

        let trees = genealogy
            .local_tree_bipartitions()?
            .into_iter()
            .filter_map(|(frame, splits)| match splits {
                Some(splits) => Some((frame, splits)),
                None => {
                    error!("local tree of {} is not a tree", frame);
                    None
                }
            })
            .collect::<Vec<_>>();

        for (x, x_splits) in trees.iter() {
            for (y, y_splits) in trees.iter() {
                let value = self.score(x_splits, y_splits)?;
                self.add_block(x, y, value);
            }
        }

        self.genealogies += 1;
        debug!("added genealogy {} to {}", self.genealogies, self.name);
        Ok(())
    }

    fn score(&self, x: &SetCollection, y: &SetCollection) -> Result<usize> {
        let shared = x.intersect_count(y)?;
        Ok(match self.metric {
            DistanceMetric::SharedBipartitions => shared,
            DistanceMetric::SymmetricDifference => x.len() + y.len() - 2 * shared,
        })
    }

    // adds value to every cell (i, j) with i in x, j in y and j <= i
    fn add_block(&mut self, x: &NaturalSet, y: &NaturalSet, value: usize) {
        for i in x.local_indices() {
            for j in y.local_indices().take_while(|&j| j <= i) {
                self.correlation[i][j] += value;
            }
        }
    }

    /// Adds the counts of statistics over the same sample.
    pub fn add_statistics(&mut self, other: &Statistics) -> Result<()> {
        self.check_domains(&other.snp_domain, &other.haplotype_domain)?;
        if self.metric != other.metric {
            return Err(ArgError::mismatch(format!(
                "cannot add {:?} scores to {:?} scores",
                other.metric, self.metric
            )));
        }
        for (count, other) in self.recombinations.iter_mut().zip(other.recombinations.iter()) {
            *count += other;
        }
        for (row, other) in self.correlation.iter_mut().zip(other.correlation.iter()) {
            for (cell, other) in row.iter_mut().zip(other.iter()) {
                *cell += other;
            }
        }
        self.genealogies += other.genealogies;
        Ok(())
    }

    /// The statistics of the SNPs in `region` only.
    pub fn clip(&self, region: &NaturalSet) -> Result<Statistics> {
        if !Domain::same(region.domain(), &self.snp_domain) {
            return Err(ArgError::mismatch(format!(
                "statistics over {} cannot be clipped to {}",
                self.snp_domain, region
            )));
        }
        if region.is_empty() {
            return Err(ArgError::UnsatisfiableClip(format!(
                "region {} is empty",
                region
            )));
        }

        let snp_domain = self.snp_domain.sub_domain(region)?;
        let original = region
            .iter()
            .map(|p| self.snp_domain.to_local(p))
            .collect::<Result<Vec<_>>>()?;

        let marker_positions = original
            .iter()
            .map(|&o| self.marker_positions[o])
            .collect::<Vec<_>>();
        let base_pair_domain = Domain::from_positions(
            self.base_pair_domain.space(),
            marker_positions.iter().copied(),
        )?;

        let mut clip = Self::with_parts(
            &self.name,
            self.metric,
            &snp_domain,
            &self.haplotype_domain,
            &base_pair_domain,
            marker_positions,
        );
        for (k, &ok) in original.iter().enumerate() {
            clip.recombinations[k] = self.recombinations[ok];
            for (l, &ol) in original.iter().take(k + 1).enumerate() {
                clip.correlation[k][l] = self.correlation[ok][ol];
            }
        }
        clip.genealogies = self.genealogies;
        Ok(clip)
    }

    fn per_genealogy(&self, count: usize) -> f64 {
        if self.genealogies == 0 {
            0.0
        } else {
            count as f64 / self.genealogies as f64
        }
    }

    /// The mean number of recombinations between SNP `position` and
    /// the next.
    pub fn recombination_rate(&self, position: usize) -> Result<f64> {
        let local = self.snp_domain.to_local(position)?;
        Ok(self.per_genealogy(self.recombinations[local]))
    }

    /// Every recombination rate, by local index.
    pub fn recombination_rates(&self) -> Vec<f64> {
        self.recombinations
            .iter()
            .map(|&count| self.per_genealogy(count))
            .collect()
    }

    pub fn recombination_max(&self) -> f64 {
        let max = self.recombinations.iter().copied().max().unwrap_or(0);
        self.per_genealogy(max)
    }

    /// The local tree correlation of SNPs `i` and `j`, scaled to
    /// `[0, 1]`, where 1 means the local trees agree.
    ///
    /// Shared bipartition counts are scaled by the most a binary tree
    /// can share in every genealogy. Symmetric differences are scaled
    /// by their range over the whole matrix and reversed.
    pub fn local_tree_correlation(&self, i: usize, j: usize) -> Result<f64> {
        let (i, j) = (self.snp_domain.to_local(i)?, self.snp_domain.to_local(j)?);
        let value = self.correlation[i.max(j)][i.min(j)] as f64;

        let normalized = match self.metric {
            DistanceMetric::SharedBipartitions => {
                let splits = self.haplotype_domain.cardinality().saturating_sub(3);
                let max = (self.genealogies * splits) as f64;
                if max > 0.0 {
                    value / max
                } else {
                    0.0
                }
            }
            DistanceMetric::SymmetricDifference => {
                let cells = self.correlation.iter().flatten().copied();
                let (min, max) = cells.fold((usize::MAX, 0), |(lo, hi), c| (lo.min(c), hi.max(c)));
                let range = max.saturating_sub(min) as f64;
                if range > 0.0 {
                    1.0 - (value - min as f64) / range
                } else {
                    1.0
                }
            }
        };
        Ok(normalized)
    }

    /// The base pair position of SNP `position`.
    pub fn coordinate(&self, position: usize) -> Result<usize> {
        let local = self.snp_domain.to_local(position)?;
        Ok(self.marker_positions[local])
    }

    /// Writes a complete `<argml>` document holding these statistics.
    pub fn write_xml<W: Write>(&self, mut w: W) -> Result<()> {
        writeln!(&mut w, "<?xml version=\"1.0\" encoding=\"UTF-8\"?>")?;
        writeln!(&mut w, "<argml>")?;
        self.write_element(&mut w)?;
        writeln!(&mut w, "</argml>")?;
        Ok(())
    }

    /// Writes the `<statistics>` element alone.
    pub fn write_element<W: Write>(&self, mut w: W) -> Result<()> {
        writeln!(
            &mut w,
            "<statistics genealogies=\"{}\" name=\"{}\">",
            self.genealogies,
            escape(&self.name)
        )?;
        write_domain(&mut w, "haplotype", &self.haplotype_domain)?;
        write_domain(&mut w, "snp", &self.snp_domain)?;
        write_domain(&mut w, "basepair", &self.base_pair_domain)?;

        writeln!(&mut w, "<marker>{}</marker>", join(&self.marker_positions))?;
        writeln!(
            &mut w,
            "<recombination>{}</recombination>",
            join(&self.recombinations)
        )?;

        writeln!(&mut w, "<localtreecorrelation>")?;
        for row in self.correlation.iter() {
            writeln!(&mut w, "<row>{}</row>", join(row))?;
        }
        writeln!(&mut w, "</localtreecorrelation>")?;
        writeln!(&mut w, "</statistics>")?;
        Ok(())
    }
}

fn write_domain<W: Write>(mut w: W, name: &str, domain: &DomainRef) -> std::io::Result<()> {
    let space = domain.space();
    write!(
        &mut w,
        "<domain name=\"{}\"><space min=\"{}\" max=\"{}\"/>",
        name,
        space.origin(),
        space.origin() + space.last()
    )?;
    match (domain.is_continuous(), domain.min(), domain.max()) {
        (true, Some(min), Some(max)) => {
            write!(&mut w, "<continuous min=\"{}\" max=\"{}\"/>", min, max)?
        }
        (false, _, _) => write!(&mut w, "<fragments map=\"{}\"/>", domain.to_binary_string())?,
        _ => {}
    }
    writeln!(&mut w, "</domain>")
}

fn join(values: &[usize]) -> String {
    values
        .iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join(" ")
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

impl std::fmt::Display for Statistics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} {{ SNPS: {}, SEQS: {}, ARGS: {}, MAXRECS: {} }}",
            self.name,
            self.snp_domain,
            self.haplotype_domain,
            self.genealogies,
            self.recombination_max()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::factory::GenealogyFactory;
    use crate::options::BuildOptions;

    fn domains() -> (DomainRef, DomainRef) {
        (
            Domain::with_cardinality(6).unwrap(),
            Domain::with_cardinality(4).unwrap(),
        )
    }

    // ((0,1),(2,3)) everywhere
    fn balanced(snps: &DomainRef, haps: &DomainRef) -> Genealogy {
        let mut factory = GenealogyFactory::new(snps, haps, BuildOptions::default());
        factory.start();
        factory.coalesce(0, 1, 4).unwrap();
        factory.coalesce(2, 3, 5).unwrap();
        factory.coalesce(4, 5, 6).unwrap();
        factory.finish().unwrap()
    }

    // (((0,1),2),3) on [0,2] and ((0,2),(1,3)) on [3,5]
    fn recombinant(snps: &DomainRef, haps: &DomainRef) -> Genealogy {
        let mut factory = GenealogyFactory::new(snps, haps, BuildOptions::default());
        factory.start();
        factory.recombine(1, 4, 5, 2).unwrap();
        factory.coalesce(0, 4, 6).unwrap();
        factory.coalesce(5, 3, 7).unwrap();
        factory.coalesce(6, 2, 8).unwrap();
        factory.coalesce(8, 7, 9).unwrap();
        factory.finish().unwrap()
    }

    fn both(metric: DistanceMetric) -> Statistics {
        let (snps, haps) = domains();
        let mut stats = Statistics::with_domains("test", &snps, &haps, metric);
        stats.add_genealogy(&balanced(&snps, &haps)).unwrap();
        stats.add_genealogy(&recombinant(&snps, &haps)).unwrap();
        stats
    }

    #[test]
    fn recombination_rates() {
        let stats = both(DistanceMetric::SharedBipartitions);
        assert_eq!(stats.genealogies(), 2);
        assert_eq!(stats.recombination_rates(), vec![0.0, 0.0, 0.5, 0.0, 0.0, 0.0]);
        assert_eq!(stats.recombination_rate(2).unwrap(), 0.5);
        assert_eq!(stats.recombination_max(), 0.5);
        assert!(stats.recombination_rate(6).is_err());
    }

    #[test]
    fn shared_bipartitions() {
        let stats = both(DistanceMetric::SharedBipartitions);
        assert_eq!(stats.local_tree_correlation(0, 2).unwrap(), 1.0);
        assert_eq!(stats.local_tree_correlation(4, 3).unwrap(), 1.0);
        assert_eq!(stats.local_tree_correlation(5, 0).unwrap(), 0.5);
        assert_eq!(stats.local_tree_correlation(0, 5).unwrap(), 0.5);
    }

    #[test]
    fn symmetric_difference() {
        let stats = both(DistanceMetric::SymmetricDifference);
        assert_eq!(stats.local_tree_correlation(1, 1).unwrap(), 1.0);
        assert_eq!(stats.local_tree_correlation(5, 0).unwrap(), 0.0);
    }

    #[test]
    fn add_statistics_sums_counts() {
        let mut stats = both(DistanceMetric::SharedBipartitions);
        let other = both(DistanceMetric::SharedBipartitions);
        stats.add_statistics(&other).unwrap();
        assert_eq!(stats.genealogies(), 4);
        assert_eq!(stats.recombination_rate(2).unwrap(), 0.5);

        let (snps, _) = domains();
        let haps = Domain::with_cardinality(5).unwrap();
        let foreign = Statistics::with_domains("x", &snps, &haps, stats.metric());
        assert!(matches!(
            stats.add_statistics(&foreign),
            Err(ArgError::DomainMismatch(_))
        ));
    }

    #[test]
    fn clip_keeps_the_region() {
        let stats = both(DistanceMetric::SharedBipartitions);
        let region = NaturalSet::closed(stats.snp_domain(), 2, 4).unwrap();
        let clip = stats.clip(&region).unwrap();

        assert_eq!(clip.snp_domain().cardinality(), 3);
        assert_eq!(clip.recombination_rate(2).unwrap(), 0.5);
        assert_eq!(clip.recombination_rate(3).unwrap(), 0.0);
        assert_eq!(clip.coordinate(4).unwrap(), 4);
        assert_eq!(clip.local_tree_correlation(4, 2).unwrap(), 0.5);
        assert_eq!(clip.local_tree_correlation(4, 3).unwrap(), 1.0);
        assert!(clip.coordinate(1).is_err());
    }

    #[test]
    fn writes_xml() {
        let stats = both(DistanceMetric::SharedBipartitions);
        let mut out = Vec::new();
        stats.write_xml(&mut out).unwrap();
        let xml = String::from_utf8(out).unwrap();

        assert!(xml.starts_with("<?xml"));
        assert!(xml.contains("<statistics genealogies=\"2\" name=\"test\">"));
        assert!(xml.contains(
            "<domain name=\"snp\"><space min=\"0\" max=\"5\"/><continuous min=\"0\" max=\"5\"/></domain>"
        ));
        assert!(xml.contains("<marker>0 1 2 3 4 5</marker>"));
        assert!(xml.contains("<recombination>0 0 1 0 0 0</recombination>"));
        assert!(xml.contains("<row>2 2 2</row>"));
        assert!(xml.contains("<row>1 1 1 2 2 2</row>"));
        assert_eq!(xml.matches("<row>").count(), 6);
        assert!(xml.trim_end().ends_with("</argml>"));
    }
}
