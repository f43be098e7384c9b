/*!
Observed haplotypes and their text format.

The file starts with a header line `<cases> <controls> <markers>`,
then one line per marker giving its base pair position, in increasing
order, then one line per haplotype over the alphabet `0`, `1` and `M`,
where `M` marks a missing value. Every haplotype line is exactly
`markers` characters wide, and there are exactly `cases + controls` of
them.
*/

use std::io::BufRead;

use bstr::io::BufReadExt;
use bstr::ByteSlice;

#[allow(unused_imports)]
use log::{debug, error, info, trace};

use crate::error::{ArgError, Result};
use crate::set::{Bitmap, Domain, DomainRef, FiniteSet, NaturalSet, SetCollection, Space};

/// A biallelic haplotype. Positions in `missing` are unknown, and their
/// value in `markers` is meaningless.
#[derive(Debug, Clone, PartialEq)]
pub struct Haplotype {
    markers: NaturalSet,
    missing: NaturalSet,
}

impl Haplotype {
    pub fn new(markers: NaturalSet, missing: NaturalSet) -> Result<Self> {
        if !Domain::same(markers.domain(), missing.domain()) {
            return Err(ArgError::mismatch(
                "markers and missing values use different domains",
            ));
        }
        Ok(Haplotype { markers, missing })
    }

    /// Parses one `{0,1,M}` line, one character per position of
    /// `domain`.
    pub fn decode(line: &[u8], domain: &DomainRef) -> Option<Haplotype> {
        let n = domain.cardinality();
        if line.len() != n {
            return None;
        }
        let mut markers = Bitmap::new(n);
        let mut missing = Bitmap::new(n);
        for (ix, &b) in line.iter().enumerate() {
            match b {
                b'0' => {}
                b'1' => markers.set(ix),
                b'M' => missing.set(ix),
                _ => return None,
            }
        }
        Some(Haplotype {
            markers: NaturalSet::from_bitmap(domain, markers).ok()?,
            missing: NaturalSet::from_bitmap(domain, missing).ok()?,
        })
    }

    /// The positions with allele `1`.
    #[inline]
    pub fn markers(&self) -> &NaturalSet {
        &self.markers
    }

    #[inline]
    pub fn missing(&self) -> &NaturalSet {
        &self.missing
    }

    #[inline]
    pub fn domain(&self) -> &DomainRef {
        self.markers.domain()
    }

    pub fn project(&self, domain: &DomainRef) -> Result<Haplotype> {
        Ok(Haplotype {
            markers: Domain::project(domain, &self.markers)?,
            missing: Domain::project(domain, &self.missing)?,
        })
    }
}

impl std::fmt::Display for Haplotype {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for local in 0..self.domain().cardinality() {
            let position = self.domain().absolute(local);
            let c = if self.missing.contains(position) {
                'M'
            } else if self.markers.contains(position) {
                '1'
            } else {
                '0'
            };
            write!(f, "{}", c)?;
        }
        Ok(())
    }
}

/// All haplotypes of a sample, with the domains they were read with.
#[derive(Debug, Clone)]
pub struct HaplotypeSet {
    haplotype_domain: DomainRef,
    snp_domain: DomainRef,
    base_pair_domain: DomainRef,
    marker_positions: Vec<usize>,
    haplotypes: Vec<Haplotype>,
}

impl HaplotypeSet {
    #[inline]
    pub fn haplotype_domain(&self) -> &DomainRef {
        &self.haplotype_domain
    }

    #[inline]
    pub fn snp_domain(&self) -> &DomainRef {
        &self.snp_domain
    }

    /// The marker positions, as a domain over the base pair span of
    /// the markers.
    #[inline]
    pub fn base_pair_domain(&self) -> &DomainRef {
        &self.base_pair_domain
    }

    /// The base pair position of each SNP, by local index.
    #[inline]
    pub fn marker_positions(&self) -> &[usize] {
        &self.marker_positions
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.haplotypes.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.haplotypes.is_empty()
    }

    #[inline]
    pub fn get(&self, ix: usize) -> Option<&Haplotype> {
        self.haplotypes.get(ix)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Haplotype> {
        self.haplotypes.iter()
    }

    /// The alleles of every haplotype, in file order.
    pub fn markers(&self) -> Result<SetCollection> {
        let mut result = SetCollection::new(&self.snp_domain);
        for haplotype in self.haplotypes.iter() {
            result.push(haplotype.markers.clone())?;
        }
        Ok(result)
    }
}

/// Reads a haplotype file. The header and the marker lines are read by
/// `new`; the haplotypes are then read one per call to `next`.
pub struct HaplotypeReader<R> {
    lines: bstr::io::ByteLines<R>,
    line: usize,
    haplotype_domain: DomainRef,
    snp_domain: DomainRef,
    base_pair_domain: DomainRef,
    marker_positions: Vec<usize>,
    read: usize,
}

impl<R: BufRead> HaplotypeReader<R> {
    pub fn new(reader: R) -> Result<Self> {
        let mut lines = reader.byte_lines();
        let mut line = 0;

        let header = next_line(&mut lines, &mut line)?
            .ok_or_else(|| ArgError::malformed(line, "missing header"))?;
        let counts = parse_numbers(&header)
            .filter(|counts| counts.len() == 3)
            .ok_or_else(|| {
                ArgError::malformed(line, "expected \"<cases> <controls> <markers>\"")
            })?;
        let (haplotypes, markers) = (counts[0] + counts[1], counts[2]);
        let haplotype_domain = Domain::with_cardinality(haplotypes)
            .map_err(|e| ArgError::malformed(line, e.to_string()))?;
        let snp_domain = Domain::with_cardinality(markers)
            .map_err(|e| ArgError::malformed(line, e.to_string()))?;

        let mut marker_positions = Vec::with_capacity(markers);
        while marker_positions.len() < markers {
            let text = next_line(&mut lines, &mut line)?.ok_or_else(|| {
                ArgError::malformed(
                    line,
                    format!("expected {} marker positions", markers),
                )
            })?;
            let position = match parse_numbers(&text).as_deref() {
                Some(&[position]) => position,
                _ => return Err(ArgError::malformed(line, "expected a marker position")),
            };
            if marker_positions.last().map_or(false, |&last| last >= position) {
                return Err(ArgError::malformed(
                    line,
                    "marker positions are not increasing",
                ));
            }
            marker_positions.push(position);
        }

        let (first, last) = (marker_positions[0], marker_positions[markers - 1]);
        let space = Space::new(first, last)?;
        let base_pair_domain = Domain::from_positions(&space, marker_positions.iter().copied())?;

        debug!(
            "haplotype file with {} haplotypes over {} markers",
            haplotypes, markers
        );

        Ok(HaplotypeReader {
            lines,
            line,
            haplotype_domain,
            snp_domain,
            base_pair_domain,
            marker_positions,
            read: 0,
        })
    }

    #[inline]
    pub fn haplotype_domain(&self) -> &DomainRef {
        &self.haplotype_domain
    }

    #[inline]
    pub fn snp_domain(&self) -> &DomainRef {
        &self.snp_domain
    }

    #[inline]
    pub fn base_pair_domain(&self) -> &DomainRef {
        &self.base_pair_domain
    }

    #[inline]
    pub fn marker_positions(&self) -> &[usize] {
        &self.marker_positions
    }

    /// Reads the remaining haplotypes. Fails unless the file holds
    /// exactly as many as its header declares.
    pub fn read_haplotype_set(mut self) -> Result<HaplotypeSet> {
        let mut haplotypes = Vec::with_capacity(self.haplotype_domain.cardinality());
        while let Some(haplotype) = self.next() {
            haplotypes.push(haplotype?);
        }
        if haplotypes.len() != self.haplotype_domain.cardinality() {
            return Err(ArgError::malformed(
                self.line,
                format!(
                    "expected {} haplotypes, found {}",
                    self.haplotype_domain.cardinality(),
                    haplotypes.len()
                ),
            ));
        }
        Ok(HaplotypeSet {
            haplotype_domain: self.haplotype_domain,
            snp_domain: self.snp_domain,
            base_pair_domain: self.base_pair_domain,
            marker_positions: self.marker_positions,
            haplotypes,
        })
    }
}

impl<R: BufRead> Iterator for HaplotypeReader<R> {
    type Item = Result<Haplotype>;

    fn next(&mut self) -> Option<Self::Item> {
        let text = match next_line(&mut self.lines, &mut self.line) {
            Ok(Some(text)) => text,
            Ok(None) => return None,
            Err(err) => return Some(Err(err)),
        };
        if text.is_empty() {
            return None;
        }
        if self.read == self.haplotype_domain.cardinality() {
            return Some(Err(ArgError::malformed(
                self.line,
                "more haplotypes than declared",
            )));
        }
        self.read += 1;
        Some(
            Haplotype::decode(text.as_bytes(), &self.snp_domain).ok_or_else(|| {
                ArgError::malformed(
                    self.line,
                    format!(
                        "expected {} characters from {{0,1,M}}",
                        self.snp_domain.cardinality()
                    ),
                )
            }),
        )
    }
}

fn next_line<R: BufRead>(
    lines: &mut bstr::io::ByteLines<R>,
    line: &mut usize,
) -> Result<Option<String>> {
    match lines.next() {
        None => Ok(None),
        Some(bytes) => {
            let bytes = bytes?;
            *line += 1;
            let text = bytes
                .to_str()
                .map_err(|_| ArgError::malformed(*line, "line is not UTF-8"))?;
            Ok(Some(text.trim().to_string()))
        }
    }
}

fn parse_numbers(text: &str) -> Option<Vec<usize>> {
    text.split_whitespace().map(|n| n.parse().ok()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    const FILE: &str = "1 2 4
100
250
300
1200
0110
1M00
0001
";

    #[test]
    fn reads_a_haplotype_set() {
        let reader = HaplotypeReader::new(Cursor::new(FILE)).unwrap();
        assert_eq!(reader.marker_positions(), &[100, 250, 300, 1200]);
        assert_eq!(reader.base_pair_domain().cardinality(), 4);
        assert_eq!(reader.base_pair_domain().min(), Some(100));

        let set = reader.read_haplotype_set().unwrap();
        assert_eq!(set.len(), 3);
        assert_eq!(set.haplotype_domain().cardinality(), 3);

        let second = set.get(1).unwrap();
        assert_eq!(second.markers().iter().collect::<Vec<_>>(), vec![0]);
        assert_eq!(second.missing().iter().collect::<Vec<_>>(), vec![1]);
        assert_eq!(second.to_string(), "1M00");

        let markers = set.markers().unwrap();
        assert_eq!(markers[0].iter().collect::<Vec<_>>(), vec![1, 2]);
    }

    #[test]
    fn wrong_width_is_malformed() {
        let text = FILE.replacen("0001", "00011", 1);
        let reader = HaplotypeReader::new(Cursor::new(text)).unwrap();
        match reader.read_haplotype_set() {
            Err(ArgError::MalformedInput { line, .. }) => assert_eq!(line, 8),
            other => panic!("expected malformed input, got {:?}", other),
        }
    }

    #[test]
    fn wrong_count_is_malformed() {
        let text = FILE.replacen("1 2 4", "2 2 4", 1);
        let reader = HaplotypeReader::new(Cursor::new(text)).unwrap();
        assert!(matches!(
            reader.read_haplotype_set(),
            Err(ArgError::MalformedInput { .. })
        ));
    }

    #[test]
    fn bad_markers_are_malformed() {
        let text = FILE.replacen("250", "x", 1);
        assert!(HaplotypeReader::new(Cursor::new(text)).is_err());
        let text = FILE.replacen("300", "200", 1);
        assert!(HaplotypeReader::new(Cursor::new(text)).is_err());
    }
}
