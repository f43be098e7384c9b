/*!
Streaming reader of ARG event logs.

An event log starts with a `%ARGINFERENCE` line, one header line per
genealogy giving the haplotype and SNP counts, and a `%ARGS` line.
Then each genealogy is a block that starts with `ARG <index>` and
lists its events, one per line:

```text
<time> co <child> <child> <parent>
<time> mu <target> <source> <marker>
<time> re <child> <left> <right> <breakpoint>
```

An empty line or the end of the input ends the log. Only the first
header line defines the domains; every genealogy in the log shares
them.

[`GenealogyReader::read_next`] builds one genealogy per call, so
nothing past the current block is ever read.
*/

use std::io::BufRead;

use bstr::io::{BufReadExt, ByteLines};
use bstr::ByteSlice;

#[allow(unused_imports)]
use log::{debug, error, info, trace};

use crate::error::{ArgError, Result};
use crate::factory::GenealogyFactory;
use crate::genealogy::Genealogy;
use crate::options::BuildOptions;
use crate::set::{Domain, DomainRef, FiniteSet, NaturalSet};

mod grammar;

use self::grammar::Instruction;

/// Where the reader is in the event log.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadState {
    Start,
    ArgInferenceHeader,
    /// Past the headers, looking for the next `ARG` line.
    Args,
    /// An accepted `ARG` line has been read; its events are next.
    Waiting,
    Building,
    Eof,
}

pub struct GenealogyReader<R> {
    lines: ByteLines<R>,
    line: usize,
    state: ReadState,
    factory: GenealogyFactory,
    arg_domain: DomainRef,
    arg_filter: NaturalSet,
    index: Option<usize>,
    next_index: Option<usize>,
}

struct Headers {
    snp_domain: DomainRef,
    haplotype_domain: DomainRef,
    arg_count: usize,
}

impl<R: BufRead> GenealogyReader<R> {
    /// Reads the headers of the log.
    pub fn new(reader: R) -> Result<Self> {
        Self::with_options(reader, BuildOptions::default())
    }

    pub fn with_options(reader: R, options: BuildOptions) -> Result<Self> {
        let mut lines = reader.byte_lines();
        let mut line = 0;
        let headers = read_headers(&mut lines, &mut line)?;
        let arg_domain = Domain::with_cardinality(headers.arg_count)?;

        debug!(
            "event log with {} genealogies over {} haplotypes and {} SNPs",
            headers.arg_count,
            headers.haplotype_domain.cardinality(),
            headers.snp_domain.cardinality()
        );

        Ok(GenealogyReader {
            lines,
            line,
            state: ReadState::Args,
            factory: GenealogyFactory::new(
                &headers.snp_domain,
                &headers.haplotype_domain,
                options,
            ),
            arg_filter: NaturalSet::complete(&arg_domain),
            arg_domain,
            index: None,
            next_index: None,
        })
    }

    #[inline]
    pub fn state(&self) -> ReadState {
        self.state
    }

    /// The index of the genealogy returned last.
    #[inline]
    pub fn index(&self) -> Option<usize> {
        self.index
    }

    /// One position per genealogy declared in the headers.
    #[inline]
    pub fn arg_domain(&self) -> &DomainRef {
        &self.arg_domain
    }

    #[inline]
    pub fn snp_domain(&self) -> &DomainRef {
        self.factory.snp_domain()
    }

    #[inline]
    pub fn haplotype_domain(&self) -> &DomainRef {
        self.factory.haplotype_domain()
    }

    /// Skips every genealogy whose index is not in `region`.
    pub fn filter_arg(&mut self, region: &NaturalSet) -> Result<()> {
        self.arg_filter = Domain::project(&self.arg_domain, region)?;
        Ok(())
    }

    /// Clips every genealogy to the SNPs of `region`.
    pub fn filter_snp(&mut self, region: &NaturalSet) -> Result<()> {
        self.factory.filter_snp(region)
    }

    /// Builds the next accepted genealogy, or returns `None` at the end
    /// of the log. After an error in the events of one genealogy, the
    /// next call continues with the genealogy after it.
    pub fn read_next(&mut self) -> Result<Option<Genealogy>> {
        while self.state == ReadState::Args {
            match self.next_line()? {
                None => self.state = ReadState::Eof,
                Some(text) => self.between_args(&text)?,
            }
        }
        if self.state != ReadState::Waiting {
            return Ok(None);
        }

        self.index = self.next_index;
        self.factory.start();
        self.state = ReadState::Building;

        while self.state == ReadState::Building {
            let result = match self.next_line() {
                Ok(None) => {
                    self.state = ReadState::Eof;
                    Ok(())
                }
                Ok(Some(text)) => self.apply(&text),
                Err(err) => Err(err),
            };
            if let Err(err) = result {
                if self.state == ReadState::Building {
                    self.state = ReadState::Args;
                }
                error!("discarding ARG {:?}: {}", self.index, err);
                return Err(err);
            }
        }

        let genealogy = self.factory.finish().map_err(|e| e.at_line(self.line))?;
        debug!("read ARG {:?} up to line {}: {}", self.index, self.line, genealogy);
        Ok(Some(genealogy))
    }

    fn next_line(&mut self) -> Result<Option<String>> {
        match self.lines.next() {
            None => Ok(None),
            Some(Err(err)) => {
                self.state = ReadState::Eof;
                Err(err.into())
            }
            Some(Ok(bytes)) => {
                self.line += 1;
                let text = bytes
                    .to_str()
                    .map_err(|_| ArgError::malformed(self.line, "line is not UTF-8"))?;
                Ok(Some(text.trim().to_string()))
            }
        }
    }

    fn between_args(&mut self, text: &str) -> Result<()> {
        if text.is_empty() {
            self.state = ReadState::Eof;
            return Ok(());
        }
        match grammar::parse(text) {
            Some(Instruction::NextArg(index)) => self.seek(index),
            _ => {
                trace!("skipping line {} outside of an ARG block", self.line);
                Ok(())
            }
        }
    }

    fn apply(&mut self, text: &str) -> Result<()> {
        if text.is_empty() {
            self.state = ReadState::Eof;
            return Ok(());
        }
        let result = match grammar::parse(text) {
            Some(Instruction::Coalescence { one, two, parent }) => {
                self.factory.coalesce(one, two, parent)
            }
            Some(Instruction::Mutation {
                target,
                source,
                marker,
            }) => self.factory.mutate(target, source, marker),
            Some(Instruction::Recombination {
                child,
                left,
                right,
                breakpoint,
            }) => self.factory.recombine(child, left, right, breakpoint),
            Some(Instruction::NextArg(index)) => return self.seek(index),
            _ => Err(ArgError::malformed(
                0,
                format!("\"{}\" is not an event", text),
            )),
        };
        result.map_err(|e| e.at_line(self.line))
    }

    /// Moves to the first accepted genealogy at or after `index`,
    /// skipping the blocks of the others.
    fn seek(&mut self, mut index: usize) -> Result<()> {
        loop {
            match self.arg_filter.max() {
                Some(max) if index <= max => {}
                _ => {
                    self.state = ReadState::Eof;
                    return Ok(());
                }
            }
            if self.arg_filter.contains(index) {
                self.next_index = Some(index);
                self.state = ReadState::Waiting;
                return Ok(());
            }
            trace!("skipping ARG {}", index);
            index = loop {
                match self.next_line()? {
                    None => {
                        self.state = ReadState::Eof;
                        return Ok(());
                    }
                    Some(text) => {
                        if let Some(Instruction::NextArg(next)) = grammar::parse(&text) {
                            break next;
                        }
                    }
                }
            };
        }
    }
}

fn read_headers<R: BufRead>(lines: &mut ByteLines<R>, line: &mut usize) -> Result<Headers> {
    let mut state = ReadState::Start;
    let mut domains = None;
    let mut count = 0;

    for bytes in lines {
        let bytes = bytes?;
        *line += 1;
        let text = match bytes.to_str() {
            Ok(text) => text.trim(),
            Err(_) => return Err(ArgError::malformed(*line, "line is not UTF-8")),
        };

        match (state, grammar::parse(text)) {
            (ReadState::Start, Some(Instruction::ArgInference)) => {
                state = ReadState::ArgInferenceHeader;
            }
            (ReadState::ArgInferenceHeader, Some(Instruction::Header { haplotypes, snps })) => {
                if domains.is_none() {
                    let snp_domain = Domain::with_cardinality(snps)
                        .map_err(|e| ArgError::malformed(*line, e.to_string()))?;
                    let haplotype_domain = Domain::with_cardinality(haplotypes)
                        .map_err(|e| ArgError::malformed(*line, e.to_string()))?;
                    domains = Some((snp_domain, haplotype_domain));
                }
                count += 1;
            }
            (ReadState::ArgInferenceHeader, Some(Instruction::Args)) => {
                return match domains {
                    Some((snp_domain, haplotype_domain)) => Ok(Headers {
                        snp_domain,
                        haplotype_domain,
                        arg_count: count,
                    }),
                    None => Err(ArgError::malformed(*line, "no genealogy header before %ARGS")),
                };
            }
            _ => {}
        }
    }

    Err(ArgError::malformed(*line, "missing %ARGS line"))
}

impl<R: BufRead> Iterator for GenealogyReader<R> {
    type Item = Result<Genealogy>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.read_next() {
            Ok(Some(genealogy)) => Some(Ok(genealogy)),
            Ok(None) => None,
            Err(err) => Some(Err(err)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    const TWO_TREES: &str = "%ARGINFERENCE
4 6 NA NA NA NA NA NA
4 6 NA NA NA NA NA NA
%ARGS
ARG 0
1 co 0 1 4
2 co 2 3 5
3 co 4 5 6
ARG 1
1 co 0 2 4
2 mu 4 7 3
3 co 7 1 8
4 co 8 3 9
";

    #[test]
    fn reads_headers() {
        let reader = GenealogyReader::new(Cursor::new(TWO_TREES)).unwrap();
        assert_eq!(reader.state(), ReadState::Args);
        assert_eq!(reader.arg_domain().cardinality(), 2);
        assert_eq!(reader.snp_domain().cardinality(), 6);
        assert_eq!(reader.haplotype_domain().cardinality(), 4);
        assert_eq!(reader.index(), None);
    }

    #[test]
    fn reads_every_genealogy() {
        let mut reader = GenealogyReader::new(Cursor::new(TWO_TREES)).unwrap();

        let first = reader.read_next().unwrap().unwrap();
        assert_eq!(reader.index(), Some(0));
        assert_eq!(first.label(first.gmrca().unwrap()), 6);
        assert!(first.is_tree());

        let second = reader.read_next().unwrap().unwrap();
        assert_eq!(reader.index(), Some(1));
        assert_eq!(second.label(second.gmrca().unwrap()), 9);
        assert_eq!(reader.state(), ReadState::Eof);

        assert!(reader.read_next().unwrap().is_none());
    }

    #[test]
    fn arg_filter_skips_blocks() {
        let mut reader = GenealogyReader::new(Cursor::new(TWO_TREES)).unwrap();
        let args = reader.arg_domain().clone();
        reader
            .filter_arg(&NaturalSet::singleton(&args, 1).unwrap())
            .unwrap();

        let graphs = reader.collect::<Result<Vec<_>>>().unwrap();
        assert_eq!(graphs.len(), 1);
        assert_eq!(graphs[0].label(graphs[0].gmrca().unwrap()), 9);
    }

    #[test]
    fn empty_line_ends_the_log() {
        let text = TWO_TREES.replacen("ARG 1", "\nARG 1", 1);
        let reader = GenealogyReader::new(Cursor::new(text)).unwrap();
        assert_eq!(reader.count(), 1);
    }

    #[test]
    fn bad_lines_are_malformed() {
        let text = TWO_TREES.replacen("2 co 2 3 5", "2 co 2 3", 1);
        let mut reader = GenealogyReader::new(Cursor::new(text)).unwrap();
        match reader.read_next() {
            Err(ArgError::MalformedInput { line, .. }) => assert_eq!(line, 7),
            other => panic!("expected malformed input, got {:?}", other.map(|_| ())),
        }
        // the next genealogy is still read
        let second = reader.read_next().unwrap().unwrap();
        assert_eq!(reader.index(), Some(1));
        assert_eq!(second.vertex_count(), 7);
    }

    #[test]
    fn missing_headers() {
        let text = "%ARGINFERENCE\n%ARGS\nARG 0\n";
        assert!(GenealogyReader::new(Cursor::new(text)).is_err());
        assert!(GenealogyReader::new(Cursor::new("")).is_err());
    }
}
