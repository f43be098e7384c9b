/*!
Line grammar of the ARG event log.
*/

use once_cell::sync::Lazy;
use regex::Regex;

static ARG_INFERENCE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^%ARGINFERENCE$").expect("Failed to compile inference pattern")
});

static HEADER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^([0-9]+)\s+([0-9]+)(?:\s+(?:[0-9.eE+-]+|NA))*$")
        .expect("Failed to compile header pattern")
});

static ARGS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^%ARGS").expect("Failed to compile ARGS pattern"));

static NEXT_ARG: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^ARG\s+([0-9]+)$").expect("Failed to compile ARG pattern")
});

static COALESCENCE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[0-9]+\s+co\s+([0-9]+)\s+([0-9]+)\s+([0-9]+)$")
        .expect("Failed to compile coalescence pattern")
});

static MUTATION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[0-9]+\s+(?:mu|er)\s+([0-9]+)\s+([0-9]+)\s+([0-9]+)$")
        .expect("Failed to compile mutation pattern")
});

static RECOMBINATION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[0-9]+\s+re\s+([0-9]+)\s+([0-9]+)\s+([0-9]+)\s+([0-9]+)$")
        .expect("Failed to compile recombination pattern")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Instruction {
    ArgInference,
    Header { haplotypes: usize, snps: usize },
    Args,
    NextArg(usize),
    Coalescence { one: usize, two: usize, parent: usize },
    Mutation { target: usize, source: usize, marker: usize },
    Recombination {
        child: usize,
        left: usize,
        right: usize,
        breakpoint: usize,
    },
}

fn numbers<const N: usize>(pattern: &Regex, line: &str) -> Option<[usize; N]> {
    let caps = pattern.captures(line)?;
    let mut values = [0; N];
    for (ix, value) in values.iter_mut().enumerate() {
        *value = caps.get(ix + 1)?.as_str().parse().ok()?;
    }
    Some(values)
}

/// Matches one trimmed line, `None` if it matches no instruction or
/// a number does not fit.
pub(crate) fn parse(line: &str) -> Option<Instruction> {
    use Instruction::*;

    if let Some([one, two, parent]) = numbers::<3>(&COALESCENCE, line) {
        Some(Coalescence { one, two, parent })
    } else if let Some([target, source, marker]) = numbers::<3>(&MUTATION, line) {
        Some(Mutation {
            target,
            source,
            marker,
        })
    } else if let Some([child, left, right, breakpoint]) = numbers::<4>(&RECOMBINATION, line)
    {
        Some(Recombination {
            child,
            left,
            right,
            breakpoint,
        })
    } else if let Some([index]) = numbers::<1>(&NEXT_ARG, line) {
        Some(NextArg(index))
    } else if let Some([haplotypes, snps]) = numbers::<2>(&HEADER, line) {
        Some(Header { haplotypes, snps })
    } else if ARG_INFERENCE.is_match(line) {
        Some(ArgInference)
    } else if ARGS.is_match(line) {
        Some(Args)
    } else {
        None
    }
}
