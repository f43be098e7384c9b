/*!
Options that change how genealogies are built, clipped, and compared.
*/

/// Options for [`Genealogy::clip_with`](crate::genealogy::Genealogy::clip_with)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClipOptions {
    /// Skip vertices with exactly one incoming and one outgoing edge
    /// active on the clip region, moving their mutations onto the
    /// surviving edge.
    pub collapse: bool,
}

impl Default for ClipOptions {
    fn default() -> Self {
        ClipOptions { collapse: true }
    }
}

/// Options for the [`GenealogyFactory`](crate::factory::GenealogyFactory)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BuildOptions {
    /// Collapse chains of single-child vertices while building, which
    /// produces multifurcating vertices instead of one vertex per
    /// event.
    pub multifurcate: bool,
    pub clip: ClipOptions,
}

impl BuildOptions {
    pub fn multifurcating() -> Self {
        BuildOptions {
            multifurcate: true,
            ..BuildOptions::default()
        }
    }
}

/// How two local trees are compared in
/// [`Statistics`](crate::statistics::Statistics)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DistanceMetric {
    /// The number of bipartitions the two trees share.
    SharedBipartitions,
    /// The Robinson-Foulds distance: the number of bipartitions found
    /// in only one of the two trees.
    SymmetricDifference,
}

impl Default for DistanceMetric {
    fn default() -> Self {
        DistanceMetric::SharedBipartitions
    }
}

impl std::str::FromStr for DistanceMetric {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "sbp" => Ok(DistanceMetric::SharedBipartitions),
            "bs" => Ok(DistanceMetric::SymmetricDifference),
            _ => Err(format!("unknown distance metric: {}", s)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let options = BuildOptions::default();
        assert!(!options.multifurcate);
        assert!(options.clip.collapse);
        assert!(BuildOptions::multifurcating().multifurcate);
        assert_eq!(
            "bs".parse::<DistanceMetric>().unwrap(),
            DistanceMetric::SymmetricDifference
        );
        assert!("rf".parse::<DistanceMetric>().is_err());
    }
}
