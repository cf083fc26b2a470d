//! Various types shared by the driver.

use derive_more::Display;
use std::str::FromStr;

/// The vertex id type used by the input graph.
pub type NativeId = i64;

/// The vertex id type used by the external engine, always in `[0, N)`.
pub type DenseId = u64;

/// The algorithms the external engine provides.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Algorithm {
    #[display(fmt = "BFS")]
    Bfs,
    #[display(fmt = "SSSP")]
    Sssp,
    #[display(fmt = "PR")]
    PageRank,
    #[display(fmt = "CDLP")]
    Cdlp,
    #[display(fmt = "LCC")]
    Lcc,
    #[display(fmt = "WCC")]
    Wcc,
}

impl Algorithm {
    pub const ALL: [Algorithm; 6] = [
        Algorithm::Bfs,
        Algorithm::Sssp,
        Algorithm::PageRank,
        Algorithm::Cdlp,
        Algorithm::Lcc,
        Algorithm::Wcc,
    ];

    /// Name of the executable under the engine's binary directory.
    pub fn executable_name(self) -> &'static str {
        match self {
            Algorithm::Bfs => "bfs",
            Algorithm::Sssp => "sssp",
            Algorithm::PageRank => "pr",
            Algorithm::Cdlp => "cdlp",
            Algorithm::Lcc => "lcc",
            Algorithm::Wcc => "wcc",
        }
    }
}

impl FromStr for Algorithm {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Algorithm::ALL
            .iter()
            .copied()
            .find(|algorithm| algorithm.executable_name().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown algorithm: {}", s))
    }
}
