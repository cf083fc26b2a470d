//! Algorithm selection and the engine command line built from it.

use crate::{
    config::JobConfiguration,
    error::{Err, Result},
    mapper::VertexIdMap,
    types::{Algorithm, DenseId, NativeId},
};
use itertools::Itertools;
use std::{
    fmt,
    path::{Path, PathBuf},
};

/// Algorithm parameters as supplied by the benchmark, in native ids.
#[derive(Debug, Clone, PartialEq)]
pub enum AlgorithmParameters {
    Bfs { source: NativeId },
    Sssp { source: NativeId },
    PageRank { damping: f32, iterations: u64 },
    Cdlp { iterations: u64 },
    Lcc,
    Wcc,
}

impl AlgorithmParameters {
    pub fn algorithm(&self) -> Algorithm {
        match self {
            AlgorithmParameters::Bfs { .. } => Algorithm::Bfs,
            AlgorithmParameters::Sssp { .. } => Algorithm::Sssp,
            AlgorithmParameters::PageRank { .. } => Algorithm::PageRank,
            AlgorithmParameters::Cdlp { .. } => Algorithm::Cdlp,
            AlgorithmParameters::Lcc => Algorithm::Lcc,
            AlgorithmParameters::Wcc => Algorithm::Wcc,
        }
    }
}

/// Algorithm parameters in the engine's id space.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineParameters {
    Bfs { source: DenseId },
    Sssp { source: DenseId },
    PageRank { damping: f32, iterations: u64 },
    Cdlp { iterations: u64 },
    Lcc,
    Wcc,
}

impl EngineParameters {
    pub fn algorithm(&self) -> Algorithm {
        match self {
            EngineParameters::Bfs { .. } => Algorithm::Bfs,
            EngineParameters::Sssp { .. } => Algorithm::Sssp,
            EngineParameters::PageRank { .. } => Algorithm::PageRank,
            EngineParameters::Cdlp { .. } => Algorithm::Cdlp,
            EngineParameters::Lcc => Algorithm::Lcc,
            EngineParameters::Wcc => Algorithm::Wcc,
        }
    }

    fn append_args(&self, args: &mut Vec<String>) {
        match self {
            EngineParameters::Bfs { source } | EngineParameters::Sssp { source } => {
                args.push(String::from("--source"));
                args.push(source.to_string());
            }
            EngineParameters::PageRank {
                damping,
                iterations,
            } => {
                args.push(String::from("--damping"));
                args.push(damping.to_string());
                args.push(String::from("--iteration"));
                args.push(iterations.to_string());
            }
            EngineParameters::Cdlp { iterations } => {
                args.push(String::from("--iteration"));
                args.push(iterations.to_string());
            }
            EngineParameters::Lcc | EngineParameters::Wcc => (),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct JobSpec {
    pub parameters: EngineParameters,
    pub input: PathBuf,
    pub output: Option<PathBuf>,
}

impl JobSpec {
    pub fn new<P: Into<PathBuf>>(parameters: EngineParameters, input: P) -> Self {
        Self {
            parameters,
            input: input.into(),
            output: None,
        }
    }

    /// Translates source vertices through `map` before building the job.
    pub fn translate<P: Into<PathBuf>>(
        parameters: &AlgorithmParameters,
        map: &VertexIdMap,
        input: P,
    ) -> Result<Self> {
        let source = |id: NativeId| {
            map.forward(id)
                .map_err(|_| Err::parse("source vertex is not in the graph", id.to_string()))
        };
        let parameters = match *parameters {
            AlgorithmParameters::Bfs { source: id } => EngineParameters::Bfs {
                source: source(id)?,
            },
            AlgorithmParameters::Sssp { source: id } => EngineParameters::Sssp {
                source: source(id)?,
            },
            AlgorithmParameters::PageRank {
                damping,
                iterations,
            } => EngineParameters::PageRank {
                damping,
                iterations,
            },
            AlgorithmParameters::Cdlp { iterations } => EngineParameters::Cdlp { iterations },
            AlgorithmParameters::Lcc => EngineParameters::Lcc,
            AlgorithmParameters::Wcc => EngineParameters::Wcc,
        };
        Ok(Self::new(parameters, input))
    }

    pub fn output<P: Into<PathBuf>>(mut self, output: P) -> Self {
        self.output = Some(output.into());
        self
    }

    pub fn algorithm(&self) -> Algorithm {
        self.parameters.algorithm()
    }

    /// Builds the engine invocation. Equal inputs always give equal command lines.
    pub fn command_line(&self, config: &JobConfiguration) -> CommandLine {
        let mut args = vec![
            String::from("--dataset"),
            path_arg(&self.input),
            String::from("--threadnum"),
            config.threads().to_string(),
        ];
        self.parameters.append_args(&mut args);
        if let Some(output) = &self.output {
            args.push(String::from("--output"));
            args.push(path_arg(output));
        }
        CommandLine {
            program: config.binary_dir.join(self.algorithm().executable_name()),
            args,
        }
    }
}

fn path_arg(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

/// A program and its arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandLine {
    pub program: PathBuf,
    pub args: Vec<String>,
}

impl CommandLine {
    pub fn new<P: Into<PathBuf>>(program: P) -> Self {
        Self {
            program: program.into(),
            args: vec![],
        }
    }

    pub fn arg<S: Into<String>>(mut self, arg: S) -> Self {
        self.args.push(arg.into());
        self
    }
}

impl fmt::Display for CommandLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program.display())?;
        if !self.args.is_empty() {
            write!(f, " {}", self.args.iter().join(" "))?;
        }
        Ok(())
    }
}
