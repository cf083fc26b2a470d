//! The driver: uploads graphs, runs algorithms on them, and removes them again.

use crate::{
    config::{JobConfiguration, PlatformConfig},
    error::{Err, Result},
    graph::GraphDescriptor,
    job::{AlgorithmParameters, CommandLine, JobSpec},
    mapper::VertexIdMap,
    runner::{LogContext, ProcessRunner},
    transcode::{EdgeFormat, GraphTranscoder, TranscodeSummary},
    translate::ResultTranslator,
};
use log::{debug, info, warn};
use std::{
    collections::HashMap,
    fs,
    path::{Path, PathBuf},
    sync::Arc,
};
use tempfile::TempPath;

/// One algorithm execution requested by the benchmark.
#[derive(Debug, Clone)]
pub struct BenchmarkRun {
    pub graph: String,
    pub parameters: AlgorithmParameters,
    pub output_required: bool,
    /// Where translated results go. Defaults to `<output dir>/<graph>-<algorithm>`.
    pub output_path: Option<PathBuf>,
    /// Engine output is copied here in addition to the log.
    pub log_file: Option<PathBuf>,
}

impl BenchmarkRun {
    pub fn new(graph: &str, parameters: AlgorithmParameters) -> Self {
        Self {
            graph: String::from(graph),
            parameters,
            output_required: false,
            output_path: None,
            log_file: None,
        }
    }

    pub fn output<P: Into<PathBuf>>(mut self, path: Option<P>) -> Self {
        self.output_required = true;
        self.output_path = path.map(Into::into);
        self
    }

    pub fn log_file<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.log_file = Some(path.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobState {
    Created,
    CommandBuilt,
    Running,
    Succeeded,
    Failed(i32),
    LaunchError(String),
    TimedOut,
    TranslationFailed,
    OutputTranslated,
    Cleaned,
}

impl JobState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobState::Succeeded
                | JobState::Cleaned
                | JobState::Failed(_)
                | JobState::LaunchError(_)
                | JobState::TimedOut
                | JobState::TranslationFailed
        )
    }
}

/// A single engine run. There is no retry: a failed job is dropped and a
/// new one has to be created.
pub struct Job<'a> {
    label: String,
    spec: JobSpec,
    map: &'a VertexIdMap,
    state: JobState,
    command: Option<CommandLine>,
    raw_output: Option<TempPath>,
    output: Option<PathBuf>,
}

impl<'a> Job<'a> {
    /// Creates a job reading the transcoded graph in `graph_dir`. If `output`
    /// is given, the raw engine result is kept in a scratch file inside
    /// `graph_dir` until it has been translated.
    pub fn new(
        label: &str,
        parameters: &AlgorithmParameters,
        map: &'a VertexIdMap,
        graph_dir: &Path,
        output: Option<PathBuf>,
    ) -> Result<Self> {
        let mut spec = JobSpec::translate(parameters, map, graph_dir)?;
        let raw_output = match output {
            Some(_) => {
                let raw = tempfile::Builder::new()
                    .prefix(&format!("{}-", spec.algorithm().executable_name()))
                    .suffix(".out")
                    .tempfile_in(graph_dir)?
                    .into_temp_path();
                spec = spec.output(raw.to_path_buf());
                Some(raw)
            }
            None => None,
        };
        Ok(Self {
            label: String::from(label),
            spec,
            map,
            state: JobState::Created,
            command: None,
            raw_output,
            output,
        })
    }

    pub fn state(&self) -> &JobState {
        &self.state
    }

    pub fn spec(&self) -> &JobSpec {
        &self.spec
    }

    fn transition(&mut self, next: JobState) {
        debug!("job {}: {:?} -> {:?}", self.label, self.state, next);
        self.state = next;
    }

    pub fn build_command(&mut self, config: &JobConfiguration) -> &CommandLine {
        let command = self.spec.command_line(config);
        self.transition(JobState::CommandBuilt);
        self.command.insert(command)
    }

    /// Runs the job to a terminal state, which [`Job::state`] still reports
    /// after an error. The scratch result file is removed on every path out
    /// of this function.
    pub fn run(
        &mut self,
        config: &JobConfiguration,
        context: &LogContext,
    ) -> Result<JobState> {
        let raw_output = self.raw_output.take();
        let command = match self.command.take() {
            Some(command) => command,
            None => self.build_command(config).clone(),
        };
        self.transition(JobState::Running);
        let outcome = ProcessRunner::new()
            .timeout(config.timeout)
            .run(&command, context);
        let outcome = match outcome {
            Ok(outcome) => outcome,
            Err(e) => {
                self.transition(match &e {
                    Err::ProcessTimedOut { .. } => JobState::TimedOut,
                    e => JobState::LaunchError(e.to_string()),
                });
                return Err(e);
            }
        };
        if let Err(e) = outcome.check(&command) {
            self.transition(JobState::Failed(outcome.exit_code));
            return Err(e);
        }
        self.transition(JobState::Succeeded);
        if let (Some(raw), Some(output)) = (raw_output, self.output.take()) {
            if let Err(e) = ResultTranslator::new(self.map).translate(&raw, &output) {
                self.transition(JobState::TranslationFailed);
                return Err(e);
            }
            self.transition(JobState::OutputTranslated);
            if let Err(e) = raw.close() {
                warn!("failed to delete intermediate file: {}", e);
            }
            self.transition(JobState::Cleaned);
        }
        Ok(self.state.clone())
    }
}

struct LoadedGraph {
    dir: PathBuf,
    map: Arc<VertexIdMap>,
}

pub struct Platform {
    config: PlatformConfig,
    format: EdgeFormat,
    graphs: HashMap<String, LoadedGraph>,
}

impl Platform {
    /// Fails before any job runs if the configured directories are unusable.
    pub fn new(config: PlatformConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            format: EdgeFormat::default(),
            graphs: HashMap::new(),
        })
    }

    pub fn format(mut self, format: EdgeFormat) -> Self {
        self.format = format;
        self
    }

    pub fn config(&self) -> &PlatformConfig {
        &self.config
    }

    pub fn graph_dir(&self, name: &str) -> PathBuf {
        self.config.intermediate_dir.join(name)
    }

    pub fn id_map(&self, name: &str) -> Option<Arc<VertexIdMap>> {
        self.graphs.get(name).map(|graph| Arc::clone(&graph.map))
    }

    /// Transcodes `graph` into its own intermediate directory and keeps the id map.
    pub fn upload_graph(&mut self, graph: &GraphDescriptor) -> Result<TranscodeSummary> {
        info!("preprocessing graph \"{}\"", graph.name);
        graph.check_supported()?;
        let dir = self.graph_dir(&graph.name);
        if dir.is_dir() {
            fs::remove_dir_all(&dir)?;
        }
        match GraphTranscoder::new(graph).format(self.format).transcode(&dir) {
            Ok((map, summary)) => {
                self.graphs.insert(
                    graph.name.clone(),
                    LoadedGraph {
                        dir,
                        map: Arc::new(map),
                    },
                );
                Ok(summary)
            }
            Err(e) => {
                remove_dir(&dir);
                Err(e)
            }
        }
    }

    pub fn default_output_path(&self, run: &BenchmarkRun) -> PathBuf {
        self.config
            .output_dir
            .join(format!("{}-{}", run.graph, run.parameters.algorithm()))
    }

    pub fn execute(&self, run: &BenchmarkRun) -> Result<JobState> {
        let graph = self.graphs.get(&run.graph).ok_or_else(|| {
            Err::ConfigurationError(format!("graph \"{}\" has not been uploaded", run.graph))
        })?;
        let algorithm = run.parameters.algorithm();
        let label = format!("{}/{}", run.graph, algorithm);
        let output = if run.output_required {
            Some(
                run.output_path
                    .clone()
                    .unwrap_or_else(|| self.default_output_path(run)),
            )
        } else {
            None
        };
        let context = match &run.log_file {
            Some(path) => LogContext::new(&label).with_file(path)?,
            None => LogContext::new(&label),
        };
        info!(
            "executing algorithm \"{}\" on graph \"{}\"",
            algorithm, run.graph
        );
        let mut job = Job::new(&label, &run.parameters, &graph.map, &graph.dir, output)?;
        match job.run(&self.config.job, &context) {
            Ok(state) => Ok(state),
            Err(e) => {
                warn!("job {} failed: {}", label, e);
                Err(e)
            }
        }
    }

    pub fn delete_graph(&mut self, name: &str) {
        match self.graphs.remove(name) {
            Some(graph) => remove_dir(&graph.dir),
            None => warn!("graph \"{}\" is not loaded", name),
        }
    }
}

fn remove_dir(dir: &Path) {
    if let Err(e) = fs::remove_dir_all(dir) {
        warn!(
            "failed to delete intermediate directory {}: {}",
            dir.display(),
            e
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{mapper::VertexIdMapper, types::Algorithm};
    use tempfile::TempDir;

    fn map() -> VertexIdMap {
        let mut mapper = VertexIdMapper::new();
        mapper.assign(10).unwrap();
        mapper.assign(20).unwrap();
        mapper.finish()
    }

    #[test]
    fn test_job_without_output() {
        let dir = TempDir::new().unwrap();
        let map = map();
        let mut job = Job::new(
            "g/BFS",
            &AlgorithmParameters::Bfs { source: 20 },
            &map,
            dir.path(),
            None,
        )
        .unwrap();
        assert_eq!(job.state(), &JobState::Created);
        assert_eq!(job.spec().algorithm(), Algorithm::Bfs);
        let command = job.build_command(&JobConfiguration::new("bin")).clone();
        assert_eq!(job.state(), &JobState::CommandBuilt);
        let dataset = dir.path().to_string_lossy().into_owned();
        assert_eq!(
            command.args,
            ["--dataset", &dataset, "--threadnum", "1", "--source", "1"]
        );
    }

    #[test]
    fn test_job_scratch_file_removed_on_launch_error() {
        let dir = TempDir::new().unwrap();
        let map = map();
        let mut job = Job::new(
            "g/WCC",
            &AlgorithmParameters::Wcc,
            &map,
            dir.path(),
            Some(dir.path().join("result")),
        )
        .unwrap();
        let raw = job.spec().output.clone().unwrap();
        assert!(raw.starts_with(dir.path()));
        assert!(raw.exists());
        let result = job.run(
            &JobConfiguration::new(dir.path().join("missing")),
            &LogContext::new("g/WCC"),
        );
        assert!(matches!(result, Err(Err::ProcessLaunchError { .. })));
        assert!(matches!(job.state(), JobState::LaunchError(_)));
        assert!(!raw.exists());
        assert!(!dir.path().join("result").exists());
    }

    #[cfg(unix)]
    #[test]
    fn test_job_translation_failure() {
        let dir = TempDir::new().unwrap();
        let bin = dir.path().join("bin");
        fs::create_dir(&bin).unwrap();
        std::os::unix::fs::symlink("/bin/true", bin.join("lcc")).unwrap();
        let map = map();
        let mut job = Job::new(
            "g/LCC",
            &AlgorithmParameters::Lcc,
            &map,
            dir.path(),
            Some(dir.path().join("result")),
        )
        .unwrap();
        let raw = job.spec().output.clone().unwrap();
        fs::write(&raw, "0 0.5\n5 0.5\n").unwrap();
        let result = job.run(&JobConfiguration::new(&bin), &LogContext::new("g/LCC"));
        assert!(matches!(result, Err(Err::OutputTranslationError { .. })));
        assert_eq!(job.state(), &JobState::TranslationFailed);
        assert!(job.state().is_terminal());
        assert!(!raw.exists());
        assert!(!dir.path().join("result").exists());
    }

    #[test]
    fn test_terminal_states() {
        assert!(JobState::Failed(3).is_terminal());
        assert!(JobState::Cleaned.is_terminal());
        assert!(!JobState::Running.is_terminal());
        assert!(!JobState::OutputTranslated.is_terminal());
    }

    #[test]
    fn test_execute_unknown_graph() {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join("bin")).unwrap();
        let platform = Platform::new(PlatformConfig::new(
            dir.path(),
            dir.path().join("intermediate"),
            dir.path().join("output"),
        ))
        .unwrap();
        assert!(matches!(
            platform.execute(&BenchmarkRun::new("missing", AlgorithmParameters::Lcc)),
            Err(Err::ConfigurationError(_))
        ));
    }
}
