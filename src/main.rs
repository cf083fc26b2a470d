use clap::{
    crate_authors, crate_description, crate_name, crate_version, App, AppSettings, Arg,
    ArgMatches, SubCommand,
};
use derive_more::Display;
use openg_driver::{
    config::{JobConfiguration, PlatformConfig},
    graph::{GraphDescriptor, Property, PropertyType},
    job::AlgorithmParameters,
    mapper::VertexIdMap,
    platform::{BenchmarkRun, Platform},
    transcode::{EdgeFormat, GraphTranscoder},
    translate::ResultTranslator,
    types::Algorithm,
};
use std::{error::Error, str::FromStr, time::Duration};

#[derive(Debug, Display, PartialEq)]
enum Err {
    InvalidArgument(String),
}

impl std::error::Error for Err {}

fn parse_value<T>(matches: &ArgMatches, name: &str) -> Result<Option<T>, Box<dyn Error>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match matches.value_of(name) {
        Some(value) => value.parse().map(Some).map_err(|e: T::Err| {
            Box::new(Err::InvalidArgument(format!(
                "invalid value {:?} for --{}: {}",
                value, name, e
            ))) as Box<dyn Error>
        }),
        None => Ok(None),
    }
}

fn require_value<T>(
    matches: &ArgMatches,
    name: &str,
    algorithm: Algorithm,
) -> Result<T, Box<dyn Error>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    parse_value(matches, name)?.ok_or_else(|| {
        Box::new(Err::InvalidArgument(format!(
            "--{} is required for {}",
            name, algorithm
        ))) as Box<dyn Error>
    })
}

fn parse_parameters(matches: &ArgMatches) -> Result<AlgorithmParameters, Box<dyn Error>> {
    let algorithm: Algorithm = matches
        .value_of("ALGORITHM")
        .unwrap()
        .parse()
        .map_err(Err::InvalidArgument)?;
    Ok(match algorithm {
        Algorithm::Bfs => AlgorithmParameters::Bfs {
            source: require_value(matches, "source", algorithm)?,
        },
        Algorithm::Sssp => AlgorithmParameters::Sssp {
            source: require_value(matches, "source", algorithm)?,
        },
        Algorithm::PageRank => AlgorithmParameters::PageRank {
            damping: require_value(matches, "damping", algorithm)?,
            iterations: require_value(matches, "iterations", algorithm)?,
        },
        Algorithm::Cdlp => AlgorithmParameters::Cdlp {
            iterations: require_value(matches, "iterations", algorithm)?,
        },
        Algorithm::Lcc => AlgorithmParameters::Lcc,
        Algorithm::Wcc => AlgorithmParameters::Wcc,
    })
}

fn parse_graph(matches: &ArgMatches) -> Result<GraphDescriptor, Box<dyn Error>> {
    let mut graph = GraphDescriptor::new(
        matches.value_of("graph-name").unwrap(),
        matches.value_of("VERTICES").unwrap(),
        matches.value_of("EDGES").unwrap(),
        !matches.is_present("undirected"),
    );
    if let Some(num_vertices) = parse_value(matches, "num-vertices")? {
        graph = graph.num_vertices(num_vertices);
    }
    if matches.is_present("weighted") {
        graph = graph.edge_property(Property::new("weight", PropertyType::Real));
    }
    Ok(graph)
}

fn parse_edge_format(matches: &ArgMatches) -> EdgeFormat {
    match matches.value_of("edge-format").unwrap() {
        "space" => EdgeFormat::Space,
        "pipe" => EdgeFormat::Pipe,
        _ => unreachable!(),
    }
}

fn parse_config(matches: &ArgMatches) -> Result<PlatformConfig, Box<dyn Error>> {
    let config = PlatformConfig::new(
        matches.value_of("home").unwrap(),
        matches.value_of("intermediate-dir").unwrap(),
        matches.value_of("output-dir").unwrap(),
    );
    let mut job = JobConfiguration::new(config.home.join("bin"));
    if let Some(threads) = parse_value(matches, "threads")? {
        job = job.num_worker_threads(threads);
    }
    if let Some(secs) = parse_value(matches, "timeout-secs")? {
        job = job.timeout(Duration::from_secs(secs));
    }
    Ok(config.job(job))
}

fn handle_transcode(matches: &ArgMatches) -> Result<(), Box<dyn Error>> {
    let graph = parse_graph(matches)?;
    let (_, summary) = GraphTranscoder::new(&graph)
        .format(parse_edge_format(matches))
        .transcode(matches.value_of("OUTDIR").unwrap())?;
    println!(
        "{} {} {}",
        summary.num_vertices, summary.num_edges, summary.num_edge_rows
    );
    Ok(())
}

fn handle_run(matches: &ArgMatches) -> Result<(), Box<dyn Error>> {
    let graph = parse_graph(matches)?;
    let parameters = parse_parameters(matches)?;
    let mut platform = Platform::new(parse_config(matches)?)?.format(parse_edge_format(matches));
    platform.upload_graph(&graph)?;
    let mut run = BenchmarkRun::new(&graph.name, parameters);
    if matches.is_present("output-required") || matches.is_present("output") {
        run = run.output(matches.value_of("output"));
    }
    if let Some(log_file) = matches.value_of("log-file") {
        run = run.log_file(log_file);
    }
    let result = platform.execute(&run);
    platform.delete_graph(&graph.name);
    let state = result?;
    println!("{:?}", state);
    Ok(())
}

fn handle_translate(matches: &ArgMatches) -> Result<(), Box<dyn Error>> {
    let map = VertexIdMap::from_vertex_file(matches.value_of("VERTICES").unwrap())?;
    let rows = ResultTranslator::new(&map).translate(
        matches.value_of("RAW").unwrap(),
        matches.value_of("OUTPUT").unwrap(),
    )?;
    println!("{}", rows);
    Ok(())
}

fn graph_args<'a, 'b>() -> Vec<Arg<'a, 'b>> {
    vec![
        Arg::with_name("VERTICES").required(true),
        Arg::with_name("EDGES").required(true),
        Arg::with_name("graph-name")
            .help("Names the graph and its intermediate directory")
            .long("graph-name")
            .takes_value(true)
            .default_value("graph"),
        Arg::with_name("num-vertices")
            .help("Expected number of vertices, used to presize the id map")
            .long("num-vertices")
            .takes_value(true),
        Arg::with_name("undirected")
            .help("Writes every edge in both directions")
            .long("undirected")
            .takes_value(false),
        Arg::with_name("weighted")
            .help("Edge lines carry a real weight as a third column")
            .long("weighted")
            .takes_value(false),
        Arg::with_name("edge-format")
            .long("edge-format")
            .takes_value(true)
            .default_value("pipe")
            .possible_values(&["pipe", "space"]),
    ]
}

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let matches = App::new(crate_name!())
        .about(crate_description!())
        .author(crate_authors!())
        .version(crate_version!())
        .setting(AppSettings::SubcommandRequiredElseHelp)
        .subcommand(
            SubCommand::with_name("transcode")
                .about("Converts a VE graph into the engine's CSV format")
                .args(&graph_args())
                .arg(Arg::with_name("OUTDIR").required(true)),
        )
        .subcommand(
            SubCommand::with_name("run")
                .about("Transcodes a graph and runs one algorithm on it")
                .after_help(
                    r"Algorithm parameters:

  bfs, sssp  --source
  pr         --damping --iterations
  cdlp       --iterations
  lcc, wcc   (none)
",
                )
                .args(&graph_args())
                .arg(
                    Arg::with_name("ALGORITHM")
                        .required(true)
                        .possible_values(&["bfs", "sssp", "pr", "cdlp", "lcc", "wcc"]),
                )
                .arg(
                    Arg::with_name("home")
                        .help("Engine installation, binaries are looked up in <home>/bin")
                        .long("home")
                        .env("OPENG_HOME")
                        .takes_value(true)
                        .required(true),
                )
                .arg(
                    Arg::with_name("threads")
                        .help("Worker threads passed to the engine")
                        .long("threads")
                        .env("OPENG_NUM_WORKER_THREADS")
                        .takes_value(true),
                )
                .arg(
                    Arg::with_name("intermediate-dir")
                        .long("intermediate-dir")
                        .env("OPENG_INTERMEDIATE_DIR")
                        .takes_value(true)
                        .default_value("/tmp/openg/intermediate"),
                )
                .arg(
                    Arg::with_name("output-dir")
                        .long("output-dir")
                        .env("OPENG_OUTPUT_DIR")
                        .takes_value(true)
                        .default_value("/tmp/openg/output"),
                )
                .arg(
                    Arg::with_name("timeout-secs")
                        .help("Kills the engine after this many seconds")
                        .long("timeout-secs")
                        .takes_value(true),
                )
                .arg(Arg::with_name("source").long("source").takes_value(true))
                .arg(Arg::with_name("damping").long("damping").takes_value(true))
                .arg(
                    Arg::with_name("iterations")
                        .long("iterations")
                        .takes_value(true),
                )
                .arg(
                    Arg::with_name("output-required")
                        .help("Writes results to <output-dir>/<graph>-<algorithm>")
                        .long("output-required")
                        .takes_value(false),
                )
                .arg(
                    Arg::with_name("output")
                        .help("Writes results to this file")
                        .long("output")
                        .takes_value(true),
                )
                .arg(
                    Arg::with_name("log-file")
                        .help("Copies engine output to this file")
                        .long("log-file")
                        .takes_value(true),
                ),
        )
        .subcommand(
            SubCommand::with_name("translate")
                .about("Rewrites an engine result file to native vertex ids")
                .arg(Arg::with_name("VERTICES").required(true))
                .arg(Arg::with_name("RAW").required(true))
                .arg(Arg::with_name("OUTPUT").required(true)),
        )
        .get_matches();
    if let Some(matches) = matches.subcommand_matches("transcode") {
        handle_transcode(matches)?;
    } else if let Some(matches) = matches.subcommand_matches("run") {
        handle_run(matches)?;
    } else if let Some(matches) = matches.subcommand_matches("translate") {
        handle_translate(matches)?;
    }
    Ok(())
}
