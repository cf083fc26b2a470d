//! Converts a graph from the native VE format into the engine's CSV format.
//!
//! The engine expects a directory holding two files:
//!
//! ```text
//! vertex.csv    edge.csv
//! id            id|id
//! 0             0|1
//! 1             1|0
//! ```
//!
//! Both inputs are streamed line by line, only the id map grows with the graph.

use crate::{
    error::{Err, Result},
    graph::GraphDescriptor,
    mapper::{VertexIdMap, VertexIdMapper},
    types::NativeId,
};
use log::{debug, info};
use std::{
    fs::{self, File},
    io::{BufRead, BufReader, BufWriter, Write},
    path::Path,
};
use tempfile::NamedTempFile;

pub const VERTEX_FILE: &str = "vertex.csv";
pub const EDGE_FILE: &str = "edge.csv";

/// Position of a line in an input file.
#[derive(Debug, Clone, Copy)]
pub struct Location<'a> {
    pub path: &'a Path,
    pub line: usize,
}

impl std::fmt::Display for Location<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.path.display(), self.line)
    }
}

/// Calls `f` on each line of `path` that is neither blank nor a `#` comment.
///
/// Lines that are not valid UTF-8 are reported through `malformed`.
pub(crate) fn for_each_line<F>(
    path: &Path,
    malformed: fn(String, String) -> Err,
    mut f: F,
) -> Result<()>
where
    F: FnMut(Location<'_>, &str) -> Result<()>,
{
    let mut reader = BufReader::new(File::open(path)?);
    let mut buf = Vec::new();
    let mut line = 0;
    loop {
        buf.clear();
        if reader.read_until(b'\n', &mut buf)? == 0 {
            return Ok(());
        }
        line += 1;
        let location = Location { path, line };
        let text = std::str::from_utf8(&buf).map_err(|_| {
            malformed(
                format!("{}: invalid UTF-8", location),
                String::from_utf8_lossy(&buf).trim().to_string(),
            )
        })?;
        let trimmed = text.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        f(location, trimmed)?;
    }
}

/// Moves a finished temp file to `path`, readable by the engine's user too.
pub(crate) fn publish(file: NamedTempFile, path: &Path) -> Result<()> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        file.as_file().set_permissions(fs::Permissions::from_mode(0o644))?;
    }
    file.persist(path).map_err(|e| e.error)?;
    Ok(())
}

pub(crate) fn parse_id(field: Option<&str>, location: &Location<'_>, line: &str) -> Result<NativeId> {
    field
        .and_then(|field| field.parse().ok())
        .ok_or_else(|| Err::parse(format!("{}: invalid vertex id", location), line))
}

/// The edge file layout understood by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeFormat {
    /// `id|id` header and `|` separated rows.
    Pipe,
    /// `id id` header and space separated rows.
    Space,
}

impl EdgeFormat {
    fn separator(self) -> char {
        match self {
            EdgeFormat::Pipe => '|',
            EdgeFormat::Space => ' ',
        }
    }

    fn header(self) -> &'static str {
        match self {
            EdgeFormat::Pipe => "id|id",
            EdgeFormat::Space => "id id",
        }
    }
}

impl Default for EdgeFormat {
    fn default() -> Self {
        EdgeFormat::Pipe
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TranscodeSummary {
    pub num_vertices: usize,
    pub num_edges: usize,
    pub num_edge_rows: usize,
}

pub struct GraphTranscoder<'a> {
    graph: &'a GraphDescriptor,
    format: EdgeFormat,
}

impl<'a> GraphTranscoder<'a> {
    pub fn new(graph: &'a GraphDescriptor) -> Self {
        Self {
            graph,
            format: EdgeFormat::default(),
        }
    }

    pub fn format(mut self, format: EdgeFormat) -> Self {
        self.format = format;
        self
    }

    /// Writes `vertex.csv` and `edge.csv` into `output_dir` and returns the
    /// id map used to produce them.
    ///
    /// Existing output files are replaced. On failure neither file is left behind.
    pub fn transcode<P: AsRef<Path>>(
        &self,
        output_dir: P,
    ) -> Result<(VertexIdMap, TranscodeSummary)> {
        let output_dir = output_dir.as_ref();
        self.graph.check_supported()?;
        info!(
            "transcoding graph \"{}\" into {}",
            self.graph.name,
            output_dir.display()
        );
        fs::create_dir_all(output_dir)?;
        let vertex_path = output_dir.join(VERTEX_FILE);
        let edge_path = output_dir.join(EDGE_FILE);
        for path in [&vertex_path, &edge_path].iter() {
            if path.exists() {
                fs::remove_file(path)?;
            }
        }

        debug!("reading vertex list to construct id mapping");
        let mut vertex_file = NamedTempFile::new_in(output_dir)?;
        let mapper = self.write_vertices(vertex_file.as_file_mut())?;
        let map = mapper.finish();

        debug!("writing edges");
        let mut edge_file = NamedTempFile::new_in(output_dir)?;
        let (num_edges, num_edge_rows) = self.write_edges(edge_file.as_file_mut(), &map)?;

        publish(vertex_file, &vertex_path)?;
        publish(edge_file, &edge_path)?;
        let summary = TranscodeSummary {
            num_vertices: map.len(),
            num_edges,
            num_edge_rows,
        };
        info!(
            "transcoded graph \"{}\": {} vertices, {} edges, {} edge rows",
            self.graph.name, summary.num_vertices, summary.num_edges, summary.num_edge_rows
        );
        Ok((map, summary))
    }

    fn write_vertices(&self, file: &mut File) -> Result<VertexIdMapper> {
        let mut mapper = VertexIdMapper::with_capacity(self.graph.num_vertices as usize);
        let mut writer = BufWriter::new(file);
        writeln!(writer, "id")?;
        for_each_line(&self.graph.vertex_path, Err::parse, |location, line| {
            let id = parse_id(line.split_whitespace().next(), &location, line)?;
            let dense = mapper
                .assign(id)
                .map_err(|_| Err::parse(format!("{}: duplicate vertex id", location), line))?;
            writeln!(writer, "{}", dense)?;
            Ok(())
        })?;
        writer.flush()?;
        Ok(mapper)
    }

    fn write_edges(&self, file: &mut File, map: &VertexIdMap) -> Result<(usize, usize)> {
        let separator = self.format.separator();
        let weighted = self.graph.is_weighted();
        let num_fields = if weighted { 3 } else { 2 };
        let mut writer = BufWriter::new(file);
        writeln!(writer, "{}", self.format.header())?;
        let (mut num_edges, mut num_rows) = (0, 0);
        for_each_line(&self.graph.edge_path, Err::parse, |location, line| {
            let mut fields = line.split_whitespace();
            let (src, dst, weight) = (fields.next(), fields.next(), fields.next());
            let count = [src, dst, weight].iter().flatten().count() + fields.count();
            if count != num_fields {
                return Err(Err::parse(
                    format!("{}: expected {} fields, found {}", location, num_fields, count),
                    line,
                ));
            }
            let resolve = |id: NativeId| {
                map.forward(id).map_err(|_| {
                    Err::parse(format!("{}: unknown vertex id {}", location, id), line)
                })
            };
            let src = resolve(parse_id(src, &location, line)?)?;
            let dst = resolve(parse_id(dst, &location, line)?)?;
            let weight = match weight {
                Some(weight) if weight.parse::<f64>().map_or(false, f64::is_finite) => {
                    Some(weight)
                }
                Some(_) => {
                    return Err(Err::parse(format!("{}: invalid edge weight", location), line))
                }
                None => None,
            };
            write_edge(&mut writer, separator, src, dst, weight)?;
            num_rows += 1;
            if !self.graph.directed {
                write_edge(&mut writer, separator, dst, src, weight)?;
                num_rows += 1;
            }
            num_edges += 1;
            Ok(())
        })?;
        writer.flush()?;
        Ok((num_edges, num_rows))
    }
}

fn write_edge<W: Write>(
    writer: &mut W,
    separator: char,
    src: u64,
    dst: u64,
    weight: Option<&str>,
) -> std::io::Result<()> {
    match weight {
        Some(weight) => writeln!(writer, "{}{}{}{}{}", src, separator, dst, separator, weight),
        None => writeln!(writer, "{}{}{}", src, separator, dst),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{Property, PropertyType};
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn write_graph(dir: &TempDir, vertices: &str, edges: &str) -> (PathBuf, PathBuf) {
        let vertex_path = dir.path().join("g.v");
        let edge_path = dir.path().join("g.e");
        fs::write(&vertex_path, vertices).unwrap();
        fs::write(&edge_path, edges).unwrap();
        (vertex_path, edge_path)
    }

    fn read_lines(path: &Path) -> Vec<String> {
        fs::read_to_string(path)
            .unwrap()
            .lines()
            .map(String::from)
            .collect()
    }

    #[test]
    fn test_directed() {
        let dir = TempDir::new().unwrap();
        let (v, e) = write_graph(&dir, "10\n20\n30\n", "10 20\n20 30\n\n30 10\n");
        let graph = GraphDescriptor::new("g", v, e, true).num_vertices(3);
        let out = dir.path().join("out");
        let (map, summary) = GraphTranscoder::new(&graph).transcode(&out).unwrap();
        assert_eq!(map.forward(30).unwrap(), 2);
        assert_eq!(
            summary,
            TranscodeSummary {
                num_vertices: 3,
                num_edges: 3,
                num_edge_rows: 3
            }
        );
        assert_eq!(read_lines(&out.join(VERTEX_FILE)), ["id", "0", "1", "2"]);
        assert_eq!(
            read_lines(&out.join(EDGE_FILE)),
            ["id|id", "0|1", "1|2", "2|0"]
        );
    }

    #[test]
    fn test_undirected_space_format() {
        let dir = TempDir::new().unwrap();
        let (v, e) = write_graph(&dir, "10\n20\n30\n", "10 20\n");
        let graph = GraphDescriptor::new("g", v, e, false);
        let out = dir.path().join("out");
        let (_, summary) = GraphTranscoder::new(&graph)
            .format(EdgeFormat::Space)
            .transcode(&out)
            .unwrap();
        assert_eq!(summary.num_edge_rows, 2);
        assert_eq!(read_lines(&out.join(EDGE_FILE)), ["id id", "0 1", "1 0"]);
    }

    #[test]
    fn test_weighted() {
        let dir = TempDir::new().unwrap();
        let (v, e) = write_graph(&dir, "1\n2\n", "2 1 0.5\n");
        let graph = GraphDescriptor::new("g", v, e, false)
            .edge_property(Property::new("weight", PropertyType::Real));
        let out = dir.path().join("out");
        GraphTranscoder::new(&graph).transcode(&out).unwrap();
        assert_eq!(
            read_lines(&out.join(EDGE_FILE)),
            ["id|id", "1|0|0.5", "0|1|0.5"]
        );
    }

    #[test]
    fn test_unknown_vertex_leaves_no_output() {
        let dir = TempDir::new().unwrap();
        let (v, e) = write_graph(&dir, "10\n20\n30\n", "10 20\n10 99\n");
        let graph = GraphDescriptor::new("g", v, e, true);
        let out = dir.path().join("out");
        fs::create_dir_all(&out).unwrap();
        fs::write(out.join(EDGE_FILE), "id|id\n").unwrap();
        match GraphTranscoder::new(&graph).transcode(&out) {
            Err(Err::ParseError { context, content }) => {
                assert!(context.contains(":2: unknown vertex id 99"));
                assert_eq!(content, "10 99");
            }
            other => panic!("unexpected result: {:?}", other.map(|(_, s)| s)),
        }
        assert!(!out.join(VERTEX_FILE).exists());
        assert!(!out.join(EDGE_FILE).exists());
        assert_eq!(fs::read_dir(&out).unwrap().count(), 0);
    }

    #[test]
    fn test_malformed_edge_line() {
        let dir = TempDir::new().unwrap();
        let (v, e) = write_graph(&dir, "1\n2\n", "1 2 3\n");
        let graph = GraphDescriptor::new("g", v, e, true);
        let result = GraphTranscoder::new(&graph).transcode(dir.path().join("out"));
        assert!(
            matches!(result, Err(Err::ParseError { ref content, .. }) if content == "1 2 3")
        );
    }

    #[test]
    fn test_non_finite_weight() {
        let dir = TempDir::new().unwrap();
        let graph_of = |edges: &str| {
            let (v, e) = write_graph(&dir, "1\n2\n", edges);
            GraphDescriptor::new("g", v, e, true)
                .edge_property(Property::new("weight", PropertyType::Real))
        };
        for edges in ["1 2 NaN\n", "1 2 inf\n", "1 2 -inf\n"].iter() {
            let graph = graph_of(edges);
            let out = dir.path().join("out");
            match GraphTranscoder::new(&graph).transcode(&out) {
                Err(Err::ParseError { context, .. }) => {
                    assert!(context.ends_with(":1: invalid edge weight"))
                }
                other => panic!("unexpected result: {:?}", other.map(|(_, s)| s)),
            }
            assert!(!out.join(EDGE_FILE).exists());
        }
    }

    #[test]
    fn test_invalid_utf8_is_a_parse_error() {
        let dir = TempDir::new().unwrap();
        let (v, e) = write_graph(&dir, "1\n2\n", "");
        fs::write(&e, b"1 2\n\xff\xfe 2\n").unwrap();
        let graph = GraphDescriptor::new("g", v, e, true);
        match GraphTranscoder::new(&graph).transcode(dir.path().join("out")) {
            Err(Err::ParseError { context, .. }) => {
                assert!(context.ends_with("g.e:2: invalid UTF-8"))
            }
            other => panic!("unexpected result: {:?}", other.map(|(_, s)| s)),
        }
    }

    #[cfg(unix)]
    #[test]
    fn test_published_files_are_world_readable() {
        use std::os::unix::fs::PermissionsExt;
        let dir = TempDir::new().unwrap();
        let (v, e) = write_graph(&dir, "1\n2\n", "1 2\n");
        let graph = GraphDescriptor::new("g", v, e, true);
        let out = dir.path().join("out");
        GraphTranscoder::new(&graph).transcode(&out).unwrap();
        for file in [VERTEX_FILE, EDGE_FILE].iter() {
            let mode = fs::metadata(out.join(file)).unwrap().permissions().mode();
            assert_eq!(mode & 0o777, 0o644);
        }
    }

    #[test]
    fn test_unsupported_graph_rejected_before_writing() {
        let dir = TempDir::new().unwrap();
        let (v, e) = write_graph(&dir, "1\n", "");
        let graph = GraphDescriptor::new("g", v, e, true)
            .edge_property(Property::new("weight", PropertyType::Integer));
        let out = dir.path().join("out");
        assert!(matches!(
            GraphTranscoder::new(&graph).transcode(&out),
            Err(Err::ConfigurationError(_))
        ));
        assert!(!out.exists());
    }
}
