//! Rewrites engine results from dense ids back to native ids.

use crate::{
    error::{Err, Result},
    mapper::VertexIdMap,
    transcode::{for_each_line, publish},
    types::DenseId,
};
use log::info;
use std::{
    fs,
    io::{BufWriter, Write},
    path::Path,
};
use tempfile::NamedTempFile;

pub struct ResultTranslator<'a> {
    map: &'a VertexIdMap,
}

impl<'a> ResultTranslator<'a> {
    pub fn new(map: &'a VertexIdMap) -> Self {
        Self { map }
    }

    /// Reads `raw`, one `<dense id> <value>` or `<value>` row per vertex, and
    /// writes `<native id> <value>` rows to `output` in the same order.
    ///
    /// A row without an id belongs to the vertex at that row's position.
    /// Returns the number of rows written.
    pub fn translate<P, Q>(&self, raw: P, output: Q) -> Result<usize>
    where
        P: AsRef<Path>,
        Q: AsRef<Path>,
    {
        let (raw, output) = (raw.as_ref(), output.as_ref());
        info!(
            "translating engine output {} into {}",
            raw.display(),
            output.display()
        );
        let dir = match output.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        fs::create_dir_all(dir)?;
        let mut file = NamedTempFile::new_in(dir)?;
        let mut writer = BufWriter::new(file.as_file_mut());
        let mut position: DenseId = 0;
        for_each_line(raw, Err::output, |location, line| {
            let mut fields = line.split_whitespace();
            let (first, second, rest) = (fields.next(), fields.next(), fields.next());
            let (dense, value) = match (first, second, rest) {
                (Some(value), None, None) => (position, value),
                (Some(id), Some(value), None) => {
                    let id = id.parse().map_err(|_| {
                        Err::output(format!("{}: invalid vertex id", location), line)
                    })?;
                    (id, value)
                }
                _ => {
                    return Err(Err::output(
                        format!("{}: expected an id and a value", location),
                        line,
                    ))
                }
            };
            let native = self.map.reverse(dense).map_err(|_| {
                Err::output(
                    format!("{}: no native id for dense id {}", location, dense),
                    line,
                )
            })?;
            writeln!(writer, "{} {}", native, value)?;
            position += 1;
            Ok(())
        })?;
        writer.flush()?;
        drop(writer);
        publish(file, output)?;
        Ok(position as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapper::VertexIdMapper;
    use tempfile::TempDir;

    fn map() -> VertexIdMap {
        let mut mapper = VertexIdMapper::new();
        for &id in [42, 7, 1000].iter() {
            mapper.assign(id).unwrap();
        }
        mapper.finish()
    }

    #[test]
    fn test_explicit_ids() {
        let dir = TempDir::new().unwrap();
        let raw = dir.path().join("raw");
        let out = dir.path().join("out/result");
        fs::write(&raw, "0 0.25\n2 0.5\n\n1 0.25\n").unwrap();
        let map = map();
        assert_eq!(ResultTranslator::new(&map).translate(&raw, &out).unwrap(), 3);
        assert_eq!(
            fs::read_to_string(&out).unwrap(),
            "42 0.25\n1000 0.5\n7 0.25\n"
        );
    }

    #[test]
    fn test_implicit_ids() {
        let dir = TempDir::new().unwrap();
        let raw = dir.path().join("raw");
        let out = dir.path().join("result");
        fs::write(&raw, "3\n9223372036854775807\n0\n").unwrap();
        let map = map();
        ResultTranslator::new(&map).translate(&raw, &out).unwrap();
        assert_eq!(
            fs::read_to_string(&out).unwrap(),
            "42 3\n7 9223372036854775807\n1000 0\n"
        );
    }

    #[test]
    fn test_unknown_dense_id() {
        let dir = TempDir::new().unwrap();
        let raw = dir.path().join("raw");
        let out = dir.path().join("result");
        fs::write(&raw, "0 1\n3 1\n").unwrap();
        let map = map();
        match ResultTranslator::new(&map).translate(&raw, &out) {
            Err(Err::OutputTranslationError { context, content }) => {
                assert!(context.ends_with(":2: no native id for dense id 3"));
                assert_eq!(content, "3 1");
            }
            other => panic!("unexpected result: {:?}", other),
        }
        assert!(!out.exists());
    }

    #[test]
    fn test_invalid_utf8_row() {
        let dir = TempDir::new().unwrap();
        let raw = dir.path().join("raw");
        let out = dir.path().join("result");
        fs::write(&raw, b"0 1\n1 \xff\n").unwrap();
        let map = map();
        match ResultTranslator::new(&map).translate(&raw, &out) {
            Err(Err::OutputTranslationError { context, .. }) => {
                assert!(context.ends_with(":2: invalid UTF-8"))
            }
            other => panic!("unexpected result: {:?}", other),
        }
        assert!(!out.exists());
    }

    #[test]
    fn test_malformed_row() {
        let dir = TempDir::new().unwrap();
        let raw = dir.path().join("raw");
        fs::write(&raw, "0 1 2\n").unwrap();
        let map = map();
        assert!(matches!(
            ResultTranslator::new(&map).translate(&raw, dir.path().join("result")),
            Err(Err::OutputTranslationError { .. })
        ));
    }
}
