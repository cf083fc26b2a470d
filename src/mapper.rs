//! The bijection between native vertex ids and dense engine ids.

use crate::{
    error::{Err, Result},
    transcode::{for_each_line, parse_id},
    types::{DenseId, NativeId},
};
use std::{
    collections::{hash_map::Entry, HashMap},
    path::Path,
};

/// Assigns dense ids in the order vertices are handed to it.
#[derive(Debug, Default)]
pub struct VertexIdMapper {
    forward: HashMap<NativeId, DenseId>,
    reverse: Vec<NativeId>,
}

impl VertexIdMapper {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(num_vertices: usize) -> Self {
        Self {
            forward: HashMap::with_capacity(num_vertices),
            reverse: Vec::with_capacity(num_vertices),
        }
    }

    /// Assigns the next dense id to `id`.
    ///
    /// A native id may only be assigned once.
    pub fn assign(&mut self, id: NativeId) -> Result<DenseId> {
        let dense = self.reverse.len() as DenseId;
        match self.forward.entry(id) {
            Entry::Occupied(_) => {
                return Err(Err::parse("duplicate vertex id", id.to_string()));
            }
            Entry::Vacant(entry) => entry.insert(dense),
        };
        self.reverse.push(id);
        Ok(dense)
    }

    pub fn len(&self) -> usize {
        self.reverse.len()
    }

    pub fn is_empty(&self) -> bool {
        self.reverse.is_empty()
    }

    pub fn finish(self) -> VertexIdMap {
        VertexIdMap {
            forward: self.forward,
            reverse: self.reverse,
        }
    }
}

/// A frozen id map. It is never mutated after construction, so it can be
/// shared between any number of readers.
#[derive(Debug)]
pub struct VertexIdMap {
    forward: HashMap<NativeId, DenseId>,
    reverse: Vec<NativeId>,
}

impl VertexIdMap {
    /// Rebuilds the map from a native vertex list without writing anything.
    pub fn from_vertex_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let mut mapper = VertexIdMapper::new();
        for_each_line(path, Err::parse, |location, line| {
            let id = parse_id(line.split_whitespace().next(), &location, line)?;
            mapper
                .assign(id)
                .map_err(|_| Err::parse(format!("{}: duplicate vertex id", location), line))?;
            Ok(())
        })?;
        Ok(mapper.finish())
    }

    pub fn forward(&self, id: NativeId) -> Result<DenseId> {
        self.forward
            .get(&id)
            .copied()
            .ok_or_else(|| Err::parse("unknown vertex id", id.to_string()))
    }

    pub fn reverse(&self, id: DenseId) -> Result<NativeId> {
        self.reverse
            .get(id as usize)
            .copied()
            .ok_or_else(|| Err::output("no native id for dense id", id.to_string()))
    }

    pub fn len(&self) -> usize {
        self.reverse.len()
    }

    pub fn is_empty(&self) -> bool {
        self.reverse.is_empty()
    }
}
