//! Read-only description of an input graph in the native VE format.

use crate::error::{Err, Result};
use derive_more::Display;
use std::path::PathBuf;

#[derive(Debug, Display, Clone, Copy, PartialEq, Eq)]
pub enum PropertyType {
    #[display(fmt = "INTEGER")]
    Integer,
    #[display(fmt = "REAL")]
    Real,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Property {
    pub name: String,
    pub kind: PropertyType,
}

impl Property {
    pub fn new(name: &str, kind: PropertyType) -> Self {
        Self {
            name: String::from(name),
            kind,
        }
    }
}

#[derive(Debug, Clone)]
pub struct GraphDescriptor {
    pub name: String,
    pub vertex_path: PathBuf,
    pub edge_path: PathBuf,
    pub directed: bool,
    pub num_vertices: u64,
    pub vertex_properties: Vec<Property>,
    pub edge_properties: Vec<Property>,
}

impl GraphDescriptor {
    pub fn new<V, E>(name: &str, vertex_path: V, edge_path: E, directed: bool) -> Self
    where
        V: Into<PathBuf>,
        E: Into<PathBuf>,
    {
        Self {
            name: String::from(name),
            vertex_path: vertex_path.into(),
            edge_path: edge_path.into(),
            directed,
            num_vertices: 0,
            vertex_properties: vec![],
            edge_properties: vec![],
        }
    }

    pub fn num_vertices(mut self, num_vertices: u64) -> Self {
        self.num_vertices = num_vertices;
        self
    }

    pub fn vertex_property(mut self, property: Property) -> Self {
        self.vertex_properties.push(property);
        self
    }

    pub fn edge_property(mut self, property: Property) -> Self {
        self.edge_properties.push(property);
        self
    }

    /// True if every edge line carries a weight column.
    pub fn is_weighted(&self) -> bool {
        !self.edge_properties.is_empty()
    }

    /// Rejects graphs the engine cannot represent, before anything is written.
    pub fn check_supported(&self) -> Result<()> {
        if self.num_vertices > i32::MAX as u64 {
            return Err(Err::ConfigurationError(format!(
                "graph \"{}\" has {} vertices, at most {} are supported",
                self.name,
                self.num_vertices,
                i32::MAX
            )));
        }
        if !self.vertex_properties.is_empty() {
            return Err(Err::ConfigurationError(String::from(
                "vertices with properties are not supported",
            )));
        }
        match self.edge_properties.as_slice() {
            [] => Ok(()),
            [property] if property.kind == PropertyType::Real => Ok(()),
            [property] => Err(Err::ConfigurationError(format!(
                "edge properties of type {} are not supported",
                property.kind
            ))),
            _ => Err(Err::ConfigurationError(String::from(
                "more than one edge property is not supported",
            ))),
        }
    }
}
