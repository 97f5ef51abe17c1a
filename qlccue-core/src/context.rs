//! Per-run state shared by the compiler stages

use crate::{FunctionCatalog, IdAllocator, Result};
use std::path::Path;

/// Catalog and ID allocator for one compilation.
///
/// Built from a freshly read workspace and dropped once the fragment has been
/// printed; nothing survives between runs.
#[derive(Debug, Clone)]
pub struct RunContext {
    pub catalog: FunctionCatalog,
    pub allocator: IdAllocator,
}

impl RunContext {
    /// Creates a context whose allocator is seeded with every catalog ID
    pub fn new(catalog: FunctionCatalog) -> Self {
        let allocator = IdAllocator::new(catalog.ids());
        Self { catalog, allocator }
    }

    /// Parses workspace XML and builds a context from it
    pub fn from_xml(xml: &str) -> Result<Self> {
        Ok(Self::new(FunctionCatalog::from_xml(xml)?))
    }

    /// Reads a workspace file and builds a context from it
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Ok(Self::new(FunctionCatalog::open(path)?))
    }

    /// Allocates a fresh function ID
    pub fn allocate_id(&mut self) -> u32 {
        self.allocator.allocate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allocator_skips_every_workspace_id() {
        let xml = r#"<Workspace><Engine>
            <Function ID="1" Type="Scene" Name="A"/>
            <Function ID="2" Type="Plugin" Name="Unindexed"/>
            <Function ID="4" Type="Chaser" Name="B"/>
        </Engine></Workspace>"#;

        let mut context = RunContext::from_xml(xml).unwrap();
        assert_eq!(context.allocate_id(), 3);
        assert_eq!(context.allocate_id(), 5);
    }
}
