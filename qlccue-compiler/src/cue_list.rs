//! Cue-list compilation: one master chaser step per cue
//!
//! A cue triggers one to three functions. A single function is stepped to
//! directly; two or three are merged into a generated collection, shared by
//! every cue that triggers the same set of functions.

use crate::document::{self, Fragment};
use crate::normalizer::{CueRow, RowNormalizer};
use crate::{CompilerConfig, Error, Result, RowError, RowErrorKind};
use qlccue_core::{Collection, FunctionKind, IdAllocator, RunContext};
use std::collections::HashSet;
use std::io::Read;

/// One step of the master cue list
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cue {
    pub name: String,
    pub fade_in_ms: u64,
    /// Fade in of the following cue, or the configured final fade
    pub fade_out_ms: u64,
    /// Function or collection the step starts
    pub function_id: u32,
}

/// Compiled cues and the collections they need
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CueList {
    pub cues: Vec<Cue>,
    pub collections: Vec<Collection>,
}

/// Deduplicates generated collections by their member set
#[derive(Debug, Clone, Default)]
pub struct CollectionResolver {
    collections: Vec<Collection>,
}

impl CollectionResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the ID of the collection grouping `function_ids`, creating it
    /// if no earlier cue used the same set. Member order does not matter.
    pub fn resolve(
        &mut self,
        allocator: &mut IdAllocator,
        name: &str,
        mut function_ids: Vec<u32>,
    ) -> u32 {
        function_ids.sort_unstable();

        if let Some(existing) = self
            .collections
            .iter()
            .find(|collection| collection.groups(&function_ids))
        {
            tracing::debug!(id = existing.id, name, "Reusing collection");
            return existing.id;
        }

        let id = allocator.allocate();
        self.collections.push(Collection::new(id, name, function_ids));
        id
    }

    /// Collections created so far, in creation order
    pub fn into_collections(self) -> Vec<Collection> {
        self.collections
    }
}

/// Validates cue rows and resolves their targets
pub struct CueListCompiler<'a> {
    context: &'a mut RunContext,
    resolver: CollectionResolver,
    names: HashSet<String>,
}

impl<'a> CueListCompiler<'a> {
    pub fn new(context: &'a mut RunContext) -> Self {
        Self {
            context,
            resolver: CollectionResolver::new(),
            names: HashSet::new(),
        }
    }

    /// Resolves one row to the ID its master step should start.
    /// The fade out is filled in once the following cue is known.
    pub fn compile_row(&mut self, row: &CueRow) -> std::result::Result<Cue, RowErrorKind> {
        let mut ids = Vec::with_capacity(row.functions.len());
        for (kind, name) in &row.functions {
            if !matches!(kind, FunctionKind::Chaser | FunctionKind::Scene | FunctionKind::Show) {
                return Err(RowErrorKind::UnsupportedKind(*kind));
            }
            let entry = self.context.catalog.lookup(*kind, name).ok_or_else(|| {
                RowErrorKind::FunctionNotFound {
                    kind: *kind,
                    name: name.clone(),
                }
            })?;
            ids.push(entry.id);
        }

        if !self.names.insert(row.name.clone()) {
            return Err(RowErrorKind::DuplicateCue(row.name.clone()));
        }

        let function_id = match ids.as_slice() {
            [] => return Err(RowErrorKind::NoActions(row.name.clone())),
            [single] => *single,
            _ => {
                let name = row
                    .functions
                    .iter()
                    .map(|(_, name)| name.as_str())
                    .collect::<Vec<_>>()
                    .join(" / ");
                self.resolver
                    .resolve(&mut self.context.allocator, &name, ids)
            }
        };

        tracing::debug!(cue = %row.name, function_id, "Compiled cue");

        Ok(Cue {
            name: row.name.clone(),
            fade_in_ms: row.fade_in.ms(),
            fade_out_ms: 0,
            function_id,
        })
    }

    /// Compiles every row, collecting all row errors before giving up
    pub fn compile(
        mut self,
        rows: Vec<std::result::Result<CueRow, RowError>>,
        config: &CompilerConfig,
    ) -> Result<CueList> {
        let mut cues = Vec::new();
        let mut errors = Vec::new();

        for row in rows {
            match row.and_then(|row| {
                self.compile_row(&row)
                    .map_err(|kind| RowError::new(row.line, kind))
            }) {
                Ok(cue) => cues.push(cue),
                Err(error) => errors.push(error),
            }
        }

        if !errors.is_empty() {
            return Err(Error::Rows(errors));
        }

        // Each cue fades out as the next one fades in
        let final_fade = config.final_fade.ms();
        let next_fades: Vec<u64> = cues
            .iter()
            .skip(1)
            .map(|cue| cue.fade_in_ms)
            .chain(std::iter::once(final_fade))
            .collect();
        for (cue, fade_out) in cues.iter_mut().zip(next_fades) {
            cue.fade_out_ms = fade_out;
        }

        Ok(CueList {
            cues,
            collections: self.resolver.into_collections(),
        })
    }
}

/// Compiles a cue-list sheet into a workspace fragment
pub fn compile_cue_list<R: Read>(
    context: &mut RunContext,
    config: &CompilerConfig,
    cues: R,
) -> Result<Fragment> {
    let rows = RowNormalizer::new(&context.catalog).cue_rows(cues)?;
    let cue_list = CueListCompiler::new(context).compile(rows, config)?;
    let master_id = context.allocate_id();

    tracing::info!(
        cues = cue_list.cues.len(),
        collections = cue_list.collections.len(),
        id = master_id,
        "Compiled cue list"
    );

    Ok(document::cue_list_fragment(&cue_list, master_id))
}
