//! Catalog of the functions defined in a QLC+ workspace

use crate::{Error, FunctionKind, Result, RunOrder};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::collections::{BTreeSet, HashMap};
use std::path::Path;

/// A function found in the workspace
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct CatalogEntry {
    pub id: u32,
    pub kind: FunctionKind,
    pub name: String,
    /// `RunOrder` text, present on chasers and sequences
    pub run_order: Option<RunOrder>,
    /// `Speed@Duration` in milliseconds
    pub duration_ms: Option<u64>,
    /// `Source` path of audio and video functions, relative to the workspace
    pub source: Option<String>,
}

/// Functions of a workspace indexed by (kind, name)
#[derive(Debug, Clone, Default)]
pub struct FunctionCatalog {
    entries: HashMap<FunctionKind, HashMap<String, CatalogEntry>>,
    ids: BTreeSet<u32>,
}

/// Function element being read
#[derive(Default)]
struct PendingFunction {
    element: String,
    id: Option<String>,
    kind: Option<String>,
    name: Option<String>,
    run_order: Option<String>,
    duration: Option<String>,
    source: Option<String>,
}

/// Elements whose text content we keep
#[derive(Clone, Copy)]
enum TextTarget {
    RunOrder,
    Source,
}

impl PendingFunction {
    fn from_start(e: &BytesStart<'_>) -> Result<Self> {
        let mut pending = PendingFunction {
            element: describe_element(e),
            ..Default::default()
        };

        for attr in e.attributes() {
            let attr = attr.map_err(quick_xml::Error::from)?;
            let value = attr.unescape_value()?.into_owned();
            match attr.key.local_name().as_ref() {
                b"ID" => pending.id = Some(value),
                b"Type" => pending.kind = Some(value),
                b"Name" => pending.name = Some(value),
                _ => {}
            }
        }

        Ok(pending)
    }

    fn read_speed(&mut self, e: &BytesStart<'_>) -> Result<()> {
        // Only the first Speed element counts
        if self.duration.is_some() {
            return Ok(());
        }
        for attr in e.attributes() {
            let attr = attr.map_err(quick_xml::Error::from)?;
            if attr.key.local_name().as_ref() == b"Duration" {
                let value = attr.unescape_value()?;
                if !value.is_empty() {
                    self.duration = Some(value.into_owned());
                }
            }
        }
        Ok(())
    }
}

impl FunctionCatalog {
    /// Reads the catalog from a workspace file on disk
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let xml = std::fs::read_to_string(path)?;
        Self::from_xml(&xml)
    }

    /// Reads the catalog from workspace XML.
    ///
    /// Only `Function` elements directly below `Engine` are considered. Every
    /// function must carry `ID`, `Name` and `Type`; a function missing any of
    /// them aborts the read.
    pub fn from_xml(xml: &str) -> Result<Self> {
        let mut reader = Reader::from_str(xml);
        reader.config_mut().trim_text(true);

        let mut catalog = FunctionCatalog::default();
        let mut path: Vec<Vec<u8>> = Vec::new();
        let mut pending: Option<PendingFunction> = None;
        // Depth of the open Function element within `path`
        let mut function_depth = 0;
        let mut text_target: Option<TextTarget> = None;

        loop {
            match reader.read_event()? {
                Event::Eof => break,
                Event::Start(e) => {
                    let name = e.local_name().as_ref().to_vec();
                    if pending.is_none() && name == b"Function" && is_engine(&path) {
                        pending = Some(PendingFunction::from_start(&e)?);
                        function_depth = path.len() + 1;
                    } else if let Some(function) = pending.as_mut() {
                        match name.as_slice() {
                            b"Speed" => function.read_speed(&e)?,
                            b"RunOrder" => text_target = Some(TextTarget::RunOrder),
                            b"Source" => text_target = Some(TextTarget::Source),
                            _ => {}
                        }
                    }
                    path.push(name);
                }
                Event::Empty(e) => {
                    let name = e.local_name();
                    if pending.is_none() && name.as_ref() == b"Function" && is_engine(&path) {
                        catalog.insert(PendingFunction::from_start(&e)?)?;
                    } else if let Some(function) = pending.as_mut() {
                        if name.as_ref() == b"Speed" {
                            function.read_speed(&e)?;
                        }
                    }
                }
                Event::Text(e) => {
                    if let (Some(target), Some(function)) = (text_target, pending.as_mut()) {
                        let text = e.unescape()?.into_owned();
                        match target {
                            TextTarget::RunOrder => function.run_order = Some(text),
                            TextTarget::Source => function.source = Some(text),
                        }
                    }
                }
                Event::End(_) => {
                    text_target = None;
                    if pending.is_some() && path.len() == function_depth {
                        if let Some(function) = pending.take() {
                            catalog.insert(function)?;
                        }
                    }
                    path.pop();
                }
                _ => {}
            }
        }

        if catalog.ids.is_empty() {
            return Err(Error::NoFunctions);
        }

        tracing::info!(
            functions = catalog.ids.len(),
            indexed = catalog.len(),
            "Read workspace function catalog"
        );

        Ok(catalog)
    }

    fn insert(&mut self, function: PendingFunction) -> Result<()> {
        let (Some(id), Some(kind), Some(name)) = (function.id, function.kind, function.name)
        else {
            return Err(Error::MissingAttributes {
                element: function.element,
            });
        };

        let id: u32 = id.trim().parse().map_err(|_| Error::InvalidFunctionId {
            element: function.element.clone(),
        })?;

        if !self.ids.insert(id) {
            return Err(Error::DuplicateFunctionId(id));
        }

        // The ID is reserved even when the type is one we do not index
        let Ok(kind) = kind.parse::<FunctionKind>() else {
            tracing::warn!(id, kind = %kind, "Skipping function of unknown type");
            return Ok(());
        };

        let duration_ms = match function.duration {
            Some(duration) => match duration.trim().parse::<u64>() {
                Ok(ms) => Some(ms),
                Err(_) => {
                    tracing::warn!(id, duration = %duration, "Ignoring non-numeric Speed duration");
                    None
                }
            },
            None => None,
        };

        let entry = CatalogEntry {
            id,
            kind,
            name: name.clone(),
            run_order: function.run_order.as_deref().map(RunOrder::parse),
            duration_ms,
            source: function.source,
        };

        if let Some(previous) = self.entries.entry(kind).or_default().insert(name, entry) {
            tracing::warn!(
                kind = %kind,
                name = %previous.name,
                replaced_id = previous.id,
                id,
                "Duplicate function name, the later definition wins"
            );
        }

        Ok(())
    }

    /// Looks up a function by kind and exact name
    pub fn lookup(&self, kind: FunctionKind, name: &str) -> Option<&CatalogEntry> {
        self.entries.get(&kind)?.get(name)
    }

    /// Returns every function with the given name, whatever its kind
    pub fn find_by_name(&self, name: &str) -> Vec<&CatalogEntry> {
        let mut matches: Vec<&CatalogEntry> = self
            .entries
            .values()
            .filter_map(|by_name| by_name.get(name))
            .collect();
        matches.sort_by_key(|entry| entry.kind);
        matches
    }

    /// Every function ID present in the workspace, indexed or not
    pub fn ids(&self) -> impl Iterator<Item = u32> + '_ {
        self.ids.iter().copied()
    }

    /// Number of indexed functions
    pub fn len(&self) -> usize {
        self.entries.values().map(HashMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn is_engine(path: &[Vec<u8>]) -> bool {
    path.last().is_some_and(|parent| parent.as_slice() == b"Engine")
}

/// Renders the start tag for diagnostics
fn describe_element(e: &BytesStart<'_>) -> String {
    format!("<{}>", String::from_utf8_lossy(e))
}
