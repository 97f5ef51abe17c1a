//! Audio duration probing

use crate::{CompilerConfig, Error, Result};
use lofty::prelude::*;
use lofty::probe::Probe;
use qlccue_core::{FunctionCatalog, FunctionKind};
use std::path::Path;

/// Reads the playback length of an audio file
pub trait AudioProbe {
    /// Returns the duration in whole milliseconds
    fn duration_ms(&self, path: &Path) -> Result<u64>;
}

/// Probe backed by lofty's format detection
#[derive(Debug, Clone, Copy, Default)]
pub struct LoftyProbe;

impl AudioProbe for LoftyProbe {
    fn duration_ms(&self, path: &Path) -> Result<u64> {
        let probe_error = |message: String| Error::AudioProbe {
            path: path.to_path_buf(),
            message,
        };

        let tagged_file = Probe::open(path)
            .map_err(|e| probe_error(e.to_string()))?
            .read()
            .map_err(|e| probe_error(e.to_string()))?;

        let duration = tagged_file.properties().duration();
        let ms = u64::try_from(duration.as_millis()).map_err(|e| probe_error(e.to_string()))?;

        tracing::debug!(file = %path.display(), duration_ms = ms, "Probed audio duration");
        Ok(ms)
    }
}

/// The show's audio function and its length
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShowAudio {
    pub function_id: u32,
    pub duration_ms: u64,
}

/// Audio function named after the show, with its source path
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioSource {
    pub function_id: u32,
    pub source: String,
}

impl AudioSource {
    /// Finds the audio function called `show_name` and its `Source`
    pub fn find(catalog: &FunctionCatalog, show_name: &str) -> Result<Self> {
        let entry = catalog
            .lookup(FunctionKind::Audio, show_name)
            .ok_or_else(|| Error::AudioFunctionNotFound(show_name.to_string()))?;

        let source = entry
            .source
            .clone()
            .filter(|source| !source.trim().is_empty())
            .ok_or_else(|| Error::AudioSourceMissing(show_name.to_string()))?;

        Ok(Self {
            function_id: entry.id,
            source,
        })
    }

    /// Probes the file below the configured audio root
    pub fn probe(&self, config: &CompilerConfig, probe: &dyn AudioProbe) -> Result<ShowAudio> {
        let path = config.audio_root.join(&self.source);
        Ok(ShowAudio {
            function_id: self.function_id,
            duration_ms: probe.duration_ms(&path)?,
        })
    }
}
