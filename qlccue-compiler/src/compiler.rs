//! Show-mode compilation: timeline events to wrapper functions and tracks

use crate::audio::{AudioProbe, AudioSource};
use crate::document::{self, Fragment};
use crate::normalizer::{NormalizedRow, RowNormalizer, SheetFormat};
use crate::{CompilerConfig, Error, Result, RowError, RowErrorKind};
use indexmap::IndexMap;
use qlccue_core::{
    timecode, FunctionInstance, FunctionKind, Placement, RunContext, RunOrder, TimelineEvent,
    Track, TrackKind,
};
use std::collections::HashMap;
use std::io::Read;

/// Wrapper functions and tracks of a compiled show, in arrival order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShowTimeline {
    /// Chaser wrappers grouped by the chaser they wrap
    pub chaser_instances: IndexMap<String, Vec<FunctionInstance>>,
    /// Scene wrappers grouped by the scene they wrap
    pub scene_instances: IndexMap<String, Vec<FunctionInstance>>,
    /// "Chase N" lanes
    pub chaser_tracks: IndexMap<String, Track>,
    /// One lane per scene
    pub scene_tracks: IndexMap<String, Track>,
}

/// Validates timeline events and turns them into placements
pub struct CueCompiler<'a> {
    context: &'a mut RunContext,
    /// Chasers seen so far at each start time (ms)
    chases_at: HashMap<u64, u32>,
    timeline: ShowTimeline,
}

impl<'a> CueCompiler<'a> {
    /// Creates a compiler allocating IDs from `context`
    pub fn new(context: &'a mut RunContext) -> Self {
        Self {
            context,
            chases_at: HashMap::new(),
            timeline: ShowTimeline::default(),
        }
    }

    /// Compiles one event, returning the placement added to its track
    pub fn compile_event(
        &mut self,
        event: &TimelineEvent,
    ) -> std::result::Result<Placement, RowErrorKind> {
        let kind = event.function_kind;
        if !matches!(kind, FunctionKind::Chaser | FunctionKind::Scene) {
            return Err(RowErrorKind::UnsupportedKind(kind));
        }

        let entry = self
            .context
            .catalog
            .lookup(kind, &event.function_name)
            .ok_or_else(|| RowErrorKind::FunctionNotFound {
                kind,
                name: event.function_name.clone(),
            })?;
        let original_id = entry.id;
        let run_order = entry.run_order.clone();
        let catalog_duration = entry.duration_ms;

        let start_ms = timecode::decode(&event.timecode)?;
        let name = event.function_name.clone();
        let at = event.timecode.clone();

        let duration_ms = match kind {
            FunctionKind::Scene => match &event.duration {
                Some(duration) => timecode::decode(duration)?,
                None => {
                    return Err(RowErrorKind::MissingDuration {
                        name,
                        timecode: at,
                        requirement: "Scenes require a duration",
                    })
                }
            },
            _ => match (run_order, &event.duration) {
                (Some(RunOrder::Loop), Some(duration)) => timecode::decode(duration)?,
                (Some(RunOrder::Loop), None) => {
                    return Err(RowErrorKind::MissingDuration {
                        name,
                        timecode: at,
                        requirement: "'Loop Chaser' requires a duration",
                    })
                }
                (Some(RunOrder::SingleShot), Some(_)) => {
                    return Err(RowErrorKind::UnexpectedDuration { name, timecode: at })
                }
                (Some(RunOrder::SingleShot), None) => catalog_duration
                    .ok_or(RowErrorKind::MissingCatalogDuration { name, timecode: at })?,
                (Some(RunOrder::PingPong), _) => {
                    return Err(RowErrorKind::PingPong { name, timecode: at })
                }
                (other, _) => {
                    return Err(RowErrorKind::UnsupportedRunOrder {
                        name,
                        timecode: at,
                        run_order: other.map(|order| order.to_string()).unwrap_or_default(),
                    })
                }
            },
        };

        let new_id = self.context.allocate_id();
        let instance = FunctionInstance {
            new_id,
            original_id,
            duration_ms,
            fade_in_ms: event.fade_in_ms,
            fade_out_ms: event.fade_out_ms,
        };
        let placement = Placement::new(start_ms, duration_ms, new_id);

        let (instances, track) = if kind == FunctionKind::Chaser {
            let count = self.chases_at.entry(start_ms).or_insert(0);
            *count += 1;
            let lane = format!("Chase {}", count);
            (
                &mut self.timeline.chaser_instances,
                self.timeline
                    .chaser_tracks
                    .entry(lane.clone())
                    .or_insert_with(|| Track::chaser(lane)),
            )
        } else {
            (
                &mut self.timeline.scene_instances,
                self.timeline
                    .scene_tracks
                    .entry(event.function_name.clone())
                    .or_insert_with(|| Track::scene(event.function_name.clone(), original_id)),
            )
        };

        if track.kind == TrackKind::Scene {
            for existing in track.overlapping(&placement) {
                tracing::warn!(
                    scene = %track.name,
                    start_ms,
                    overlaps_start_ms = existing.start_ms,
                    "Scene placements overlap"
                );
            }
        }

        track.placements.push(placement);
        instances
            .entry(event.function_name.clone())
            .or_default()
            .push(instance);

        tracing::debug!(
            kind = %kind,
            name = %event.function_name,
            start_ms,
            duration_ms,
            id = new_id,
            track = %track.name,
            "Compiled cue"
        );

        Ok(placement)
    }

    /// Compiles every row, collecting all row errors before giving up
    pub fn compile(
        mut self,
        rows: Vec<std::result::Result<NormalizedRow, RowError>>,
    ) -> Result<ShowTimeline> {
        let mut errors = Vec::new();

        for row in rows {
            match row {
                Ok(row) => {
                    for event in &row.events {
                        if let Err(kind) = self.compile_event(event) {
                            errors.push(RowError::new(row.line, kind));
                        }
                    }
                }
                Err(error) => errors.push(error),
            }
        }

        if !errors.is_empty() {
            return Err(Error::Rows(errors));
        }
        Ok(self.timeline)
    }
}

/// Compiles a show cue sheet into a workspace fragment.
///
/// The audio function named after the show must exist before any row is read.
/// Its file is probed only once every row has compiled cleanly.
pub fn compile_show<R: Read>(
    context: &mut RunContext,
    config: &CompilerConfig,
    show_name: &str,
    cues: R,
    format: SheetFormat,
    probe: &dyn AudioProbe,
) -> Result<Fragment> {
    let audio_source = AudioSource::find(&context.catalog, show_name)?;

    let rows = RowNormalizer::new(&context.catalog).show_rows(cues, format)?;
    let timeline = CueCompiler::new(context).compile(rows)?;

    let audio = audio_source.probe(config, probe)?;
    let show_id = context.allocate_id();

    tracing::info!(
        show = show_name,
        id = show_id,
        chaser_tracks = timeline.chaser_tracks.len(),
        scene_tracks = timeline.scene_tracks.len(),
        "Compiled show"
    );

    Ok(document::show_fragment(
        show_id, show_name, audio, &timeline, config,
    ))
}
