//! Timeline data structures produced from a cue sheet

use crate::FunctionKind;

/// One normalized cue-sheet entry: a catalog function placed at a start time
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct TimelineEvent {
    /// Start time as written in the cue sheet (`MM:SS.mmm`)
    pub timecode: String,
    /// Fade in length in milliseconds
    pub fade_in_ms: u64,
    /// Fade out length in milliseconds
    pub fade_out_ms: u64,
    /// Kind of the referenced catalog function
    pub function_kind: FunctionKind,
    /// Name of the referenced catalog function
    pub function_name: String,
    /// Duration as written in the cue sheet, if any
    pub duration: Option<String>,
}

/// A generated function that places an existing function on the timeline
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct FunctionInstance {
    /// Newly allocated ID of the wrapper
    pub new_id: u32,
    /// ID of the wrapped catalog function
    pub original_id: u32,
    /// How long the wrapper runs
    pub duration_ms: u64,
    pub fade_in_ms: u64,
    pub fade_out_ms: u64,
}

/// A wrapper function scheduled on a track
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Placement {
    /// Start time in milliseconds
    pub start_ms: u64,
    /// Duration in milliseconds
    pub duration_ms: u64,
    /// ID of the placed function
    pub function_id: u32,
}

impl Placement {
    /// Creates a new placement
    pub fn new(start_ms: u64, duration_ms: u64, function_id: u32) -> Self {
        Self {
            start_ms,
            duration_ms,
            function_id,
        }
    }

    /// Returns the end time in milliseconds
    pub fn end_ms(&self) -> u64 {
        self.start_ms.saturating_add(self.duration_ms)
    }

    /// Checks whether two placements share any instant
    pub fn overlaps(&self, other: &Placement) -> bool {
        self.start_ms < other.end_ms() && other.start_ms < self.end_ms()
    }
}

/// Lane kinds inside a generated show
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum TrackKind {
    Chaser,
    Scene,
}

/// A named timeline lane holding placements in arrival order
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Track {
    pub kind: TrackKind,
    pub name: String,
    /// Scene bound to the track (scene tracks only)
    pub scene_id: Option<u32>,
    pub placements: Vec<Placement>,
}

impl Track {
    /// Creates an empty chaser lane
    pub fn chaser(name: impl Into<String>) -> Self {
        Self {
            kind: TrackKind::Chaser,
            name: name.into(),
            scene_id: None,
            placements: Vec::new(),
        }
    }

    /// Creates an empty lane for a scene
    pub fn scene(name: impl Into<String>, scene_id: u32) -> Self {
        Self {
            kind: TrackKind::Scene,
            name: name.into(),
            scene_id: Some(scene_id),
            placements: Vec::new(),
        }
    }

    /// Returns the existing placements that overlap `placement`
    pub fn overlapping(&self, placement: &Placement) -> impl Iterator<Item = &Placement> + '_ {
        let placement = *placement;
        self.placements.iter().filter(move |p| p.overlaps(&placement))
    }
}

/// A generated function that triggers several functions together
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Collection {
    pub id: u32,
    pub name: String,
    /// Underlying function IDs, sorted ascending
    pub function_ids: Vec<u32>,
}

impl Collection {
    /// Creates a collection, sorting the member IDs
    pub fn new(id: u32, name: impl Into<String>, mut function_ids: Vec<u32>) -> Self {
        function_ids.sort_unstable();
        Self {
            id,
            name: name.into(),
            function_ids,
        }
    }

    /// Checks whether this collection groups exactly `sorted_ids`
    pub fn groups(&self, sorted_ids: &[u32]) -> bool {
        self.function_ids == sorted_ids
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_placement_overlap() {
        let a = Placement::new(0, 5_000, 1);
        let b = Placement::new(4_999, 10, 2);
        let c = Placement::new(5_000, 10, 3);

        assert!(a.overlaps(&b));
        assert!(!a.overlaps(&c));
        assert_eq!(a.end_ms(), 5_000);
    }

    #[test]
    fn test_collection_sorts_members() {
        let collection = Collection::new(12, "A / B", vec![9, 3, 5]);
        assert_eq!(collection.function_ids, vec![3, 5, 9]);
        assert!(collection.groups(&[3, 5, 9]));
        assert!(!collection.groups(&[3, 5]));
    }

    #[test]
    fn test_track_overlapping() {
        let mut track = Track::scene("Wash", 4);
        track.placements.push(Placement::new(0, 1_000, 10));
        track.placements.push(Placement::new(2_000, 1_000, 11));

        let hits: Vec<_> = track.overlapping(&Placement::new(500, 2_000, 12)).collect();
        assert_eq!(hits.len(), 2);
        assert_eq!(track.scene_id, Some(4));
    }
}
