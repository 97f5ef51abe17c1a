//! QLC+ workspace fragment construction and rendering

use crate::audio::ShowAudio;
use crate::compiler::ShowTimeline;
use crate::cue_list::CueList;
use crate::{CompilerConfig, Result};
use qlccue_core::{Collection, FunctionInstance, Track};
use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use std::io::Write;

/// Comment opening every generated fragment
pub const START_MARKER: &str =
    " START OF AUTO GENERATED XML FROM QLCCUE (DO NOT COPY ROOT ELEMENT ABOVE) ";
/// Comment closing every generated fragment
pub const END_MARKER: &str =
    " END OF AUTO GENERATED XML FROM QLCCUE (DO NOT COPY ROOT ELEMENT BELOW) ";

/// Speed a master cue list runs at: QLC+'s "infinite" duration
const INFINITE_DURATION: u64 = 4_294_967_294;

/// A node of the generated document
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Element(Element),
    Text(String),
    Comment(String),
}

/// An XML element with ordered attributes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    pub name: String,
    pub attributes: Vec<(String, String)>,
    pub children: Vec<Node>,
}

impl Element {
    /// Creates an element without attributes or children
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attributes: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Adds an attribute
    pub fn attr(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.attributes.push((key.into(), value.to_string()));
        self
    }

    /// Sets the text content
    pub fn text(mut self, text: impl ToString) -> Self {
        self.children.push(Node::Text(text.to_string()));
        self
    }

    /// Adds a child element
    pub fn child(mut self, child: Element) -> Self {
        self.children.push(Node::Element(child));
        self
    }

    /// Appends a child element in place
    pub fn push(&mut self, child: Element) {
        self.children.push(Node::Element(child));
    }

    /// Returns an attribute value
    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Iterates over the child elements
    pub fn elements(&self) -> impl Iterator<Item = &Element> + '_ {
        self.children.iter().filter_map(|node| match node {
            Node::Element(element) => Some(element),
            _ => None,
        })
    }

    /// Iterates over the child elements with the given name
    pub fn elements_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Element> + 'a {
        self.elements().filter(move |element| element.name == name)
    }

    /// Concatenated text children
    pub fn text_content(&self) -> String {
        self.children
            .iter()
            .filter_map(|node| match node {
                Node::Text(text) => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }

    fn write<W: Write>(&self, writer: &mut Writer<W>) -> Result<()> {
        let mut start = BytesStart::new(self.name.as_str());
        for (key, value) in &self.attributes {
            start.push_attribute((key.as_str(), value.as_str()));
        }

        if self.children.is_empty() {
            writer.write_event(Event::Empty(start))?;
            return Ok(());
        }

        writer.write_event(Event::Start(start))?;
        for node in &self.children {
            match node {
                Node::Element(element) => element.write(writer)?,
                Node::Text(text) => writer.write_event(Event::Text(BytesText::new(text)))?,
                Node::Comment(comment) => {
                    writer.write_event(Event::Comment(BytesText::from_escaped(comment.as_str())))?
                }
            }
        }
        writer.write_event(Event::End(BytesEnd::new(self.name.as_str())))?;
        Ok(())
    }
}

/// Generated elements wrapped in a `Root` element between marker comments
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fragment {
    root: Element,
}

impl Fragment {
    /// Wraps `elements` between the start and end markers
    pub fn new(elements: Vec<Element>) -> Self {
        let mut root = Element::new("Root");
        root.children.push(Node::Comment(START_MARKER.to_string()));
        root.children
            .extend(elements.into_iter().map(Node::Element));
        root.children.push(Node::Comment(END_MARKER.to_string()));
        Self { root }
    }

    /// Generated elements, without the markers
    pub fn elements(&self) -> impl Iterator<Item = &Element> + '_ {
        self.root.elements()
    }

    /// Renders the fragment indented with tabs
    pub fn to_pretty(&self) -> Result<String> {
        let mut writer = Writer::new_with_indent(Vec::new(), b'\t', 1);
        self.root.write(&mut writer)?;
        Ok(String::from_utf8_lossy(&writer.into_inner()).into_owned())
    }

    /// Renders the fragment on a single line
    pub fn to_compact(&self) -> Result<String> {
        let mut writer = Writer::new(Vec::new());
        self.root.write(&mut writer)?;
        Ok(String::from_utf8_lossy(&writer.into_inner()).into_owned())
    }
}

/// `Speed` element values
#[derive(Debug, Clone, Copy, Default)]
struct Speed {
    fade_in: u64,
    fade_out: u64,
    duration: u64,
}

/// `SpeedModes` element values
#[derive(Debug, Clone, Copy)]
struct SpeedModes {
    fade_in: &'static str,
    fade_out: &'static str,
    duration: &'static str,
}

/// A chaser or sequence step
#[derive(Debug, Clone, Default)]
struct Step {
    number: usize,
    fade_in: u64,
    hold: u64,
    fade_out: u64,
    values: Option<u32>,
    note: Option<String>,
    function_id: u32,
}

impl Step {
    fn element(&self) -> Element {
        let mut step = Element::new("Step")
            .attr("Number", self.number)
            .attr("FadeIn", self.fade_in)
            .attr("Hold", self.hold);
        if let Some(values) = self.values {
            step = step.attr("Values", values);
        }
        if let Some(note) = &self.note {
            step = step.attr("Note", note);
        }
        step.attr("FadeOut", self.fade_out).text(self.function_id)
    }
}

/// Everything needed to write a chaser-like `Function` element
struct FunctionSpec<'a> {
    id: u32,
    kind: &'static str,
    name: String,
    path: Option<&'a str>,
    bound_scene: Option<u32>,
    speed: Speed,
    run_order: &'static str,
    speed_modes: SpeedModes,
    steps: Vec<Step>,
}

impl FunctionSpec<'_> {
    fn element(self) -> Element {
        let mut function = Element::new("Function")
            .attr("ID", self.id)
            .attr("Type", self.kind)
            .attr("Name", self.name);
        if let Some(scene) = self.bound_scene {
            function = function.attr("BoundScene", scene);
        }
        if let Some(path) = self.path {
            function = function.attr("Path", path);
        }

        let mut function = function
            .child(
                Element::new("Speed")
                    .attr("FadeIn", self.speed.fade_in)
                    .attr("FadeOut", self.speed.fade_out)
                    .attr("Duration", self.speed.duration),
            )
            .child(Element::new("Direction").text("Forward"))
            .child(Element::new("RunOrder").text(self.run_order))
            .child(
                Element::new("SpeedModes")
                    .attr("FadeIn", self.speed_modes.fade_in)
                    .attr("FadeOut", self.speed_modes.fade_out)
                    .attr("Duration", self.speed_modes.duration),
            );

        for step in &self.steps {
            function.push(step.element());
        }
        function
    }
}

/// A looping chaser that plays one catalog function for a fixed time
pub fn chaser_wrapper(instance: &FunctionInstance, name: String, show_name: &str) -> Element {
    FunctionSpec {
        id: instance.new_id,
        kind: "Chaser",
        name,
        path: Some(show_name),
        bound_scene: None,
        speed: Speed {
            fade_in: instance.fade_in_ms,
            fade_out: instance.fade_out_ms,
            duration: instance.duration_ms,
        },
        run_order: "Loop",
        speed_modes: SpeedModes {
            fade_in: "Default",
            fade_out: "Default",
            duration: "Common",
        },
        steps: vec![Step {
            function_id: instance.original_id,
            ..Default::default()
        }],
    }
    .element()
}

/// A single-shot sequence bound to a scene, holding it for the placement time
pub fn scene_wrapper(instance: &FunctionInstance, name: String, show_name: &str) -> Element {
    FunctionSpec {
        id: instance.new_id,
        kind: "Sequence",
        name,
        path: Some(show_name),
        bound_scene: Some(instance.original_id),
        speed: Speed {
            fade_in: instance.fade_in_ms,
            fade_out: instance.fade_out_ms,
            duration: 0,
        },
        run_order: "SingleShot",
        speed_modes: SpeedModes {
            fade_in: "Default",
            fade_out: "Default",
            duration: "PerStep",
        },
        steps: vec![Step {
            hold: instance.duration_ms,
            values: Some(0),
            function_id: instance.original_id,
            ..Default::default()
        }],
    }
    .element()
}

/// A generated collection; its steps list the member IDs in ascending order
pub fn collection_element(collection: &Collection) -> Element {
    let mut function = Element::new("Function")
        .attr("ID", collection.id)
        .attr("Type", "Collection")
        .attr("Name", format!("{} (Auto Generated)", collection.name));

    for (number, function_id) in collection.function_ids.iter().enumerate() {
        function.push(Element::new("Step").attr("Number", number).text(function_id));
    }
    function
}

fn track_element(id: usize, track: &Track, color: &str) -> Element {
    let mut element = Element::new("Track").attr("ID", id).attr("Name", &track.name);
    if let Some(scene_id) = track.scene_id {
        element = element.attr("SceneID", scene_id);
    }
    element = element.attr("isMute", 0);

    for placement in &track.placements {
        element.push(
            Element::new("ShowFunction")
                .attr("ID", placement.function_id)
                .attr("StartTime", placement.start_ms)
                .attr("Duration", placement.duration_ms)
                .attr("Color", color),
        );
    }
    element
}

/// The `Show` function: audio track first, then chaser tracks, then scene tracks
pub fn show_element(
    show_id: u32,
    show_name: &str,
    audio: ShowAudio,
    timeline: &ShowTimeline,
    config: &CompilerConfig,
) -> Element {
    let mut show = Element::new("Function")
        .attr("ID", show_id)
        .attr("Type", "Show")
        .attr("Name", show_name)
        .child(
            Element::new("TimeDivision")
                .attr("Type", "Time")
                .attr("BPM", 120),
        );

    show.push(
        Element::new("Track")
            .attr("ID", 0)
            .attr("Name", "Audio")
            .attr("isMute", 0)
            .child(
                Element::new("ShowFunction")
                    .attr("ID", audio.function_id)
                    .attr("StartTime", 0)
                    .attr("Duration", audio.duration_ms)
                    .attr("Color", &config.audio_color),
            ),
    );

    let tracks = timeline
        .chaser_tracks
        .values()
        .chain(timeline.scene_tracks.values());
    for (index, track) in tracks.enumerate() {
        show.push(track_element(index + 1, track, &config.placement_color));
    }
    show
}

/// Builds the show-mode fragment: wrapper functions, then the show itself
pub fn show_fragment(
    show_id: u32,
    show_name: &str,
    audio: ShowAudio,
    timeline: &ShowTimeline,
    config: &CompilerConfig,
) -> Fragment {
    let mut elements = Vec::new();

    for (name, instances) in &timeline.chaser_instances {
        for (n, instance) in instances.iter().enumerate() {
            elements.push(chaser_wrapper(instance, format!("{} {}", name, n + 1), show_name));
        }
    }
    for (name, instances) in &timeline.scene_instances {
        for (n, instance) in instances.iter().enumerate() {
            elements.push(scene_wrapper(instance, format!("{} {}", name, n + 1), show_name));
        }
    }

    elements.push(show_element(show_id, show_name, audio, timeline, config));
    Fragment::new(elements)
}

/// Builds the cue-list fragment: collections, then the master chaser
pub fn cue_list_fragment(cue_list: &CueList, master_id: u32) -> Fragment {
    let mut elements: Vec<Element> = cue_list.collections.iter().map(collection_element).collect();

    let steps = cue_list
        .cues
        .iter()
        .enumerate()
        .map(|(number, cue)| Step {
            number,
            fade_in: cue.fade_in_ms,
            hold: 0,
            fade_out: cue.fade_out_ms,
            values: None,
            note: Some(cue.name.clone()),
            function_id: cue.function_id,
        })
        .collect();

    elements.push(
        FunctionSpec {
            id: master_id,
            kind: "Chaser",
            name: "Master Cue List (Auto Generated)".to_string(),
            path: None,
            bound_scene: None,
            speed: Speed {
                fade_in: 0,
                fade_out: 0,
                duration: INFINITE_DURATION,
            },
            run_order: "Loop",
            speed_modes: SpeedModes {
                fade_in: "PerStep",
                fade_out: "PerStep",
                duration: "Common",
            },
            steps,
        }
        .element(),
    );

    Fragment::new(elements)
}
