//! Cue-sheet row parsing
//!
//! Three encodings are understood:
//!
//! * structured show rows: `timecode, fadeIn, fadeOut, functionType, functionName, duration`
//! * description show rows (tab separated): `description, start, duration`, where the
//!   description may carry `{FADE}` / `[FADE]` tags and join several functions with `" + "`
//! * cue-list rows: `name, fadeIn, func1Type, func1Name, func2Type, func2Name, func3Type, func3Name`
//!
//! Every encoding skips the header row. Malformed rows become [`RowError`]s and
//! reading continues with the next row.

use crate::{Result, RowError, RowErrorKind};
use csv::{ReaderBuilder, StringRecord, Trim};
use qlccue_core::{timecode, FadeLabel, FunctionCatalog, FunctionKind, TimelineEvent};
use std::io::Read;
use std::path::Path;

/// Separator between functions in a description
const COMPOUND_SEPARATOR: &str = " + ";

/// Layout of a show cue sheet
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SheetFormat {
    /// Comma separated, one column per field
    #[default]
    Structured,
    /// Tab separated free-text descriptions
    Description,
}

impl SheetFormat {
    /// Picks the layout from a cue file extension: `.tsv` and `.txt` hold descriptions
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("tsv") || ext.eq_ignore_ascii_case("txt") => {
                SheetFormat::Description
            }
            _ => SheetFormat::Structured,
        }
    }

    fn delimiter(&self) -> u8 {
        match self {
            SheetFormat::Structured => b',',
            SheetFormat::Description => b'\t',
        }
    }
}

/// The events read from one show row
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedRow {
    pub line: u64,
    pub events: Vec<TimelineEvent>,
}

/// One cue-list row
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CueRow {
    pub line: u64,
    pub name: String,
    pub fade_in: FadeLabel,
    /// Referenced functions, in column order
    pub functions: Vec<(FunctionKind, String)>,
}

/// Converts raw cue-sheet records into typed rows
pub struct RowNormalizer<'a> {
    catalog: &'a FunctionCatalog,
}

impl<'a> RowNormalizer<'a> {
    /// Creates a normalizer resolving description names against `catalog`
    pub fn new(catalog: &'a FunctionCatalog) -> Self {
        Self { catalog }
    }

    /// Reads every row of a show cue sheet
    pub fn show_rows<R: Read>(
        &self,
        reader: R,
        format: SheetFormat,
    ) -> Result<Vec<std::result::Result<NormalizedRow, RowError>>> {
        Ok(read_records(reader, format.delimiter())?
            .into_iter()
            .map(|(line, record)| {
                let events = record.and_then(|record| match format {
                    SheetFormat::Structured => self.structured(&record),
                    SheetFormat::Description => self.description(&record),
                });
                events
                    .map(|events| NormalizedRow { line, events })
                    .map_err(|kind| RowError::new(line, kind))
            })
            .collect())
    }

    /// Reads every row of a cue-list sheet
    pub fn cue_rows<R: Read>(
        &self,
        reader: R,
    ) -> Result<Vec<std::result::Result<CueRow, RowError>>> {
        Ok(read_records(reader, b',')?
            .into_iter()
            .map(|(line, record)| {
                record
                    .and_then(|record| cue_row(line, &record))
                    .map_err(|kind| RowError::new(line, kind))
            })
            .collect())
    }

    fn structured(&self, record: &StringRecord) -> std::result::Result<Vec<TimelineEvent>, RowErrorKind> {
        require_columns(record, 5)?;

        let timecode = field(record, 0).to_string();
        timecode::decode(&timecode)?;
        let fade_in: FadeLabel = field(record, 1).parse()?;
        let fade_out: FadeLabel = field(record, 2).parse()?;
        let function_kind: FunctionKind = field(record, 3).parse()?;

        Ok(vec![TimelineEvent {
            timecode,
            fade_in_ms: fade_in.ms(),
            fade_out_ms: fade_out.ms(),
            function_kind,
            function_name: field(record, 4).to_string(),
            duration: optional(field(record, 5)),
        }])
    }

    fn description(&self, record: &StringRecord) -> std::result::Result<Vec<TimelineEvent>, RowErrorKind> {
        require_columns(record, 2)?;

        let start = field(record, 1).to_string();
        timecode::decode(&start)?;
        let duration = optional(field(record, 2));

        // Each joined entry is parsed on its own
        field(record, 0)
            .split(COMPOUND_SEPARATOR)
            .map(|entry| -> std::result::Result<TimelineEvent, RowErrorKind> {
                let tagged = split_fade_tags(entry)?;
                let function_kind = self.resolve_kind(&tagged.name)?;
                Ok(TimelineEvent {
                    timecode: start.clone(),
                    fade_in_ms: tagged.fade_in.ms(),
                    fade_out_ms: tagged.fade_out.ms(),
                    function_kind,
                    function_name: tagged.name,
                    duration: duration.clone(),
                })
            })
            .collect()
    }

    /// Finds the single kind a bare function name belongs to
    fn resolve_kind(&self, name: &str) -> std::result::Result<FunctionKind, RowErrorKind> {
        match self.catalog.find_by_name(name).as_slice() {
            [] => Err(RowErrorKind::NoSuchFunction(name.to_string())),
            [entry] => Ok(entry.kind),
            entries => Err(RowErrorKind::AmbiguousFunction {
                name: name.to_string(),
                kinds: entries
                    .iter()
                    .map(|entry| entry.kind.as_str())
                    .collect::<Vec<_>>()
                    .join(", "),
            }),
        }
    }
}

/// A description entry with its fade tags removed
#[derive(Debug, PartialEq, Eq)]
struct TaggedEntry {
    name: String,
    fade_in: FadeLabel,
    fade_out: FadeLabel,
}

/// Strips `{FADE}` (fade in) and `[FADE]` (fade out) tags from an entry.
/// Missing tags mean no fade; an unterminated tag is left in the name.
fn split_fade_tags(entry: &str) -> std::result::Result<TaggedEntry, RowErrorKind> {
    let mut name = String::with_capacity(entry.len());
    let mut fade_in = FadeLabel::None;
    let mut fade_out = FadeLabel::None;
    let mut rest = entry;

    while let Some(open) = rest.find(|c: char| c == '{' || c == '[') {
        let is_fade_in = rest[open..].starts_with('{');
        let close = if is_fade_in { '}' } else { ']' };
        let Some(len) = rest[open + 1..].find(close) else {
            break;
        };

        name.push_str(&rest[..open]);
        let label: FadeLabel = rest[open + 1..open + 1 + len].parse()?;
        if is_fade_in {
            fade_in = label;
        } else {
            fade_out = label;
        }
        rest = &rest[open + len + 2..];
    }
    name.push_str(rest);

    Ok(TaggedEntry {
        name: name.trim().to_string(),
        fade_in,
        fade_out,
    })
}

fn cue_row(line: u64, record: &StringRecord) -> std::result::Result<CueRow, RowErrorKind> {
    require_columns(record, 3)?;

    let name = field(record, 0).to_string();
    let fade_in: FadeLabel = field(record, 1).parse()?;

    if field(record, 2).is_empty() {
        return Err(RowErrorKind::NoActions(name));
    }

    let mut functions: Vec<(FunctionKind, String)> = Vec::with_capacity(3);
    for slot in 0..3 {
        let kind = field(record, 2 + slot * 2);
        if kind.is_empty() {
            continue;
        }
        functions.push((kind.parse::<FunctionKind>()?, field(record, 3 + slot * 2).to_string()));
    }

    Ok(CueRow {
        line,
        name,
        fade_in,
        functions,
    })
}

/// A record that may have failed to decode as UTF-8
type DecodedRecord = std::result::Result<StringRecord, RowErrorKind>;

/// Reads all records after the header, paired with their line numbers.
/// Records are decoded one by one so a bad byte only rejects its own row.
fn read_records<R: Read>(reader: R, delimiter: u8) -> Result<Vec<(u64, DecodedRecord)>> {
    let mut csv_reader = ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(true)
        .flexible(true)
        .trim(Trim::All)
        .from_reader(reader);

    let mut records = Vec::new();
    for record in csv_reader.byte_records() {
        let record = record?;
        let line = record.position().map_or(0, |position| position.line());
        let decoded = StringRecord::from_byte_record(record).map_err(|e| {
            RowErrorKind::InvalidUtf8 {
                column: e.utf8_error().field() + 1,
            }
        });
        records.push((line, decoded));
    }

    tracing::debug!(rows = records.len(), "Read cue sheet");
    Ok(records)
}

fn require_columns(record: &StringRecord, expected: usize) -> std::result::Result<(), RowErrorKind> {
    if record.len() < expected {
        return Err(RowErrorKind::MissingColumns {
            expected,
            found: record.len(),
        });
    }
    Ok(())
}

fn field(record: &StringRecord, index: usize) -> &str {
    record.get(index).unwrap_or("")
}

fn optional(value: &str) -> Option<String> {
    (!value.is_empty()).then(|| value.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    const WORKSPACE: &str = r#"<Workspace><Engine>
        <Function ID="1" Type="Scene" Name="Blue Wash"/>
        <Function ID="2" Type="Chaser" Name="Sparkle"><RunOrder>Loop</RunOrder></Function>
        <Function ID="3" Type="Scene" Name="Red"/>
        <Function ID="4" Type="Chaser" Name="Red"/>
    </Engine></Workspace>"#;

    fn catalog() -> FunctionCatalog {
        FunctionCatalog::from_xml(WORKSPACE).unwrap()
    }

    #[test]
    fn test_structured_rows() {
        let catalog = catalog();
        let sheet = "Timecode,Fade In,Fade Out,Type,Name,Duration\n\
                     00:10.000,QUICK,SLOW,scene,Blue Wash,00:05.000\n\
                     00:12.500, none , MEDIUM ,CHASER,Sparkle,\n";

        let rows = RowNormalizer::new(&catalog)
            .show_rows(sheet.as_bytes(), SheetFormat::Structured)
            .unwrap();

        assert_eq!(rows.len(), 2);
        let first = rows[0].as_ref().unwrap();
        assert_eq!(first.line, 2);
        assert_eq!(
            first.events,
            vec![TimelineEvent {
                timecode: "00:10.000".to_string(),
                fade_in_ms: 500,
                fade_out_ms: 3000,
                function_kind: FunctionKind::Scene,
                function_name: "Blue Wash".to_string(),
                duration: Some("00:05.000".to_string()),
            }]
        );

        let second = rows[1].as_ref().unwrap();
        assert_eq!(second.line, 3);
        assert_eq!(second.events[0].function_kind, FunctionKind::Chaser);
        assert_eq!(second.events[0].fade_out_ms, 1750);
        assert_eq!(second.events[0].duration, None);
    }

    #[test]
    fn test_structured_row_errors_are_collected() {
        let catalog = catalog();
        let sheet = "Timecode,Fade In,Fade Out,Type,Name,Duration\n\
                     0:10.000,QUICK,SLOW,Scene,Blue Wash,00:05.000\n\
                     00:10.000,FAST,SLOW,Scene,Blue Wash,00:05.000\n\
                     00:10.000,QUICK,SLOW,Strobe,Blue Wash,00:05.000\n\
                     00:10.000,QUICK\n\
                     00:11.000,QUICK,SLOW,Scene,Blue Wash,00:05.000\n";

        let rows = RowNormalizer::new(&catalog)
            .show_rows(sheet.as_bytes(), SheetFormat::Structured)
            .unwrap();

        let errors: Vec<_> = rows.iter().filter_map(|row| row.as_ref().err()).collect();
        assert_eq!(
            errors,
            vec![
                &RowError::new(2, RowErrorKind::InvalidTimecode("0:10.000".to_string())),
                &RowError::new(3, RowErrorKind::UnknownFade("FAST".to_string())),
                &RowError::new(4, RowErrorKind::UnknownFunctionKind("Strobe".to_string())),
                &RowError::new(5, RowErrorKind::MissingColumns { expected: 5, found: 2 }),
            ]
        );
        assert!(rows[4].is_ok());
    }

    #[test]
    fn test_undecodable_row_is_skipped() {
        let catalog = catalog();
        let mut sheet = b"Timecode,Fade In,Fade Out,Type,Name,Duration\n\
                          00:10.000,FAST,SLOW,Scene,Blue Wash,00:05.000\n\
                          00:11.000,QUICK,SLOW,Scene,Blue "
            .to_vec();
        sheet.push(0xff);
        sheet.extend_from_slice(b" Wash,00:05.000\n00:12.000,QUICK,SLOW,Scene,Blue Wash,00:05.000\n");

        let rows = RowNormalizer::new(&catalog)
            .show_rows(sheet.as_slice(), SheetFormat::Structured)
            .unwrap();

        assert_eq!(rows.len(), 3);
        assert_eq!(
            rows[0],
            Err(RowError::new(2, RowErrorKind::UnknownFade("FAST".to_string())))
        );
        assert_eq!(
            rows[1],
            Err(RowError::new(3, RowErrorKind::InvalidUtf8 { column: 5 }))
        );
        assert_eq!(rows[2].as_ref().map(|row| row.line), Ok(4));
    }

    #[test]
    fn test_description_rows_with_tags_and_compounds() {
        let catalog = catalog();
        let sheet = "Description\tStart\tDuration\n\
                     Blue Wash {SLOW}[QUICK] + Sparkle [LONG]\t00:01.000\t00:04.000\n\
                     Sparkle\t00:09.000\t\n";

        let rows = RowNormalizer::new(&catalog)
            .show_rows(sheet.as_bytes(), SheetFormat::Description)
            .unwrap();

        let first = rows[0].as_ref().unwrap();
        assert_eq!(first.events.len(), 2);
        assert_eq!(first.events[0].function_name, "Blue Wash");
        assert_eq!(first.events[0].function_kind, FunctionKind::Scene);
        assert_eq!(first.events[0].fade_in_ms, 3000);
        assert_eq!(first.events[0].fade_out_ms, 500);
        assert_eq!(first.events[1].function_name, "Sparkle");
        assert_eq!(first.events[1].function_kind, FunctionKind::Chaser);
        assert_eq!(first.events[1].fade_in_ms, 0);
        assert_eq!(first.events[1].fade_out_ms, 5000);
        assert!(first
            .events
            .iter()
            .all(|e| e.timecode == "00:01.000" && e.duration.as_deref() == Some("00:04.000")));

        let second = rows[1].as_ref().unwrap();
        assert_eq!(second.events[0].duration, None);
    }

    #[test]
    fn test_description_lookup_failures() {
        let catalog = catalog();
        let sheet = "Description\tStart\tDuration\n\
                     Red\t00:01.000\t00:04.000\n\
                     Green\t00:01.000\t00:04.000\n\
                     Bogus {WHOOSH} + Sparkle\t00:01.000\t00:04.000\n\
                     Sparkle + Green\t00:01.000\t00:04.000\n";

        let rows = RowNormalizer::new(&catalog)
            .show_rows(sheet.as_bytes(), SheetFormat::Description)
            .unwrap();

        assert_eq!(
            rows[0],
            Err(RowError::new(
                2,
                RowErrorKind::AmbiguousFunction {
                    name: "Red".to_string(),
                    kinds: "Scene, Chaser".to_string(),
                }
            ))
        );
        assert_eq!(
            rows[1],
            Err(RowError::new(3, RowErrorKind::NoSuchFunction("Green".to_string())))
        );
        assert_eq!(
            rows[2],
            Err(RowError::new(4, RowErrorKind::UnknownFade("WHOOSH".to_string())))
        );
        // The second entry is looked up independently of the first
        assert_eq!(
            rows[3],
            Err(RowError::new(5, RowErrorKind::NoSuchFunction("Green".to_string())))
        );
    }

    #[test]
    fn test_split_fade_tags() {
        assert_eq!(
            split_fade_tags("  Blue Wash [SLOW] {quick} ").unwrap(),
            TaggedEntry {
                name: "Blue Wash".to_string(),
                fade_in: FadeLabel::Quick,
                fade_out: FadeLabel::Slow,
            }
        );
        assert_eq!(split_fade_tags("Odd {name").unwrap().name, "Odd {name");
    }

    #[test]
    fn test_cue_rows() {
        let catalog = catalog();
        let sheet = "Cue,Fade,Type 1,Name 1,Type 2,Name 2,Type 3,Name 3\n\
                     Intro,SLOW,Scene,Blue Wash,,,,\n\
                     Build,QUICK,scene,Red,Chaser,Sparkle\n\
                     Empty,NONE,,,,,,\n";

        let rows = RowNormalizer::new(&catalog).cue_rows(sheet.as_bytes()).unwrap();

        assert_eq!(
            rows[0],
            Ok(CueRow {
                line: 2,
                name: "Intro".to_string(),
                fade_in: FadeLabel::Slow,
                functions: vec![(FunctionKind::Scene, "Blue Wash".to_string())],
            })
        );
        assert_eq!(rows[1].as_ref().unwrap().functions.len(), 2);
        assert_eq!(
            rows[2],
            Err(RowError::new(4, RowErrorKind::NoActions("Empty".to_string())))
        );
    }

    #[test]
    fn test_format_from_path() {
        assert_eq!(SheetFormat::from_path(Path::new("show.tsv")), SheetFormat::Description);
        assert_eq!(SheetFormat::from_path(Path::new("show.TXT")), SheetFormat::Description);
        assert_eq!(SheetFormat::from_path(Path::new("show.csv")), SheetFormat::Structured);
        assert_eq!(SheetFormat::from_path(Path::new("show")), SheetFormat::Structured);
    }
}
