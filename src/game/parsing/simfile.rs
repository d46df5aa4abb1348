//! Simfile-style chart text: `#TAG:value;` headers plus one or more
//! `#NOTES:` entries whose data field is a comma-separated list of
//! measures, each a stack of fixed-width rows (one column per lane).

use crate::game::chart::{BpmChange, Chart, Lane, Note, NoteDivision};
use crate::game::timing::TempoMap;
use log::{info, warn};
use rustc_hash::FxHashMap;
use std::fmt::Write as _;
use thiserror::Error;

/// The only step type this engine plays.
pub const STEP_TYPE: &str = "dance-single";

const MAX_SUPPORTED_BPM: i64 = 1000;
const BEATS_PER_MEASURE: f64 = 4.0;

/// Characters that count as a tap note in a row. Hold bodies, tails, mines
/// and any future glyphs are ignored.
const TAP_CHARS: [u8; 3] = [b'1', b'2', b'4'];

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Difficulty {
    Beginner,
    Easy,
    Medium,
    Hard,
    Challenge,
}

impl Difficulty {
    pub fn as_str(self) -> &'static str {
        match self {
            Difficulty::Beginner => "Beginner",
            Difficulty::Easy => "Easy",
            Difficulty::Medium => "Medium",
            Difficulty::Hard => "Hard",
            Difficulty::Challenge => "Challenge",
        }
    }

    pub fn from_name(name: &str) -> Option<Difficulty> {
        let all = [
            Difficulty::Beginner,
            Difficulty::Easy,
            Difficulty::Medium,
            Difficulty::Hard,
            Difficulty::Challenge,
        ];
        all.into_iter()
            .find(|d| d.as_str().eq_ignore_ascii_case(name.trim()))
    }
}

/// Parse-time failures. All of these are fatal to starting a session;
/// there is no partial chart.
#[derive(Debug, Error)]
pub enum SimfileError {
    #[error("no #NOTES section found in simfile")]
    MissingNotes,
    #[error("#BPMS tag contained no usable beat=bpm entries: {0:?}")]
    UnparsableBpms(String),
    #[error("base bpm {0} out of range (must be 1..={MAX_SUPPORTED_BPM})")]
    BpmOutOfRange(i64),
}

/// Decodes chart text into a `Chart` for the requested difficulty.
///
/// Duplicate header tags resolve first-occurrence-wins. When the requested
/// difficulty has no exact `dance-single` entry the parser falls back to
/// the first `dance-single` entry, then to the first entry of any step
/// type; the fallback is logged, never silent.
pub fn parse_simfile(text: &str, difficulty: Difficulty) -> Result<Chart, SimfileError> {
    let header = scan_tags(text);

    let music_file = header.tag("music").unwrap_or("").to_string();
    let offset_sec = match header.tag("offset") {
        None | Some("") => 0.0,
        Some(raw) => raw.trim().parse::<f64>().unwrap_or_else(|_| {
            warn!("Unparsable #OFFSET {:?}; defaulting to 0", raw);
            0.0
        }),
    };

    let authored_bpms = match header.tag("bpms") {
        None => Vec::new(),
        Some(raw) if raw.trim().is_empty() => Vec::new(),
        Some(raw) => {
            let changes = parse_bpm_list(raw);
            if changes.is_empty() {
                return Err(SimfileError::UnparsableBpms(raw.to_string()));
            }
            changes
        }
    };

    let tempo = TempoMap::new(&authored_bpms);
    let first_bpm = tempo.changes()[0].bpm;
    let base_bpm = first_bpm.round() as i64;
    if base_bpm <= 0 || base_bpm > MAX_SUPPORTED_BPM {
        return Err(SimfileError::BpmOutOfRange(base_bpm));
    }

    let data = select_notes_entry(&header.notes_entries, difficulty)?;
    let mut notes = parse_note_grid(data, &tempo);
    notes.sort_by(|a, b| a.time_sec.total_cmp(&b.time_sec));

    info!(
        "Parsed chart: music={:?}, base_bpm={}, offset={:.3}, notes={}, tempo_segments={}",
        music_file,
        base_bpm,
        offset_sec,
        notes.len(),
        tempo.changes().len()
    );

    Ok(Chart {
        music_file,
        base_bpm: base_bpm as u32,
        offset_sec,
        notes,
        bpm_changes: tempo.changes().to_vec(),
    })
}

struct Header<'a> {
    /// Lowercased tag name -> first value seen.
    tags: FxHashMap<String, &'a str>,
    /// Every `#NOTES` value, in file order.
    notes_entries: Vec<&'a str>,
}

impl<'a> Header<'a> {
    fn tag(&self, name: &str) -> Option<&'a str> {
        self.tags.get(name).copied()
    }
}

/// Linear `#TAG:value;` scan. Values may span lines (the `#NOTES` data
/// block does); only the terminating semicolon ends a value.
fn scan_tags(text: &str) -> Header<'_> {
    let mut tags: FxHashMap<String, &str> = FxHashMap::default();
    let mut notes_entries = Vec::new();

    let mut index = 0;
    while index < text.len() {
        let Some(hash) = text[index..].find('#').map(|i| index + i) else {
            break;
        };
        let Some(colon) = text[hash + 1..].find(':').map(|i| hash + 1 + i) else {
            break;
        };
        let Some(semicolon) = text[colon + 1..].find(';').map(|i| colon + 1 + i) else {
            break;
        };

        let name = text[hash + 1..colon].trim();
        let value = &text[colon + 1..semicolon];
        if name.eq_ignore_ascii_case("notes") {
            notes_entries.push(value);
        } else if !name.is_empty() {
            // First occurrence wins for duplicate tags.
            tags.entry(name.to_ascii_lowercase()).or_insert(value);
        }
        index = semicolon + 1;
    }

    Header { tags, notes_entries }
}

/// `beat=bpm` comma list. Malformed or non-positive entries are skipped.
fn parse_bpm_list(raw: &str) -> Vec<BpmChange> {
    let mut out = Vec::new();
    for part in raw.split(',') {
        let part = part.trim();
        if part.is_empty() {
            continue;
        }
        let Some((beat_str, bpm_str)) = part.split_once('=') else {
            continue;
        };
        let Ok(beat) = beat_str.trim().parse::<f64>() else {
            continue;
        };
        let Ok(bpm) = bpm_str.trim().parse::<f64>() else {
            continue;
        };
        if bpm <= 0.0 {
            continue;
        }
        out.push(BpmChange { beat, bpm });
    }
    out
}

/// One `#NOTES` value split into its colon-separated fields.
struct NotesEntry<'a> {
    step_type: &'a str,
    difficulty: &'a str,
    data: &'a str,
}

fn split_notes_entry(value: &str) -> Option<NotesEntry<'_>> {
    let mut parts = value.splitn(6, ':');
    let step_type = parts.next()?.trim();
    let _author = parts.next()?;
    let difficulty = parts.next()?.trim();
    let _meter = parts.next()?;
    let _groove = parts.next()?;
    let data = parts.next()?;
    Some(NotesEntry { step_type, difficulty, data })
}

fn select_notes_entry<'a>(
    entries: &[&'a str],
    difficulty: Difficulty,
) -> Result<&'a str, SimfileError> {
    if entries.is_empty() {
        return Err(SimfileError::MissingNotes);
    }

    let parsed: Vec<NotesEntry<'_>> = entries
        .iter()
        .filter_map(|value| split_notes_entry(value))
        .collect();

    if let Some(entry) = parsed.iter().find(|e| {
        e.step_type.eq_ignore_ascii_case(STEP_TYPE)
            && e.difficulty.eq_ignore_ascii_case(difficulty.as_str())
    }) {
        return Ok(entry.data);
    }

    // Explicit fallback, not silent data loss: first compatible step type,
    // then first entry of any kind.
    if let Some(entry) = parsed
        .iter()
        .find(|e| e.step_type.eq_ignore_ascii_case(STEP_TYPE))
    {
        warn!(
            "No {} {:?} chart; falling back to {} {:?}",
            STEP_TYPE,
            difficulty.as_str(),
            STEP_TYPE,
            entry.difficulty
        );
        return Ok(entry.data);
    }
    if let Some(entry) = parsed.first() {
        warn!(
            "No {} chart at all; falling back to step type {:?} ({:?})",
            STEP_TYPE, entry.step_type, entry.difficulty
        );
        return Ok(entry.data);
    }

    Err(SimfileError::MissingNotes)
}

/// Expands measure/row text into beat-positioned notes. A measure with R
/// rows subdivides its 4 beats into R equal steps.
fn parse_note_grid(data: &str, tempo: &TempoMap) -> Vec<Note> {
    let mut notes = Vec::with_capacity(1024);

    for (measure_index, measure) in data.split(',').enumerate() {
        let rows: Vec<&str> = measure
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && !line.starts_with("//"))
            .collect();
        if rows.is_empty() {
            continue;
        }

        let row_count = rows.len();
        for (row_index, row) in rows.iter().enumerate() {
            for (lane_index, glyph) in row.bytes().take(4).enumerate() {
                if !TAP_CHARS.contains(&glyph) {
                    continue;
                }
                // Lane index < 4 by the take() above.
                let lane = Lane::from_index(lane_index).unwrap();
                let beat = measure_index as f64 * BEATS_PER_MEASURE
                    + (row_index as f64 / row_count as f64) * BEATS_PER_MEASURE;
                notes.push(Note {
                    time_sec: tempo.beat_to_seconds(beat),
                    beat,
                    lane,
                    division: NoteDivision::from_beat(beat),
                });
            }
        }
    }

    notes
}

/// Serializes chart metadata plus a measure grid back into the same
/// grammar `parse_simfile` reads. Always emits exactly one `#NOTES`
/// entry. `measures` holds one row-string stack per measure.
pub fn write_simfile(
    music_file: &str,
    offset_sec: f64,
    bpm_changes: &[BpmChange],
    measures: &[Vec<String>],
) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "#MUSIC:{music_file};");
    let _ = writeln!(out, "#OFFSET:{offset_sec:.3};");

    let mut bpms = String::new();
    for (i, change) in bpm_changes.iter().enumerate() {
        if i > 0 {
            bpms.push(',');
        }
        let _ = write!(bpms, "{:.3}={:.3}", change.beat, change.bpm);
    }
    let _ = writeln!(out, "#BPMS:{bpms};");

    out.push_str("#NOTES:\n");
    let _ = writeln!(out, "     {STEP_TYPE}:");
    out.push_str("     gridsync:\n");
    out.push_str("     Edit:\n");
    out.push_str("     1:\n");
    out.push_str("     0.000:\n");
    for (i, rows) in measures.iter().enumerate() {
        if i > 0 {
            out.push_str(",\n");
        }
        for row in rows {
            out.push_str(row);
            out.push('\n');
        }
    }
    out.push_str(";\n");
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::chart::Lane;

    const BASIC: &str = "\
#TITLE:Test Track;
#MUSIC:test.ogg;
#OFFSET:0.050;
#BPMS:0.000=120.000;
#NOTES:
     dance-single:
     author:
     Hard:
     7:
     0.000:
1000
0100
0010
0001
,
1001
0000
0110
0000
;
";

    #[test]
    fn parses_tags_notes_and_beats() {
        let chart = parse_simfile(BASIC, Difficulty::Hard).unwrap();
        assert_eq!(chart.music_file, "test.ogg");
        assert_eq!(chart.base_bpm, 120);
        assert!((chart.offset_sec - 0.05).abs() < 1e-12);
        assert_eq!(chart.note_count(), 8);

        // 4-row measure: one note per beat, half a second apart at 120.
        assert_eq!(chart.notes[0].lane, Lane::Left);
        assert_eq!(chart.notes[0].beat, 0.0);
        assert!((chart.notes[1].time_sec - 0.5).abs() < 1e-12);
        assert_eq!(chart.notes[3].lane, Lane::Right);

        // Second measure starts at beat 4 = 2.0s; its jump row has two
        // notes at the same time.
        assert!((chart.notes[4].time_sec - 2.0).abs() < 1e-12);
        assert!((chart.notes[5].time_sec - 2.0).abs() < 1e-12);
    }

    #[test]
    fn notes_are_globally_time_sorted() {
        let chart = parse_simfile(BASIC, Difficulty::Hard).unwrap();
        for pair in chart.notes.windows(2) {
            assert!(pair[0].time_sec <= pair[1].time_sec);
        }
    }

    #[test]
    fn missing_notes_section_is_malformed() {
        let text = "#MUSIC:test.ogg;\n#BPMS:0=120;\n";
        assert!(matches!(
            parse_simfile(text, Difficulty::Hard),
            Err(SimfileError::MissingNotes)
        ));
    }

    #[test]
    fn missing_bpms_defaults_to_120() {
        let text = "#MUSIC:x.ogg;\n#NOTES:dance-single:a:Easy:1:0:1000;\n";
        let chart = parse_simfile(text, Difficulty::Easy).unwrap();
        assert_eq!(chart.base_bpm, 120);
        assert_eq!(chart.bpm_changes.len(), 1);
    }

    #[test]
    fn garbage_bpms_tag_is_malformed() {
        let text = "#BPMS:nonsense;\n#NOTES:dance-single:a:Easy:1:0:1000;\n";
        assert!(matches!(
            parse_simfile(text, Difficulty::Easy),
            Err(SimfileError::UnparsableBpms(_))
        ));
    }

    #[test]
    fn out_of_range_bpm_is_rejected() {
        let text = "#BPMS:0=4000;\n#NOTES:dance-single:a:Easy:1:0:1000;\n";
        assert!(matches!(
            parse_simfile(text, Difficulty::Easy),
            Err(SimfileError::BpmOutOfRange(4000))
        ));
    }

    #[test]
    fn first_occurrence_wins_for_duplicate_tags() {
        let text = "\
#OFFSET:0.100;
#OFFSET:9.000;
#NOTES:dance-single:a:Easy:1:0:1000;
";
        let chart = parse_simfile(text, Difficulty::Easy).unwrap();
        assert!((chart.offset_sec - 0.1).abs() < 1e-12);
    }

    #[test]
    fn falls_back_to_first_dance_single_on_missing_difficulty() {
        let chart = parse_simfile(BASIC, Difficulty::Challenge).unwrap();
        assert_eq!(chart.note_count(), 8);
    }

    #[test]
    fn falls_back_to_any_step_type_when_no_dance_single() {
        let text = "#NOTES:dance-double:a:Easy:1:0:10000000;\n";
        let chart = parse_simfile(text, Difficulty::Easy).unwrap();
        // Only the first four columns are read.
        assert_eq!(chart.note_count(), 1);
        assert_eq!(chart.notes[0].lane, Lane::Left);
    }

    #[test]
    fn tempo_change_shifts_later_measures() {
        let text = "\
#BPMS:0.000=120.000,4.000=240.000;
#NOTES:
     dance-single:
     a:
     Hard:
     1:
     0.000:
1000
,
1000
,
1000
;
";
        let chart = parse_simfile(text, Difficulty::Hard).unwrap();
        assert_eq!(chart.note_count(), 3);
        assert!((chart.notes[0].time_sec - 0.0).abs() < 1e-12);
        // Beat 4 sits at the end of the 120 BPM stretch.
        assert!((chart.notes[1].time_sec - 2.0).abs() < 1e-12);
        // Beat 8 adds 4 beats at 240 BPM = 1.0s.
        assert!((chart.notes[2].time_sec - 3.0).abs() < 1e-12);
    }

    #[test]
    fn comment_rows_and_blank_lines_are_ignored() {
        let text = "\
#NOTES:
     dance-single:
     a:
     Easy:
     1:
     0.000:
// measure 0
1000

0100
;
";
        let chart = parse_simfile(text, Difficulty::Easy).unwrap();
        assert_eq!(chart.note_count(), 2);
        // Two real rows: the second sits half a measure in.
        assert_eq!(chart.notes[1].beat, 2.0);
    }

    #[test]
    fn hold_tails_and_mines_are_not_taps() {
        let text = "#NOTES:dance-single:a:Easy:1:0:13M0;\n";
        let chart = parse_simfile(text, Difficulty::Easy).unwrap();
        assert_eq!(chart.note_count(), 1);
    }

    #[test]
    fn writer_output_reparses() {
        let measures = vec![
            vec!["1000".to_string(), "0100".to_string()],
            vec!["0000".to_string(), "0011".to_string()],
        ];
        let bpms = [BpmChange { beat: 0.0, bpm: 150.0 }];
        let text = write_simfile("out.ogg", 0.025, &bpms, &measures);
        let chart = parse_simfile(&text, Difficulty::Challenge).unwrap();
        assert_eq!(chart.music_file, "out.ogg");
        assert_eq!(chart.base_bpm, 150);
        assert_eq!(chart.note_count(), 4);
    }
}
