//! G-Code line classification
//!
//! Classifies a single line of slicer output into the few kinds a tower pass
//! cares about, and extracts the Z target of moves and the set-point of
//! extruder temperature commands.
//!
//! Comments (`;` to end of line, `( ... )` spans) and trailing `*` checksums
//! are masked out before parsing. Masking replaces the comment with spaces
//! and any other non-ASCII byte with `?`, so byte offsets into the masked
//! text are also valid in the raw line and a rewrite can splice in a new
//! value without disturbing anything else. Lines need not be valid UTF-8.

use regex::Regex;
use std::ops::Range;
use std::sync::OnceLock;

/// Distance mode selected by G90/G91
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PositioningMode {
    /// Coordinates are absolute machine positions
    #[default]
    Absolute,
    /// Coordinates are offsets from the current position
    Relative,
}

/// Kind of a G-code line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineKind {
    /// Linear or arc move (G0, G1, G2, G3)
    Move,
    /// Extruder temperature set-point (M104, M109)
    TemperatureSet,
    /// Positioning mode switch (G90, G91)
    ModeSwitch(PositioningMode),
    /// Anything else, including blank and comment-only lines
    Other,
}

/// A classified G-code line
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedLine {
    /// The line without its terminator, invalid UTF-8 replaced
    pub raw: String,
    /// What the line does
    pub kind: LineKind,
    /// Z word of a move, if present and numeric
    pub z: Option<f64>,
    /// Set-point of a temperature command, if present and numeric
    pub temperature: Option<f64>,
    /// Byte range of the command word (e.g. `M104`)
    command_span: Option<Range<usize>>,
    /// Byte range of the set-point value text, possibly empty
    temperature_span: Option<Range<usize>>,
    /// The line exactly as read
    bytes: Vec<u8>,
}

/// One address letter and the text directly after it
#[derive(Debug, Clone)]
struct Word {
    letter: char,
    span: Range<usize>,
    value_span: Range<usize>,
}

fn word_regex() -> &'static Regex {
    static WORD_REGEX: OnceLock<Regex> = OnceLock::new();
    WORD_REGEX.get_or_init(|| {
        Regex::new(r"([A-Za-z])([^A-Za-z\s]*)").expect("invalid regex pattern")
    })
}

/// Classify one line of G-code
///
/// `line` must not include its terminator. Unknown commands and malformed
/// parameters never fail; they classify as [`LineKind::Other`] or leave the
/// corresponding value empty.
pub fn classify_line(line: &str) -> ParsedLine {
    ParsedLine::parse(line)
}

impl ParsedLine {
    /// Parse and classify one line of G-code
    pub fn parse(line: &str) -> Self {
        Self::parse_bytes(line.as_bytes())
    }

    /// Parse a line as read from disk, whatever its encoding
    pub fn parse_bytes(line: &[u8]) -> Self {
        let masked = mask_comments(line);
        let words = split_words(&masked);

        let mut parsed = Self {
            raw: String::from_utf8_lossy(line).into_owned(),
            kind: LineKind::Other,
            z: None,
            temperature: None,
            command_span: None,
            temperature_span: None,
            bytes: line.to_vec(),
        };

        // Skip a leading line number
        let mut rest = words.as_slice();
        if let Some(first) = rest.first() {
            if first.letter == 'N' {
                rest = &rest[1..];
            }
        }

        let Some((command, params)) = rest.split_first() else {
            return parsed;
        };
        parsed.command_span = Some(command.span.clone());

        let number = masked[command.value_span.clone()].parse::<u32>().ok();
        parsed.kind = match (command.letter, number) {
            ('G', Some(0..=3)) => LineKind::Move,
            ('G', Some(90)) => LineKind::ModeSwitch(PositioningMode::Absolute),
            ('G', Some(91)) => LineKind::ModeSwitch(PositioningMode::Relative),
            ('M', Some(104 | 109)) => LineKind::TemperatureSet,
            _ => LineKind::Other,
        };

        match parsed.kind {
            LineKind::Move => {
                if let Some(word) = params.iter().find(|w| w.letter == 'Z') {
                    parsed.z = parse_value(&masked, word);
                }
            }
            LineKind::TemperatureSet => {
                let word = params
                    .iter()
                    .find(|w| w.letter == 'S')
                    .or_else(|| params.iter().find(|w| w.letter == 'R'));
                if let Some(word) = word {
                    parsed.temperature = parse_value(&masked, word);
                    parsed.temperature_span = Some(word.value_span.clone());
                }
            }
            LineKind::ModeSwitch(_) | LineKind::Other => {}
        }

        parsed
    }

    /// Whether the line carries any command once comments are removed
    pub fn is_code(&self) -> bool {
        self.command_span.is_some()
    }

    /// The command word as written, e.g. `M104` or `g1`
    pub fn command(&self) -> Option<&str> {
        let span = self.command_span.clone()?;
        std::str::from_utf8(&self.bytes[span]).ok()
    }

    /// The line exactly as read
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Whether this temperature command waits for the set-point (M109)
    pub fn waits_for_temperature(&self) -> bool {
        self.kind == LineKind::TemperatureSet
            && self
                .command()
                .and_then(|word| word[1..].parse::<u32>().ok())
                == Some(109)
    }

    /// Rewrite the set-point of a temperature command
    ///
    /// Only the set-point digits change; everything else on the line,
    /// comments included, is preserved byte for byte. A command written
    /// without a set-point gets ` S<temperature>` after its command word.
    /// Lines of any other kind are returned unchanged.
    pub fn with_temperature(&self, temperature: i64) -> String {
        String::from_utf8_lossy(&self.with_temperature_bytes(temperature)).into_owned()
    }

    /// [`with_temperature`](Self::with_temperature) on the line as read
    pub fn with_temperature_bytes(&self, temperature: i64) -> Vec<u8> {
        if self.kind != LineKind::TemperatureSet {
            return self.bytes.clone();
        }
        let (splice_at, resume_at, value) = match (&self.temperature_span, &self.command_span) {
            (Some(span), _) => (span.start, span.end, temperature.to_string()),
            (None, Some(command)) => (command.end, command.end, format!(" S{}", temperature)),
            (None, None) => return self.bytes.clone(),
        };
        let mut line = Vec::with_capacity(self.bytes.len() + value.len());
        line.extend_from_slice(&self.bytes[..splice_at]);
        line.extend_from_slice(value.as_bytes());
        line.extend_from_slice(&self.bytes[resume_at..]);
        line
    }
}

/// Blank out comments and checksums, keeping byte offsets intact
///
/// Non-ASCII bytes outside comments become `?`, which no word treats as
/// a letter or separator, so the result is ASCII with one byte per input byte.
fn mask_comments(line: &[u8]) -> String {
    let mut in_paren = false;
    let mut masked = String::with_capacity(line.len());
    for (i, &byte) in line.iter().enumerate() {
        match byte {
            b';' | b'*' if !in_paren => {
                masked.extend(std::iter::repeat(' ').take(line.len() - i));
                break;
            }
            b'(' if !in_paren => {
                in_paren = true;
                masked.push(' ');
            }
            b')' if in_paren => {
                in_paren = false;
                masked.push(' ');
            }
            _ if in_paren => masked.push(' '),
            _ if byte.is_ascii() => masked.push(byte as char),
            _ => masked.push('?'),
        }
    }
    masked
}

fn split_words(masked: &str) -> Vec<Word> {
    word_regex()
        .captures_iter(masked)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            let letter = caps.get(1)?.as_str().chars().next()?;
            let value = caps.get(2)?;
            Some(Word {
                letter: letter.to_ascii_uppercase(),
                span: whole.range(),
                value_span: value.range(),
            })
        })
        .collect()
}

fn parse_value(masked: &str, word: &Word) -> Option<f64> {
    let text = &masked[word.value_span.clone()];
    if text.is_empty() {
        return None;
    }
    match text.parse::<f64>() {
        Ok(value) if value.is_finite() => Some(value),
        _ => {
            tracing::warn!(
                "Ignoring non-numeric {} value '{}' in: {}",
                word.letter,
                text,
                masked.trim_end()
            );
            None
        }
    }
}
