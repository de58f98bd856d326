use crate::error::{Error, Result};
use crate::format;

/// A single photometric entry of an archive record.
#[derive(Debug, Clone, PartialEq)]
pub struct Measurement {
    pub tag: String,
    pub value: f64,
    pub uncertainty: f64,
    pub unit: String,
}

impl Measurement {
    /// Build a measurement, rejecting values the archive format cannot carry.
    pub fn new(tag: &str, value: f64, uncertainty: f64, unit: &str) -> Result<Self> {
        if tag.is_empty() {
            return Err(Error::InvalidTag);
        }
        if !value.is_finite() || !uncertainty.is_finite() {
            return Err(Error::InvalidMeasurement {
                tag: tag.to_string(),
                message: format!("non-finite value {value} +/- {uncertainty}"),
            });
        }
        Ok(Self {
            tag: tag.to_string(),
            value,
            uncertainty,
            unit: unit.to_string(),
        })
    }

    pub fn to_line(&self) -> String {
        format::measurement_line(&self.tag, self.value, self.uncertainty, &self.unit)
    }

    /// Parse `TAG = value +/- uncertainty unit`. Anything else is `None`.
    pub fn parse(line: &str) -> Option<Self> {
        if line.starts_with(char::is_whitespace) {
            return None;
        }
        let mut tokens = line.split_whitespace();
        let tag = tokens.next()?;
        if tokens.next()? != "=" {
            return None;
        }
        let value: f64 = tokens.next()?.parse().ok()?;
        if tokens.next()? != "+/-" {
            return None;
        }
        let uncertainty: f64 = tokens.next()?.parse().ok()?;
        let unit = tokens.collect::<Vec<_>>().join(" ");
        if unit.is_empty() {
            return None;
        }
        Some(Self {
            tag: tag.to_string(),
            value,
            uncertainty,
            unit,
        })
    }
}

/// Combine a statistical uncertainty with a fractional calibration error in quadrature.
pub fn combined_uncertainty(flux: f64, statistical: f64, calibration_fraction: f64) -> f64 {
    statistical.hypot(flux * calibration_fraction)
}

/// A classified archive line. The original text is kept so unchanged lines
/// are written back exactly as read.
#[derive(Debug, Clone, PartialEq)]
pub enum RecordLine {
    Annotation(String),
    Measurement { measurement: Measurement, text: String },
}

impl RecordLine {
    pub fn classify(line: &str) -> Self {
        match Measurement::parse(line) {
            Some(measurement) => RecordLine::Measurement {
                measurement,
                text: line.to_string(),
            },
            None => RecordLine::Annotation(line.to_string()),
        }
    }

    pub fn text(&self) -> &str {
        match self {
            RecordLine::Annotation(text) => text,
            RecordLine::Measurement { text, .. } => text,
        }
    }

    /// A line belongs to a tag when its text starts with the tag's marker.
    pub fn belongs_to(&self, marker: &str) -> bool {
        self.text().starts_with(marker)
    }

    pub fn measurement(&self) -> Option<&Measurement> {
        match self {
            RecordLine::Measurement { measurement, .. } => Some(measurement),
            RecordLine::Annotation(_) => None,
        }
    }
}

impl From<Measurement> for RecordLine {
    fn from(measurement: Measurement) -> Self {
        let text = measurement.to_line();
        RecordLine::Measurement { measurement, text }
    }
}

/// Terminator of a record line as found in the file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LineEnding {
    #[default]
    Lf,
    CrLf,
    /// Last line of a file without a trailing newline.
    None,
}

impl LineEnding {
    pub fn as_str(self) -> &'static str {
        match self {
            LineEnding::Lf => "\n",
            LineEnding::CrLf => "\r\n",
            LineEnding::None => "",
        }
    }

    /// Split a raw line into its text and terminator.
    fn split(raw: &str) -> (&str, Self) {
        if let Some(text) = raw.strip_suffix("\r\n") {
            (text, LineEnding::CrLf)
        } else if let Some(text) = raw.strip_suffix('\n') {
            (text, LineEnding::Lf)
        } else {
            (raw, LineEnding::None)
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
struct Entry {
    line: RecordLine,
    ending: LineEnding,
}

/// Contents of one archive record file.
///
/// Lines keep the terminator they were read with, so rendering an untouched
/// record reproduces the file byte for byte. Appended lines use the first
/// terminator seen in the file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Record {
    entries: Vec<Entry>,
    newline: LineEnding,
}

impl Record {
    pub fn parse(content: &str) -> Self {
        let mut newline = None;
        let entries = content
            .split_inclusive('\n')
            .map(|raw| {
                let (text, ending) = LineEnding::split(raw);
                if ending != LineEnding::None && newline.is_none() {
                    newline = Some(ending);
                }
                Entry {
                    line: RecordLine::classify(text),
                    ending,
                }
            })
            .collect();
        Self {
            entries,
            newline: newline.unwrap_or_default(),
        }
    }

    /// Text of every line with its original terminator. A last line without
    /// a newline only gains one when something follows it.
    pub fn render(&self) -> String {
        let mut out = String::new();
        let last = self.entries.len().saturating_sub(1);
        for (i, entry) in self.entries.iter().enumerate() {
            out.push_str(entry.line.text());
            let ending = match entry.ending {
                LineEnding::None if i < last => self.newline,
                ending => ending,
            };
            out.push_str(ending.as_str());
        }
        out
    }

    pub fn lines(&self) -> impl Iterator<Item = &RecordLine> {
        self.entries.iter().map(|e| &e.line)
    }

    /// Terminator used for appended lines.
    pub fn newline(&self) -> LineEnding {
        self.newline
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn push(&mut self, line: impl Into<RecordLine>) {
        self.entries.push(Entry {
            line: line.into(),
            ending: self.newline,
        });
    }

    /// Drop every line belonging to `marker`, keeping order. Returns how many
    /// lines were removed.
    pub fn remove_tag(&mut self, marker: &str) -> usize {
        let before = self.entries.len();
        self.entries.retain(|e| !e.line.belongs_to(marker));
        before - self.entries.len()
    }

    /// Number of lines belonging to `marker`.
    pub fn count_tag(&self, marker: &str) -> usize {
        self.lines().filter(|l| l.belongs_to(marker)).count()
    }

    pub fn measurements(&self) -> impl Iterator<Item = &Measurement> {
        self.lines().filter_map(RecordLine::measurement)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ── Measurement ─────────────────────────────────────────────

    #[test]
    fn test_parse_measurement_line() {
        let m = Measurement::parse("MIPS24 = 1.0e+01 +/- 2.0e+00 mJy").unwrap();
        assert_eq!(m.tag, "MIPS24");
        assert_eq!(m.value, 10.0);
        assert_eq!(m.uncertainty, 2.0);
        assert_eq!(m.unit, "mJy");
    }

    #[test]
    fn test_parse_rejects_annotations() {
        assert!(Measurement::parse("A=1").is_none());
        assert!(Measurement::parse("# sptype = B2V").is_none());
        assert!(Measurement::parse("MIPS24 = 1.0 +/- 0.1").is_none());
        assert!(Measurement::parse(" MIPS24 = 1.0 +/- 0.1 mJy").is_none());
        assert!(Measurement::parse("").is_none());
    }

    #[test]
    fn test_new_rejects_non_finite() {
        assert!(Measurement::new("MIPS24", f64::NAN, 1.0, "mJy").is_err());
        assert!(Measurement::new("MIPS24", 1.0, f64::INFINITY, "mJy").is_err());
        assert!(Measurement::new("", 1.0, 1.0, "mJy").is_err());
    }

    #[test]
    fn test_combined_uncertainty() {
        let unc = combined_uncertainty(100.0, 5.0, 0.02);
        assert!((unc - 29f64.sqrt()).abs() < 1e-12);
        assert!((unc - 5.385).abs() < 1e-3);
    }

    // ── Record ──────────────────────────────────────────────────

    #[test]
    fn test_remove_tag_preserves_order() {
        let mut record = Record::parse("A=1\nMIPS24 = 1.0e+01 +/- 2.0e+00 mJy\nB=2\n");
        let removed = record.remove_tag("MIPS");
        assert_eq!(removed, 1);
        let texts: Vec<&str> = record.lines().map(RecordLine::text).collect();
        assert_eq!(texts, vec!["A=1", "B=2"]);
    }

    #[test]
    fn test_remove_tag_drops_unparsed_lines_with_marker() {
        let mut record = Record::parse("MIPS24 flagged saturated\nIRAC1 = 1.00e+00 +/- 1.00e-01 mJy\n");
        assert_eq!(record.remove_tag("MIPS24"), 1);
        assert_eq!(record.render(), "IRAC1 = 1.00e+00 +/- 1.00e-01 mJy\n");
    }

    #[test]
    fn test_render_keeps_original_text() {
        let content = "# header\nMIPS24 = 1.0e+01 +/- 2.0e+00 mJy\nname HD 29647\n";
        assert_eq!(Record::parse(content).render(), content);
    }

    #[test]
    fn test_push_measurement_uses_archive_format() {
        let mut record = Record::default();
        record.push(Measurement::new("MIPS24", 100.0, 29f64.sqrt(), "mJy").unwrap());
        assert_eq!(record.render(), "MIPS24 = 1.00e+02 +/- 5.39e+00 mJy\n");
        assert_eq!(record.measurements().count(), 1);
    }

    #[test]
    fn test_count_tag() {
        let record = Record::parse("IRAC1 = 1 +/- 1 mJy\nIRAC2 = 1 +/- 1 mJy\nMIPS24 = 1 +/- 1 mJy\n");
        assert_eq!(record.count_tag("IRAC"), 2);
        assert_eq!(record.count_tag("MIPS24"), 1);
        assert_eq!(record.count_tag("WISE"), 0);
    }

    #[test]
    fn test_crlf_lines_keep_their_terminator() {
        let content = "sptype = B1V\r\nMIPS24 = 4.0e+00 +/- 1.0e+00 mJy\r\nIRAC1 = 1 +/- 1 mJy\r\n";
        let mut record = Record::parse(content);
        assert_eq!(record.newline(), LineEnding::CrLf);
        assert_eq!(record.render(), content);

        assert_eq!(record.remove_tag("MIPS24"), 1);
        assert_eq!(record.render(), "sptype = B1V\r\nIRAC1 = 1 +/- 1 mJy\r\n");

        record.push(Measurement::new("MIPS24", 5.0, 1.0, "mJy").unwrap());
        assert_eq!(
            record.render(),
            "sptype = B1V\r\nIRAC1 = 1 +/- 1 mJy\r\nMIPS24 = 5.00e+00 +/- 1.00e+00 mJy\r\n"
        );
    }

    #[test]
    fn test_crlf_marker_match_ignores_terminator() {
        let record = Record::parse("MIPS24 = 1 +/- 1 mJy\r\nA=1\r\n");
        assert_eq!(record.count_tag("MIPS24"), 1);
        assert_eq!(record.measurements().next().unwrap().unit, "mJy");
        let texts: Vec<&str> = record.lines().map(RecordLine::text).collect();
        assert_eq!(texts, vec!["MIPS24 = 1 +/- 1 mJy", "A=1"]);
    }

    #[test]
    fn test_missing_final_newline_preserved() {
        let content = "sptype = B1V\nMIPS24 = 4.0e+00 +/- 1.0e+00 mJy";
        assert_eq!(Record::parse(content).render(), content);

        let mut record = Record::parse("A=1\nB=2");
        record.push(Measurement::new("MIPS24", 1.0, 1.0, "mJy").unwrap());
        assert_eq!(record.render(), "A=1\nB=2\nMIPS24 = 1.00e+00 +/- 1.00e+00 mJy\n");
    }

    #[test]
    fn test_empty_record_renders_empty() {
        assert!(Record::parse("").is_empty());
        assert_eq!(Record::default().render(), "");
    }
}
