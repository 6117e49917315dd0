use std::collections::HashSet;
use std::io::Write;
use std::path::{Path, PathBuf};

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

pub const DEFAULT_CONFIG: &str = "reglamento.yaml";
pub const DEFAULT_SOURCE: &str = "data/reglamento-fulltext.txt";
pub const DEFAULT_OUTPUT: &str = "data/reglamento-articles.json";

// Article heading: keyword at a line start, numeral, optional whole-word bis/ter, then `.`/dashes.
static ARTICLE_HEADING: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?mi)^\s*ART[ÍI]CULO\s+(\d+(?:\s*(?:bis|ter)\b)?)\s*[.\-–—]?\s*[\-–—]?\s*")
        .expect("valid regex")
});
static STRUCTURAL_HEADING: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?m)^[ \t]*(?:(?:PRIMERA|SEGUNDA|TERCERA|CUARTA|QUINTA)\s+PARTE|T[ÍI]TULO|CAP[ÍI]TULO|SECCI[ÓO]N|TRANSITORIOS?|DISPOSICI[ÓO]N(?:ES)?)\b",
    )
    .expect("valid regex")
});
static TRANSITORIO_SECTION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?mi)^[ \t]*TRANSITORIO").expect("valid regex"));
static TRANSITORIO_HEADING: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?mi)^[ \t]*TRANSITORIO[ \t]+((?-i:[IVXLCDM][IVXLCDMl1]*|[ÚU]NICO|[ÚU]nico))\b[ \t]*[.:]?[ \t]*[\-–—]?[ \t]*",
    )
    .expect("valid regex")
});
static TRANSITORIO_END: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?mi)^\s*(?:ART[ÍI]CULO|NOTAS\s+FINALES)\b").expect("valid regex")
});
static ROMAN_NUMERAL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^C{0,3}(?:XC|XL|L?X{0,3})(?:IX|IV|V?I{0,3})$").expect("valid regex")
});
static PAGE_NUMBER_LINE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^[ \t]*\d{1,3}[ \t]*$").expect("valid regex"));
static BLANK_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n(?:[ \t]*\n){2,}").expect("valid regex"));
static WS_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid regex"));
static LEADING_DASH: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[\-–—]\s*").expect("valid regex"));
// Table-of-contents leader: "Objeto ........ 12"
static TOC_LEADER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s*(?:\.{3,}|…+)\s*\d*\s*$").expect("valid regex"));

/// An epigraph line longer than this many words is treated as body text.
const EPIGRAPH_MAX_WORDS: usize = 12;

/// UTF-8 sequences that were decoded as Windows-1252/Latin-1 on the way out of the PDF.
const MOJIBAKE: &[(&str, &str)] = &[
    ("\u{c3}\u{a1}", "á"),
    ("\u{c3}\u{a9}", "é"),
    ("\u{c3}\u{ad}", "í"),
    ("\u{c3}\u{b3}", "ó"),
    ("\u{c3}\u{ba}", "ú"),
    ("\u{c3}\u{81}", "Á"),
    ("\u{c3}\u{2030}", "É"),
    ("\u{c3}\u{8d}", "Í"),
    ("\u{c3}\u{201c}", "Ó"),
    ("\u{c3}\u{161}", "Ú"),
    ("\u{c3}\u{b1}", "ñ"),
    ("\u{c3}\u{2018}", "Ñ"),
    ("\u{c3}\u{bc}", "ü"),
    ("\u{c3}\u{153}", "Ü"),
    ("\u{c2}\u{bf}", "¿"),
    ("\u{c2}\u{a1}", "¡"),
    ("\u{c2}\u{ab}", "«"),
    ("\u{c2}\u{bb}", "»"),
    ("\u{c2}\u{ba}", "º"),
    ("\u{c2}\u{aa}", "ª"),
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractConfig {
    pub body_marker: String,
    pub min_article_chars: usize,
    pub min_transitorio_chars: usize,
    pub title_max_chars: usize,
    pub transitorio_prefix: String,
    pub transitorio_label: String,
}

impl Default for ExtractConfig {
    fn default() -> Self {
        Self {
            body_marker: "PRIMERA PARTE".to_string(),
            min_article_chars: 10,
            min_transitorio_chars: 6,
            title_max_chars: 150,
            transitorio_prefix: "T-".to_string(),
            transitorio_label: "Transitorio".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Json,
    Yaml,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub path: String,
    pub format: OutputFormat,
    pub meta: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self { path: DEFAULT_OUTPUT.to_string(), format: OutputFormat::Json, meta: true }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    pub id: String,
    pub source: String,
    pub output: OutputConfig,
    pub extract: ExtractConfig,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            id: "reglamento".to_string(),
            source: DEFAULT_SOURCE.to_string(),
            output: OutputConfig::default(),
            extract: ExtractConfig::default(),
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config: {0}")]
    Read(String),
    #[error("Failed to parse config: {0}")]
    Parse(String),
    #[error("Invalid config: {0}")]
    Invalid(String),
}

impl RunConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.id.trim().is_empty() {
            return Err(ConfigError::Invalid("missing id".into()));
        }
        if self.source.trim().is_empty() {
            return Err(ConfigError::Invalid("missing source".into()));
        }
        if self.output.path.trim().is_empty() {
            return Err(ConfigError::Invalid("missing output.path".into()));
        }
        if self.extract.body_marker.is_empty() {
            return Err(ConfigError::Invalid("missing extract.body_marker".into()));
        }
        if self.extract.title_max_chars == 0 {
            return Err(ConfigError::Invalid("extract.title_max_chars must be positive".into()));
        }
        Ok(())
    }
}

/// Load and validate a YAML run config. Absent fields take their defaults.
pub fn load_config(path: &Path) -> Result<RunConfig, ConfigError> {
    let raw = std::fs::read_to_string(path).map_err(|e| ConfigError::Read(e.to_string()))?;
    let cfg: RunConfig = serde_yaml::from_str(&raw).map_err(|e| ConfigError::Parse(e.to_string()))?;
    cfg.validate()?;
    Ok(cfg)
}

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("FileNotFound: {0}")]
    FileNotFound(String),
    #[error("ReadFailed: {0}")]
    Read(String),
}

#[derive(Debug, Clone)]
pub struct SourceText {
    pub path: PathBuf,
    pub text: String,
    pub sha256: String,
}

/// Read the full-text dump. Invalid UTF-8 is decoded lossily; the replacement
/// characters it produces are dropped later by [`repair_encoding`].
pub fn read_source(path: &Path) -> Result<SourceText, SourceError> {
    if !path.exists() {
        return Err(SourceError::FileNotFound(path.display().to_string()));
    }
    let bytes = std::fs::read(path).map_err(|e| SourceError::Read(e.to_string()))?;
    Ok(SourceText {
        path: path.to_path_buf(),
        text: String::from_utf8_lossy(&bytes).into_owned(),
        sha256: sha256_hex(&bytes),
    })
}

/// Replace known mojibake sequences with the intended characters.
/// Runs the table to a fixed point, so the result never contains a table key.
pub fn repair_encoding(text: &str) -> String {
    let mut out = text.replace('\u{fffd}', "");
    loop {
        let next = MOJIBAKE
            .iter()
            .fold(out.clone(), |acc, &(bad, good)| if acc.contains(bad) { acc.replace(bad, good) } else { acc });
        if next == out {
            return out;
        }
        out = next;
    }
}

pub fn normalize_line_endings(text: &str) -> String {
    text.replace("\r\n", "\n").replace('\r', "\n")
}

/// Encoding repair followed by line-ending unification.
pub fn normalize_source(raw: &str) -> String {
    normalize_line_endings(&repair_encoding(raw))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrontMatter<'a> {
    pub body: &'a str,
    /// Bytes discarded before the second marker, `None` when the marker was not seen twice.
    pub skipped: Option<usize>,
}

/// Drop everything before the second occurrence of `marker` (the first one
/// belongs to the table of contents). Keeps the text as-is otherwise.
pub fn trim_front_matter<'a>(text: &'a str, marker: &str) -> FrontMatter<'a> {
    if marker.is_empty() {
        return FrontMatter { body: text, skipped: None };
    }
    let second = text.find(marker).and_then(|first| {
        let from = first + marker.len();
        text[from..].find(marker).map(|i| from + i)
    });
    match second {
        Some(pos) => FrontMatter { body: &text[pos..], skipped: Some(pos) },
        None => FrontMatter { body: text, skipped: None },
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Ordinal {
    #[default]
    None,
    Bis,
    Ter,
}

impl Ordinal {
    pub fn rank(self) -> u8 {
        match self {
            Ordinal::None => 0,
            Ordinal::Bis => 1,
            Ordinal::Ter => 2,
        }
    }
}

/// Sort key of a numbered article: base integer, then ordinal suffix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ArticleNumber {
    pub base: u32,
    pub ordinal: Ordinal,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum NumberError {
    #[error("MissingBase: {0}")]
    MissingBase(String),
    #[error("BaseOutOfRange: {0}")]
    BaseOutOfRange(String),
    #[error("UnknownOrdinal: {0}")]
    UnknownOrdinal(String),
}

impl std::str::FromStr for ArticleNumber {
    type Err = NumberError;

    fn from_str(token: &str) -> Result<Self, Self::Err> {
        let token = token.trim();
        let split = token.find(|c: char| !c.is_ascii_digit()).unwrap_or(token.len());
        let (digits, rest) = token.split_at(split);
        if digits.is_empty() {
            return Err(NumberError::MissingBase(token.to_string()));
        }
        let base = digits.parse::<u32>().map_err(|_| NumberError::BaseOutOfRange(token.to_string()))?;
        let ordinal = match rest.trim().to_lowercase().as_str() {
            "" => Ordinal::None,
            "bis" => Ordinal::Bis,
            "ter" => Ordinal::Ter,
            _ => return Err(NumberError::UnknownOrdinal(token.to_string())),
        };
        Ok(ArticleNumber { base, ordinal })
    }
}

/// One output record. Field names follow the consumer's schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArticleRecord {
    #[serde(rename = "numero")]
    pub number: String,
    #[serde(rename = "nombre")]
    pub title: String,
    #[serde(rename = "textoLegal")]
    pub body: String,
    #[serde(rename = "orden")]
    pub sequence_index: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NumberedArticle {
    pub number: ArticleNumber,
    /// Number token as written, whitespace collapsed ("2 bis").
    pub label: String,
    pub title: String,
    pub body: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SegmentStats {
    pub headings: usize,
    pub duplicates_skipped: usize,
    pub short_skipped: usize,
    #[serde(default)]
    pub malformed_numbers: Vec<String>,
}

/// Cut a raw article span down to its content: stop at the first structural
/// heading, drop page-number lines, squeeze blank runs.
pub fn clean_article_body(raw: &str) -> String {
    let trimmed = raw.trim();
    let cut = STRUCTURAL_HEADING.find(trimmed).map(|m| m.start()).unwrap_or(trimmed.len());
    strip_layout_noise(&trimmed[..cut])
}

fn strip_layout_noise(text: &str) -> String {
    let no_pages = PAGE_NUMBER_LINE.replace_all(text, "");
    BLANK_RUN.replace_all(&no_pages, "\n\n").trim().to_string()
}

/// Title from the first body line: no leading dash, no TOC leader, at most `max_chars`.
/// Overlong titles are cut before the first period when it falls inside the limit.
pub fn derive_title(first_line: &str, max_chars: usize) -> String {
    let title = LEADING_DASH.replace(first_line.trim(), "");
    let title = TOC_LEADER.replace(title.trim(), "");
    let title = title.trim();
    if title.chars().count() <= max_chars {
        return title.to_string();
    }
    let keep = match title.chars().position(|c| c == '.') {
        Some(p) if p > 0 && p < max_chars => p,
        _ => max_chars,
    };
    title.chars().take(keep).collect::<String>().trim().to_string()
}

/// A heading-shaped line: one short sentence closed by a period, and the next
/// line opens a new sentence. Wrapped prose fails one of the two.
fn is_epigraph(line: &str, next: &str) -> bool {
    let inner = match line.trim().strip_suffix('.') {
        Some(inner) => inner,
        None => return false,
    };
    !inner.is_empty()
        && !inner.contains('.')
        && inner.split_whitespace().count() <= EPIGRAPH_MAX_WORDS
        && next.trim_start().chars().next().is_some_and(char::is_uppercase)
}

/// Split a cleaned span into (title source line, body). An epigraph first
/// line leaves the body, unless too little would remain.
fn split_epigraph(cleaned: &str, min_body_chars: usize) -> (&str, &str) {
    match cleaned.split_once('\n') {
        Some((first, rest)) if is_epigraph(first, rest) && rest.trim().chars().count() >= min_body_chars => {
            (first, rest.trim())
        }
        Some((first, _)) => (first, cleaned),
        None => (cleaned, cleaned),
    }
}

/// Split text into numbered articles at each article heading.
/// First produced occurrence of a number wins; short and malformed spans are dropped.
pub fn segment_articles(text: &str, cfg: &ExtractConfig) -> (Vec<NumberedArticle>, SegmentStats) {
    let headings: Vec<(usize, usize, String)> = ARTICLE_HEADING
        .captures_iter(text)
        .filter_map(|c| {
            let whole = c.get(0)?;
            let num = c.get(1)?;
            Some((whole.start(), whole.end(), WS_RUN.replace_all(num.as_str(), " ").trim().to_string()))
        })
        .collect();

    let mut stats = SegmentStats { headings: headings.len(), ..SegmentStats::default() };
    let mut seen: HashSet<String> = HashSet::new();
    let mut out = Vec::new();

    for (i, (_, body_start, label)) in headings.iter().enumerate() {
        if seen.contains(label) {
            debug!(number = %label, "duplicate article heading skipped");
            stats.duplicates_skipped += 1;
            continue;
        }
        let body_end = headings.get(i + 1).map(|h| h.0).unwrap_or(text.len());
        let cleaned = clean_article_body(&text[*body_start..body_end]);
        let (first_line, body) = split_epigraph(&cleaned, cfg.min_article_chars);
        if body.chars().count() < cfg.min_article_chars {
            debug!(number = %label, chars = body.chars().count(), "short article span dropped");
            stats.short_skipped += 1;
            continue;
        }
        let number = match label.parse::<ArticleNumber>() {
            Ok(n) => n,
            Err(e) => {
                warn!(number = %label, error = %e, "article number not sortable, record excluded");
                stats.malformed_numbers.push(label.clone());
                continue;
            }
        };
        seen.insert(label.clone());
        out.push(NumberedArticle {
            number,
            label: label.clone(),
            title: derive_title(first_line, cfg.title_max_chars),
            body: body.to_string(),
        });
    }

    (out, stats)
}

/// Stable sort by (base, ordinal) and assign the 1-based sequence index.
pub fn sequence_articles(mut articles: Vec<NumberedArticle>) -> Vec<ArticleRecord> {
    articles.sort_by_key(|a| a.number);
    articles
        .into_iter()
        .enumerate()
        .map(|(i, a)| ArticleRecord { number: a.label, title: a.title, body: a.body, sequence_index: i + 1 })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransitorioToken {
    Roman(String),
    /// "ÚNICO": the only transitional provision.
    Sole(String),
    Unparseable(String),
}

impl TransitorioToken {
    pub fn as_str(&self) -> &str {
        match self {
            TransitorioToken::Roman(s) | TransitorioToken::Sole(s) | TransitorioToken::Unparseable(s) => s,
        }
    }
}

pub fn classify_transitorio_token(token: &str) -> TransitorioToken {
    let token = token.trim();
    let upper = token.to_uppercase();
    if upper == "ÚNICO" || upper == "UNICO" {
        TransitorioToken::Sole(token.to_string())
    } else if !upper.is_empty() && ROMAN_NUMERAL.is_match(&upper) {
        TransitorioToken::Roman(token.to_string())
    } else {
        TransitorioToken::Unparseable(token.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitorioProvision {
    pub token: TransitorioToken,
    pub number: String,
    pub title: String,
    pub body: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitorioStats {
    pub section_found: bool,
    pub headings: usize,
    pub duplicates_skipped: usize,
    pub short_skipped: usize,
    #[serde(default)]
    pub unparseable: Vec<String>,
}

/// Segment the transitional-provisions section, keyed by Roman numeral or "ÚNICO".
/// Unparseable tokens still bound the neighbouring spans but produce no record.
pub fn segment_transitorios(text: &str, cfg: &ExtractConfig) -> (Vec<TransitorioProvision>, TransitorioStats) {
    let mut stats = TransitorioStats::default();
    let section = match TRANSITORIO_SECTION.find(text) {
        Some(m) => &text[m.start()..],
        None => return (Vec::new(), stats),
    };
    stats.section_found = true;

    let headings: Vec<(usize, usize, String)> = TRANSITORIO_HEADING
        .captures_iter(section)
        .filter_map(|c| {
            let whole = c.get(0)?;
            let token = c.get(1)?;
            Some((whole.start(), whole.end(), token.as_str().to_string()))
        })
        .collect();
    stats.headings = headings.len();

    let mut seen: HashSet<String> = HashSet::new();
    let mut out = Vec::new();
    for (i, (_, body_start, raw_token)) in headings.iter().enumerate() {
        let token = classify_transitorio_token(raw_token);
        if let TransitorioToken::Unparseable(t) = &token {
            warn!(token = %t, "transitorio heading with unrecognised designator");
            stats.unparseable.push(t.clone());
            continue;
        }
        let body_end = headings.get(i + 1).map(|h| h.0).unwrap_or(section.len());
        let span = section[*body_start..body_end].trim();
        let cut = TRANSITORIO_END.find(span).map(|m| m.start()).unwrap_or(span.len());
        let body = strip_layout_noise(&span[..cut]);
        if body.chars().count() < cfg.min_transitorio_chars {
            debug!(token = %token.as_str(), "short transitorio span dropped");
            stats.short_skipped += 1;
            continue;
        }
        let number = format!("{}{}", cfg.transitorio_prefix, token.as_str());
        if !seen.insert(number.clone()) {
            debug!(number = %number, "duplicate transitorio skipped");
            stats.duplicates_skipped += 1;
            continue;
        }
        out.push(TransitorioProvision {
            title: format!("{} {}", cfg.transitorio_label, token.as_str()),
            number,
            body,
            token,
        });
    }

    (out, stats)
}

/// Append transitional provisions after the sorted articles, in order of appearance.
pub fn append_transitorios(records: &mut Vec<ArticleRecord>, provisions: Vec<TransitorioProvision>) {
    for p in provisions {
        let sequence_index = records.len() + 1;
        records.push(ArticleRecord { number: p.number, title: p.title, body: p.body, sequence_index });
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractStats {
    pub front_matter_skipped_bytes: Option<usize>,
    pub articles: SegmentStats,
    pub transitorios: TransitorioStats,
    pub numbered_records: usize,
    pub transitorio_records: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractOutput {
    pub records: Vec<ArticleRecord>,
    pub stats: ExtractStats,
}

/// Whole pipeline from raw dump text to the ordered record collection.
pub fn extract_articles(raw: &str, cfg: &ExtractConfig) -> ExtractOutput {
    let normalized = normalize_source(raw);
    let front = trim_front_matter(&normalized, &cfg.body_marker);
    match front.skipped {
        Some(n) => info!(skipped_bytes = n, "front matter trimmed"),
        None => info!(marker = %cfg.body_marker, "body marker not found twice, keeping full text"),
    }

    let (numbered, article_stats) = segment_articles(front.body, cfg);
    let mut records = sequence_articles(numbered);
    let numbered_records = records.len();

    let (provisions, transitorio_stats) = segment_transitorios(front.body, cfg);
    let transitorio_records = provisions.len();
    append_transitorios(&mut records, provisions);
    info!(articles = numbered_records, transitorios = transitorio_records, "extraction finished");

    ExtractOutput {
        records,
        stats: ExtractStats {
            front_matter_skipped_bytes: front.skipped,
            articles: article_stats,
            transitorios: transitorio_stats,
            numbered_records,
            transitorio_records,
        },
    }
}

#[derive(Debug, Error)]
pub enum EmitError {
    #[error("SerializeFailed: {0}")]
    Serialize(String),
    #[error("WriteFailed: {0}")]
    WriteFailed(String),
}

/// Render records as pretty JSON or YAML. Non-ASCII text is written literally.
pub fn serialize_articles(records: &[ArticleRecord], format: OutputFormat) -> Result<String, EmitError> {
    match format {
        OutputFormat::Json => serde_json::to_string_pretty(records)
            .map(|mut s| {
                s.push('\n');
                s
            })
            .map_err(|e| EmitError::Serialize(e.to_string())),
        OutputFormat::Yaml => serde_yaml::to_string(records).map_err(|e| EmitError::Serialize(e.to_string())),
    }
}

/// Run metadata written next to the output, fingerprinted like the records it describes.
pub fn run_meta(cfg: &RunConfig, source: &SourceText, output: &ExtractOutput) -> serde_json::Value {
    let meta = serde_json::json!({
        "id": cfg.id,
        "source": source.path.display().to_string(),
        "source_sha256": source.sha256,
        "format": cfg.output.format,
        "records": output.records.len(),
        "stats": output.stats,
    });
    let bytes = serde_json::to_vec(&meta).unwrap_or_default();
    let mut full = meta.as_object().cloned().unwrap_or_default();
    full.insert("meta_fingerprint".to_string(), serde_json::json!(sha256_hex(&bytes)));
    serde_json::Value::Object(full)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmitPaths {
    pub records_path: String,
    pub meta_path: Option<String>,
}

/// Sidecar path: `articles.json` -> `articles.meta.json`.
pub fn meta_path_for(records_path: &Path) -> PathBuf {
    records_path.with_extension("meta.json")
}

fn write_atomic(dir: &Path, path: &Path, bytes: &[u8]) -> Result<(), EmitError> {
    let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(|e| EmitError::WriteFailed(e.to_string()))?;
    tmp.write_all(bytes).map_err(|e| EmitError::WriteFailed(e.to_string()))?;
    tmp.persist(path).map_err(|e| EmitError::WriteFailed(e.error.to_string()))?;
    Ok(())
}

/// Atomically write the records file and, when `meta` is given, its sidecar.
pub fn emit_files(
    records: &[ArticleRecord],
    format: OutputFormat,
    meta: Option<&serde_json::Value>,
    records_path: &Path,
) -> Result<EmitPaths, EmitError> {
    let dir = records_path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    std::fs::create_dir_all(dir).map_err(|e| EmitError::WriteFailed(e.to_string()))?;

    let payload = serialize_articles(records, format)?;
    write_atomic(dir, records_path, payload.as_bytes())?;

    let meta_path = match meta {
        Some(m) => {
            let path = meta_path_for(records_path);
            let bytes = serde_json::to_vec_pretty(m).map_err(|e| EmitError::Serialize(e.to_string()))?;
            write_atomic(dir, &path, &bytes)?;
            Some(path.to_string_lossy().to_string())
        }
        None => None,
    };

    Ok(EmitPaths { records_path: records_path.to_string_lossy().to_string(), meta_path })
}

/// Lowercase hex SHA-256 digest.
pub fn sha256_hex(bytes: &[u8]) -> String {
    use sha2::{Digest, Sha256};
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    let out = hasher.finalize();
    out.iter().map(|b| format!("{:02x}", b)).collect()
}
