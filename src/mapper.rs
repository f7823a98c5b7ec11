//! Column mapper: decides which physical column feeds which canonical field.
//!
//! Each column is scored against each field as a weighted sum of a
//! header-text score (alias match) and a value-shape score (fraction of sampled
//! cells that look like the field). Fields are then assigned greedily in
//! [`CanonicalField::PRIORITY`] order; a claimed column is never reassigned.

use log::{debug, info, warn};

use crate::{
    aliases::{AliasTable, SourceSystem},
    config::ScoringWeights,
    data::{detect_number_locale, is_placeholder, normalize_header, parse_amount, parse_date, NumberLocale},
    model::{CanonicalField, ColumnMapping, MatchKind, RawRow, ValueShape},
};

const SCORE_EPSILON: f64 = 1e-9;
const TOKEN_MAX_CHARS: usize = 24;
const TOKEN_MAX_WORDS: usize = 3;
const CODE_MAX_CHARS: usize = 40;

#[derive(Debug, Clone, PartialEq)]
pub struct MappingOutcome {
    /// Accepted mappings in assignment priority order.
    pub mappings: Vec<ColumnMapping>,
    pub warnings: Vec<String>,
    /// Separator convention observed in the amount column sample.
    pub amount_locale: NumberLocale,
}

impl MappingOutcome {
    pub fn mapping_for(&self, field: CanonicalField) -> Option<&ColumnMapping> {
        self.mappings.iter().find(|m| m.target_field == field)
    }

    pub fn column_for(&self, field: CanonicalField) -> Option<usize> {
        self.mapping_for(field).map(|m| m.column_index)
    }

    pub fn is_mapped(&self, field: CanonicalField) -> bool {
        self.mapping_for(field).is_some()
    }

    pub fn missing_mandatory(&self) -> Vec<CanonicalField> {
        CanonicalField::ALL
            .into_iter()
            .filter(|f| f.is_mandatory() && !self.is_mapped(*f))
            .collect()
    }
}

/// Per-column tallies of how sampled cells parse.
#[derive(Debug, Clone, Default)]
struct ShapeProfile {
    non_empty: usize,
    date_matches: usize,
    numeric_matches: usize,
    token_matches: usize,
    code_matches: usize,
    text_matches: usize,
    locale: NumberLocale,
}

impl ShapeProfile {
    fn observe(values: &[&str]) -> Self {
        let mut profile = ShapeProfile {
            locale: detect_number_locale(values.iter().copied()),
            ..ShapeProfile::default()
        };
        for value in values {
            profile.update(value);
        }
        profile
    }

    fn update(&mut self, value: &str) {
        let trimmed = value.trim();
        if trimmed.is_empty() || is_placeholder(trimmed) {
            return;
        }
        self.non_empty += 1;

        let is_date = parse_date(trimmed).is_some();
        let is_numeric = !is_date && parse_amount(trimmed, self.locale).is_some();
        let has_alpha = trimmed.chars().any(char::is_alphabetic);
        let has_digit = trimmed.chars().any(|c| c.is_ascii_digit());
        let char_count = trimmed.chars().count();

        if is_date {
            self.date_matches += 1;
        }
        if is_numeric {
            self.numeric_matches += 1;
        }
        if has_alpha
            && !has_digit
            && char_count <= TOKEN_MAX_CHARS
            && trimmed.split_whitespace().count() <= TOKEN_MAX_WORDS
        {
            self.token_matches += 1;
        }
        if !is_date
            && has_digit
            && char_count <= CODE_MAX_CHARS
            && !trimmed.contains(char::is_whitespace)
        {
            self.code_matches += 1;
        }
        if has_alpha && !is_date && !is_numeric {
            self.text_matches += 1;
        }
    }

    fn fraction(&self, shape: ValueShape) -> f64 {
        if self.non_empty == 0 {
            return 0.0;
        }
        let matches = match shape {
            ValueShape::Date => self.date_matches,
            ValueShape::Numeric => self.numeric_matches,
            ValueShape::Token => self.token_matches,
            ValueShape::Code => self.code_matches,
            ValueShape::Text => self.text_matches,
        };
        matches as f64 / self.non_empty as f64
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColumnScore {
    pub header: f64,
    pub shape: f64,
    pub combined: f64,
    pub kind: MatchKind,
}

impl ColumnScore {
    /// Higher combined score wins; on a tie the more specific header match does.
    fn beats(&self, other: &ColumnScore) -> bool {
        if self.combined > other.combined + SCORE_EPSILON {
            return true;
        }
        (self.combined - other.combined).abs() <= SCORE_EPSILON && self.kind > other.kind
    }
}

#[derive(Debug, Clone)]
pub struct ColumnMapper {
    aliases: Vec<(CanonicalField, Vec<String>)>,
    weights: ScoringWeights,
}

impl ColumnMapper {
    pub fn new(table: &AliasTable, system: SourceSystem, weights: ScoringWeights) -> Self {
        let aliases = CanonicalField::ALL
            .into_iter()
            .map(|field| (field, table.aliases_for(field, system)))
            .collect();
        Self { aliases, weights }
    }

    fn aliases(&self, field: CanonicalField) -> &[String] {
        self.aliases
            .iter()
            .find(|(f, _)| *f == field)
            .map(|(_, aliases)| aliases.as_slice())
            .unwrap_or(&[])
    }

    /// Header-text score for an already normalized header.
    pub fn header_score(&self, field: CanonicalField, header: &str) -> (f64, MatchKind) {
        if header.is_empty() {
            return (0.0, MatchKind::Shape);
        }
        let own = self.aliases(field);
        if own.iter().any(|alias| alias == header) {
            return (1.0, MatchKind::Exact);
        }
        // A header spelled exactly like another field's alias belongs to that field.
        let exact_elsewhere = self
            .aliases
            .iter()
            .any(|(other, aliases)| *other != field && aliases.iter().any(|a| a == header));
        if exact_elsewhere {
            return (0.0, MatchKind::Shape);
        }
        if own.iter().any(|alias| contains_words(header, alias)) {
            return (self.weights.substring_credit, MatchKind::Substring);
        }
        (0.0, MatchKind::Shape)
    }

    fn score(&self, field: CanonicalField, header: &str, profile: &ShapeProfile) -> ColumnScore {
        let (header_score, kind) = self.header_score(field, header);
        let shape = profile.fraction(field.shape());
        let combined = (self.weights.header_weight * header_score
            + self.weights.shape_weight * shape)
            .clamp(0.0, 1.0);
        ColumnScore {
            header: header_score,
            shape,
            combined,
            kind,
        }
    }

    pub fn map_columns(&self, header: &[String], sample: &[RawRow], ignored: &[usize]) -> MappingOutcome {
        let normalized: Vec<String> = header.iter().map(|h| normalize_header(h)).collect();
        let profiles: Vec<ShapeProfile> = (0..header.len())
            .map(|column| {
                let values: Vec<&str> = sample.iter().filter_map(|row| row.cell(column)).collect();
                ShapeProfile::observe(&values)
            })
            .collect();

        let mut claimed = vec![false; header.len()];
        for column in ignored {
            if let Some(slot) = claimed.get_mut(*column) {
                *slot = true;
            }
        }

        let mut mappings = Vec::new();
        for field in CanonicalField::PRIORITY {
            let mut best: Option<(usize, ColumnScore)> = None;
            for column in 0..header.len() {
                if claimed[column] {
                    continue;
                }
                let score = self.score(field, &normalized[column], &profiles[column]);
                if score.combined <= self.weights.threshold {
                    continue;
                }
                let replace = match &best {
                    None => true,
                    Some((_, current)) => score.beats(current),
                };
                if replace {
                    best = Some((column, score));
                }
            }
            if let Some((column, score)) = best {
                claimed[column] = true;
                debug!(
                    "Column '{}' -> {field} (header {:.2}, shape {:.2}, {:?})",
                    header[column], score.header, score.shape, score.kind
                );
                mappings.push(ColumnMapping {
                    source_column: header[column].clone(),
                    column_index: column,
                    target_field: field,
                    confidence: score.combined,
                    match_kind: score.kind,
                });
            }
        }

        let amount_locale = mappings
            .iter()
            .find(|m| m.target_field == CanonicalField::Amount)
            .map(|m| profiles[m.column_index].locale)
            .unwrap_or_default();

        let mut outcome = MappingOutcome {
            mappings,
            warnings: Vec::new(),
            amount_locale,
        };
        for field in outcome.missing_mandatory() {
            let message = format!(
                "No column matched mandatory field '{field}'; records will carry reduced confidence"
            );
            warn!("{message}");
            outcome.warnings.push(message);
        }
        info!(
            "Mapped {} of {} column(s) to canonical fields",
            outcome.mappings.len(),
            header.len()
        );
        outcome
    }
}

/// True when the words of `alias` appear contiguously in `header`.
fn contains_words(header: &str, alias: &str) -> bool {
    let header_words: Vec<&str> = header.split(' ').collect();
    let alias_words: Vec<&str> = alias.split(' ').collect();
    if alias_words.is_empty() || alias_words.len() > header_words.len() {
        return false;
    }
    header_words
        .windows(alias_words.len())
        .any(|window| window == alias_words.as_slice())
}
