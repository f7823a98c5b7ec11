//! Named coercion functions for raw cell text.
//!
//! Every conversion the pipeline performs on a cell goes through one of these
//! helpers: header normalization, placeholder detection, date parsing across
//! the accepted formats, locale-aware amount parsing and transaction type
//! synonyms.

use std::{str::FromStr, sync::OnceLock};

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime};
use regex::Regex;
use rust_decimal::{Decimal, prelude::ToPrimitive};
use serde::{Deserialize, Serialize};

use crate::model::TransactionType;

const DATE_FORMATS: &[&str] = &["%d/%m/%Y", "%d-%m-%Y", "%d.%m.%Y", "%Y/%m/%d", "%d/%m/%y"];
const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
];
const HEADER_STOPWORDS: &[&str] = &["de", "du", "des", "la", "le", "les", "of", "the"];
const CURRENCY_CODES: &[&str] = &["EUR", "USD", "GBP", "CHF", "CAD", "XOF"];

pub fn fold_accents(value: &str) -> String {
    let mut folded = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            'à' | 'á' | 'â' | 'ã' | 'ä' | 'å' => folded.push('a'),
            'À' | 'Á' | 'Â' | 'Ã' | 'Ä' | 'Å' => folded.push('A'),
            'ç' => folded.push('c'),
            'Ç' => folded.push('C'),
            'è' | 'é' | 'ê' | 'ë' => folded.push('e'),
            'È' | 'É' | 'Ê' | 'Ë' => folded.push('E'),
            'ì' | 'í' | 'î' | 'ï' => folded.push('i'),
            'Ì' | 'Í' | 'Î' | 'Ï' => folded.push('I'),
            'ñ' => folded.push('n'),
            'Ñ' => folded.push('N'),
            'ò' | 'ó' | 'ô' | 'õ' | 'ö' => folded.push('o'),
            'Ò' | 'Ó' | 'Ô' | 'Õ' | 'Ö' => folded.push('O'),
            'ù' | 'ú' | 'û' | 'ü' => folded.push('u'),
            'Ù' | 'Ú' | 'Û' | 'Ü' => folded.push('U'),
            'ý' | 'ÿ' => folded.push('y'),
            'œ' => folded.push_str("oe"),
            'Œ' => folded.push_str("OE"),
            'æ' => folded.push_str("ae"),
            'Æ' => folded.push_str("AE"),
            'ß' => folded.push_str("ss"),
            other => folded.push(other),
        }
    }
    folded
}

/// Lowercases, strips accents and punctuation, splits camelCase and drops
/// elisions and articles, so `"Date d'opération"` becomes `"date operation"`.
pub fn normalize_header(header: &str) -> String {
    let mut spaced = String::with_capacity(header.len() + 4);
    let mut previous_lower = false;
    for ch in fold_accents(header.trim()).chars() {
        if ch.is_uppercase() && previous_lower {
            spaced.push(' ');
        }
        previous_lower = ch.is_lowercase() || ch.is_ascii_digit();
        if ch.is_alphanumeric() {
            spaced.extend(ch.to_lowercase());
        } else {
            spaced.push(' ');
        }
    }
    spaced
        .split_whitespace()
        .filter(|token| {
            !(token.len() == 1 && token.chars().all(|c| c.is_alphabetic()))
                && !HEADER_STOPWORDS.contains(token)
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Folds a free-text token for synonym lookups (`"Dépense "` -> `"depense"`).
pub fn normalize_token(value: &str) -> String {
    fold_accents(value.trim()).to_lowercase()
}

pub fn is_placeholder(value: &str) -> bool {
    let lowered = value.trim().to_ascii_lowercase();
    let stripped = lowered.trim_start_matches('#');
    matches!(
        stripped,
        "na" | "n/a" | "n.a." | "null" | "none" | "nil" | "nan" | "unknown" | "missing" | "-"
    ) || (!stripped.is_empty() && stripped.chars().all(|c| c == '-'))
}

fn plausible(date: NaiveDate) -> Option<NaiveDate> {
    (1900..2200).contains(&date.year()).then_some(date)
}

/// Parses a calendar date, trying ISO 8601 first, then day-first numeric
/// layouts, then French or English month names. First success wins.
pub fn parse_date(value: &str) -> Option<NaiveDate> {
    let trimmed = value.trim();
    if trimmed.is_empty() || is_placeholder(trimmed) {
        return None;
    }

    if let Some(date) = parse_iso_date(trimmed) {
        return Some(date);
    }
    if let Some(date) = parse_numeric_date(trimmed) {
        return Some(date);
    }
    // "01/10/2024 00:00:00" and similar exports carry a time we ignore.
    if let Some((head, tail)) = trimmed.split_once(' ')
        && tail.trim_start().starts_with(|c: char| c.is_ascii_digit())
        && tail.contains(':')
        && let Some(date) = parse_numeric_date(head)
    {
        return Some(date);
    }
    parse_month_name_date(trimmed)
}

fn parse_iso_date(value: &str) -> Option<NaiveDate> {
    if let Ok(date) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        return plausible(date);
    }
    if let Ok(parsed) = DateTime::parse_from_rfc3339(value) {
        return plausible(parsed.date_naive());
    }
    DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())
        .and_then(|dt| plausible(dt.date()))
}

fn parse_numeric_date(value: &str) -> Option<NaiveDate> {
    DATE_FORMATS
        .iter()
        .filter_map(|fmt| NaiveDate::parse_from_str(value, fmt).ok())
        .find_map(plausible)
}

fn day_first_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^(\d{1,2})(?:er|st|nd|rd|th)?[\s\-/.]+([a-z]+)\.?[\s\-/.,]+(\d{4}|\d{2})$")
            .expect("valid day-first date pattern")
    })
}

fn month_first_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^([a-z]+)\.?\s+(\d{1,2})(?:st|nd|rd|th)?,?\s+(\d{4})$")
            .expect("valid month-first date pattern")
    })
}

fn parse_month_name_date(value: &str) -> Option<NaiveDate> {
    let folded = normalize_token(value);
    let (day, month, year) = if let Some(caps) = day_first_pattern().captures(&folded) {
        (caps[1].to_string(), caps[2].to_string(), caps[3].to_string())
    } else if let Some(caps) = month_first_pattern().captures(&folded) {
        (caps[2].to_string(), caps[1].to_string(), caps[3].to_string())
    } else {
        return None;
    };
    let day: u32 = day.parse().ok()?;
    let month = month_from_name(&month)?;
    let mut year: i32 = year.parse().ok()?;
    if year < 100 {
        year += 2000;
    }
    NaiveDate::from_ymd_opt(year, month, day).and_then(plausible)
}

fn month_from_name(name: &str) -> Option<u32> {
    let month = match name {
        "janvier" | "janv" | "jan" | "january" => 1,
        "fevrier" | "fevr" | "fev" | "feb" | "february" => 2,
        "mars" | "mar" | "march" => 3,
        "avril" | "avr" | "apr" | "april" => 4,
        "mai" | "may" => 5,
        "juin" | "jun" | "june" => 6,
        "juillet" | "juil" | "jul" | "july" => 7,
        "aout" | "aou" | "aug" | "august" => 8,
        "septembre" | "sept" | "sep" | "september" => 9,
        "octobre" | "oct" | "october" => 10,
        "novembre" | "nov" | "november" => 11,
        "decembre" | "dec" | "december" => 12,
        _ => return None,
    };
    Some(month)
}

/// Decimal separator convention of an export.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NumberLocale {
    /// `1,234.56`
    #[default]
    DecimalPoint,
    /// `1 234,56` or `1.234,56`
    DecimalComma,
}

impl NumberLocale {
    pub fn decimal_separator(&self) -> char {
        match self {
            NumberLocale::DecimalPoint => '.',
            NumberLocale::DecimalComma => ',',
        }
    }

    fn for_decimal_separator(separator: char) -> Self {
        if separator == ',' {
            NumberLocale::DecimalComma
        } else {
            NumberLocale::DecimalPoint
        }
    }

    fn opposite(&self) -> Self {
        match self {
            NumberLocale::DecimalPoint => NumberLocale::DecimalComma,
            NumberLocale::DecimalComma => NumberLocale::DecimalPoint,
        }
    }
}

/// What a single value says about the decimal separator, if anything.
/// `1,250` or `3.500` are ambiguous and cast no vote.
fn separator_vote(value: &str) -> Option<NumberLocale> {
    let separators: Vec<(usize, char)> = value
        .char_indices()
        .filter(|(_, c)| matches!(c, '.' | ','))
        .collect();
    let (last_index, last) = *separators.last()?;
    if separators.iter().any(|(_, c)| *c != last) {
        return Some(NumberLocale::for_decimal_separator(last));
    }
    if separators.len() > 1 {
        return Some(NumberLocale::for_decimal_separator(last).opposite());
    }
    let digits_after = value[last_index + 1..]
        .chars()
        .take_while(|c| c.is_ascii_digit())
        .count();
    (digits_after != 3).then(|| NumberLocale::for_decimal_separator(last))
}

/// Picks the separator convention most consistent across sampled cells.
/// Ties and samples without any unambiguous value fall back to a decimal point.
pub fn detect_number_locale<'a, I>(values: I) -> NumberLocale
where
    I: IntoIterator<Item = &'a str>,
{
    let (mut point, mut comma) = (0usize, 0usize);
    for value in values {
        match separator_vote(value) {
            Some(NumberLocale::DecimalPoint) => point += 1,
            Some(NumberLocale::DecimalComma) => comma += 1,
            None => {}
        }
    }
    if comma > point {
        NumberLocale::DecimalComma
    } else {
        NumberLocale::DecimalPoint
    }
}

/// Parses a monetary amount. Currency symbols or codes and grouping
/// separators are stripped; a leading or trailing minus and accounting
/// parentheses both yield a negative value. `None` when nothing numeric is left.
pub fn parse_amount(value: &str, locale: NumberLocale) -> Option<f64> {
    let mut body = value.trim();
    if body.is_empty() {
        return None;
    }
    let mut negative = false;
    if let Some(inner) = body.strip_prefix('(').and_then(|v| v.strip_suffix(')')) {
        negative = true;
        body = inner.trim();
    }

    let cleaned = strip_currency(body)?;
    let mut text = cleaned.as_str();
    if let Some(rest) = text.strip_prefix('-') {
        negative = true;
        text = rest;
    } else if let Some(rest) = text.strip_prefix('+') {
        text = rest;
    } else if let Some(rest) = text.strip_suffix('-') {
        negative = true;
        text = rest;
    }

    let canonical = canonical_numeral(text, locale)?;
    let amount = Decimal::from_str(&canonical).ok()?.to_f64()?;
    if !amount.is_finite() {
        return None;
    }
    Some(if negative { -amount } else { amount })
}

fn strip_currency(body: &str) -> Option<String> {
    let mut text = body.trim();
    for code in CURRENCY_CODES {
        if text.len() <= code.len() {
            continue;
        }
        let split = text.len() - code.len();
        if text.get(..code.len()).is_some_and(|head| head.eq_ignore_ascii_case(code)) {
            text = &text[code.len()..];
        } else if text.get(split..).is_some_and(|tail| tail.eq_ignore_ascii_case(code)) {
            text = &text[..split];
        }
    }

    let mut cleaned = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '0'..='9' | '.' | ',' | '-' | '+' => cleaned.push(ch),
            '€' | '$' | '£' | '¥' | '\'' | '’' => {}
            c if c.is_whitespace() => {}
            _ => return None,
        }
    }
    Some(cleaned)
}

fn canonical_numeral(text: &str, locale: NumberLocale) -> Option<String> {
    if !text.chars().any(|c| c.is_ascii_digit()) || text.contains(['-', '+']) {
        return None;
    }
    let separators: Vec<(usize, char)> = text
        .char_indices()
        .filter(|(_, c)| matches!(c, '.' | ','))
        .collect();

    let decimal_at = match separators.as_slice() {
        [] => None,
        [(index, sep)] => {
            let digits_after = text.len() - index - 1;
            if digits_after == 3 && *sep != locale.decimal_separator() {
                None
            } else {
                Some(*index)
            }
        }
        [.., (last_index, last)] => {
            if separators.iter().all(|(_, c)| c == last) {
                None
            } else if separators[..separators.len() - 1]
                .iter()
                .any(|(_, c)| c == last)
            {
                return None;
            } else {
                Some(*last_index)
            }
        }
    };

    let mut canonical = String::with_capacity(text.len() + 2);
    for (index, ch) in text.char_indices() {
        match ch {
            '.' | ',' if Some(index) == decimal_at => {
                if canonical.is_empty() {
                    canonical.push('0');
                }
                canonical.push('.');
            }
            '.' | ',' => {}
            digit => canonical.push(digit),
        }
    }
    if canonical.ends_with('.') {
        canonical.push('0');
    }
    Some(canonical)
}

/// Maps an explicit type cell to income or expense, accepting English and
/// French accounting vocabulary.
pub fn parse_transaction_type(value: &str) -> Option<TransactionType> {
    let token = normalize_token(value);
    match token.as_str() {
        "income" | "revenue" | "revenu" | "revenus" | "recette" | "recettes" | "entree"
        | "entrees" | "credit" | "cr" | "encaissement" | "vente" | "ventes" | "produit"
        | "produits" | "inflow" | "in" | "deposit" | "receipt" => Some(TransactionType::Income),
        "expense" | "expenses" | "depense" | "depenses" | "sortie" | "sorties" | "debit"
        | "db" | "dr" | "decaissement" | "achat" | "achats" | "charge" | "charges"
        | "outflow" | "out" | "withdrawal" | "payment" => Some(TransactionType::Expense),
        _ => None,
    }
}
