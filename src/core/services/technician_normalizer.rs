use std::collections::BTreeSet;
use std::sync::OnceLock;

use regex::Regex;

use crate::core::models::customer::UNASSIGNED;

/// Lower-cased spellings that all mean "no technician assigned".
const UNASSIGNED_SYNONYMS: [&str; 8] = [
    "",
    "n/a",
    "none",
    "unassigned",
    "sem piscineiro",
    "sem piscinero",
    "nao atribuido",
    "não atribuído",
];

fn trailing_periods() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[\s.]*\.$").expect("static regex"))
}

fn whitespace_runs() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\s+").expect("static regex"))
}

fn multi_separator() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\s*,\s*").expect("static regex"))
}

/// Canonicalize a free-text technician name.
///
/// - `None`, blanks and "unassigned" synonyms become [`UNASSIGNED`]
/// - trailing periods are stripped (`"Lucca ."` → `"Lucca"`)
/// - internal whitespace collapses to single spaces
/// - everything else is title-cased
///
/// The function is idempotent: normalizing an already-normalized name
/// returns it unchanged.
pub fn normalize(raw: Option<&str>) -> String {
    let Some(raw) = raw else {
        return UNASSIGNED.to_string();
    };

    let cleaned = trailing_periods().replace(raw.trim(), "");
    let cleaned = whitespace_runs().replace_all(cleaned.trim(), " ");
    let cleaned = cleaned.trim();

    if is_unassigned(cleaned) {
        return UNASSIGNED.to_string();
    }

    title_case(cleaned)
}

/// Whether `name` (already trimmed) is one of the unassigned synonyms.
fn is_unassigned(name: &str) -> bool {
    let lowered = name.to_lowercase();
    UNASSIGNED_SYNONYMS.contains(&lowered.as_str())
}

/// Upper-case the first letter of every word and lower-case the rest.
/// Words break on whitespace, hyphens and apostrophes.
///
/// A first letter whose upper case is several characters (`ß`, `ﬁ`) is
/// kept as is; expanding it would change the word on every pass.
fn title_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut at_word_start = true;
    for ch in s.chars() {
        if at_word_start {
            let mut upper = ch.to_uppercase();
            match (upper.next(), upper.next()) {
                (Some(single), None) => out.push(single),
                _ => out.push(ch),
            }
        } else {
            out.extend(ch.to_lowercase());
        }
        at_word_start = ch.is_whitespace() || ch == '-' || ch == '\'';
    }
    out
}

/// Split a comma-separated technician field and normalize each part.
pub fn split_multi(raw: &str) -> Vec<String> {
    multi_separator()
        .split(raw)
        .map(|part| normalize(Some(part)))
        .collect()
}

/// Distinct, sorted technicians across a set of raw values, without the
/// unassigned token. Multi-valued cells contribute every listed name.
pub fn distinct_technicians<'a, I>(values: I) -> Vec<String>
where
    I: IntoIterator<Item = &'a str>,
{
    let set: BTreeSet<String> = values
        .into_iter()
        .flat_map(split_multi)
        .filter(|name| name != UNASSIGNED)
        .collect();
    set.into_iter().collect()
}
