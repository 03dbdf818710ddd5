//! Ingredient spec codec
//!
//! Converts between the structured ingredient rows used while editing a drink and the
//! human-readable spec lines stored on the drink record (`"2 oz white rum"`,
//! `"top up soda"`).
//!
//! The transform is pure and stateless. Lines produced by [`serialize`] always parse back to
//! the same rows; free text that does not follow the grammar is kept as an ingredient name
//! with no amount.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

static TOP_UP_LINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^top\s*up\s+(.+)$").unwrap_or_else(|e| panic!("invalid top-up pattern: {e}"))
});

// Longer unit names come first: the regex engine picks the leftmost alternative, so
// `dash` would otherwise shadow `dashes`.
static MEASURED_LINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^(\d+(?:\.\d+)?|\.\d+)\s*(dashes|dash|splashes|splash|oz)\s+(.+)$")
        .unwrap_or_else(|e| panic!("invalid measured-line pattern: {e}"))
});

/// Measure used by an ingredient row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Unit {
    #[default]
    #[serde(rename = "oz")]
    Oz,
    #[serde(rename = "dash")]
    Dash,
    #[serde(rename = "dashes")]
    Dashes,
    #[serde(rename = "splash")]
    Splash,
    #[serde(rename = "splashes")]
    Splashes,
    /// Fill the glass; carries no amount.
    #[serde(rename = "top up", alias = "top-up")]
    TopUp,
}

impl Unit {
    pub const ALL: [Unit; 6] = [
        Unit::Oz,
        Unit::Dash,
        Unit::Dashes,
        Unit::Splash,
        Unit::Splashes,
        Unit::TopUp,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Unit::Oz => "oz",
            Unit::Dash => "dash",
            Unit::Dashes => "dashes",
            Unit::Splash => "splash",
            Unit::Splashes => "splashes",
            Unit::TopUp => "top up",
        }
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a unit name is not one of the known measures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownUnit(pub String);

impl fmt::Display for UnknownUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Unknown ingredient unit: {}", self.0)
    }
}

impl std::error::Error for UnknownUnit {}

impl FromStr for Unit {
    type Err = UnknownUnit;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "oz" => Ok(Unit::Oz),
            "dash" => Ok(Unit::Dash),
            "dashes" => Ok(Unit::Dashes),
            "splash" => Ok(Unit::Splash),
            "splashes" => Ok(Unit::Splashes),
            "top up" | "top-up" | "topup" => Ok(Unit::TopUp),
            other => Err(UnknownUnit(other.to_string())),
        }
    }
}

/// One editable ingredient row.
///
/// `amount` is kept as the text the user typed so it renders back exactly as given.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Ingredient {
    pub amount: String,
    pub unit: Unit,
    pub name: String,
}

impl Ingredient {
    pub fn new(amount: impl Into<String>, unit: Unit, name: impl Into<String>) -> Self {
        Self {
            amount: amount.into(),
            unit,
            name: name.into(),
        }
    }

    /// A top-up row for `name`.
    pub fn top_up(name: impl Into<String>) -> Self {
        Self::new("", Unit::TopUp, name)
    }

    /// The empty row an edit form starts with.
    pub fn placeholder() -> Self {
        Self::default()
    }

    /// Render this row as a spec line, or `None` if the row is incomplete.
    pub fn to_line(&self) -> Option<String> {
        let amount = self.amount.trim();
        let name = self.name.trim();
        if name.is_empty() {
            return None;
        }
        if self.unit == Unit::TopUp {
            return Some(format!("top up {name}"));
        }
        if amount.is_empty() {
            return None;
        }
        Some(format!("{amount} {} {name}", self.unit))
    }
}

/// Render ingredient rows as spec lines, dropping incomplete rows.
pub fn serialize(ingredients: &[Ingredient]) -> Vec<String> {
    ingredients.iter().filter_map(Ingredient::to_line).collect()
}

/// Parse a single spec line.
///
/// Lines outside the grammar become a name-only row with the default unit.
pub fn parse_line(line: &str) -> Ingredient {
    let trimmed = line.trim();

    if let Some(caps) = TOP_UP_LINE.captures(trimmed) {
        return Ingredient::top_up(caps[1].trim());
    }

    match MEASURED_LINE.captures(trimmed) {
        Some(caps) => {
            let unit = caps[2].parse().unwrap_or_default();
            Ingredient::new(&caps[1], unit, caps[3].trim())
        }
        None => Ingredient::new("", Unit::Oz, trimmed),
    }
}

/// Whether `line` follows the spec-line grammar.
///
/// Lines that do not are reinterpreted lossily by [`parse_line`]; callers can use this to flag
/// legacy free text for review.
pub fn is_structured(line: &str) -> bool {
    let trimmed = line.trim();
    TOP_UP_LINE.is_match(trimmed) || MEASURED_LINE.is_match(trimmed)
}

/// Parse spec lines into ingredient rows.
///
/// Always returns at least one row: an empty placeholder when nothing usable was parsed.
pub fn parse<S: AsRef<str>>(lines: &[S]) -> Vec<Ingredient> {
    let parsed: Vec<Ingredient> = lines
        .iter()
        .map(|line| parse_line(line.as_ref()))
        .filter(|ingredient| !ingredient.name.is_empty())
        .collect();

    if parsed.is_empty() {
        vec![Ingredient::placeholder()]
    } else {
        parsed
    }
}
