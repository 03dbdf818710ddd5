use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::codec::{self, Ingredient};

/// Whether a drink contains alcohol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub enum DrinkKind {
    #[default]
    Cocktail,
    Mocktail,
}

impl DrinkKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DrinkKind::Cocktail => "Cocktail",
            DrinkKind::Mocktail => "Mocktail",
        }
    }
}

impl fmt::Display for DrinkKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownDrinkKind(pub String);

impl fmt::Display for UnknownDrinkKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Unknown drink kind: {}", self.0)
    }
}

impl std::error::Error for UnknownDrinkKind {}

impl FromStr for DrinkKind {
    type Err = UnknownDrinkKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "cocktail" => Ok(DrinkKind::Cocktail),
            "mocktail" => Ok(DrinkKind::Mocktail),
            other => Err(UnknownDrinkKind(other.to_string())),
        }
    }
}

impl<'de> Deserialize<'de> for DrinkKind {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Reference to a drink photo: either a URL or an embedded `data:` URL.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ImageRef(pub String);

impl ImageRef {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// True for inline `data:` payloads, false for links.
    pub fn is_embedded(&self) -> bool {
        self.0.starts_with("data:")
    }
}

impl fmt::Display for ImageRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn default_available() -> bool {
    true
}

/// A drink recipe as stored.
///
/// `specs` is always the serialized form of the last-saved ingredient list; edit it through
/// [`DrinkInput::ingredients`], never directly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Drink {
    pub id: String,
    pub name: String,
    pub kind: DrinkKind,
    #[serde(default)]
    pub build: String,
    #[serde(default)]
    pub glass: String,
    #[serde(default)]
    pub garnish: String,
    #[serde(default)]
    pub specs: Vec<String>,
    #[serde(default = "default_available")]
    pub available: bool,
    #[serde(default)]
    pub image: Option<ImageRef>,
}

impl Drink {
    /// Structured rows reconstructed from the stored spec lines.
    pub fn ingredients(&self) -> Vec<Ingredient> {
        codec::parse(&self.specs)
    }
}

/// Caller-supplied fields for creating or replacing a drink.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DrinkInput {
    /// Existing identity; `None` creates a new record.
    pub id: Option<String>,
    pub name: String,
    pub kind: DrinkKind,
    pub build: String,
    pub glass: String,
    pub garnish: String,
    pub ingredients: Vec<Ingredient>,
    /// Defaults to available.
    pub available: Option<bool>,
    pub image: Option<ImageRef>,
}

impl DrinkInput {
    pub fn new(name: impl Into<String>, kind: DrinkKind) -> Self {
        Self {
            name: name.into(),
            kind,
            ..Self::default()
        }
    }

    pub fn with_ingredients(mut self, ingredients: Vec<Ingredient>) -> Self {
        self.ingredients = ingredients;
        self
    }

    /// Spec lines this input will be stored with.
    pub fn specs(&self) -> Vec<String> {
        codec::serialize(&self.ingredients)
    }
}

impl From<&Drink> for DrinkInput {
    fn from(drink: &Drink) -> Self {
        Self {
            id: Some(drink.id.clone()).filter(|id| !id.is_empty()),
            name: drink.name.clone(),
            kind: drink.kind,
            build: drink.build.clone(),
            glass: drink.glass.clone(),
            garnish: drink.garnish.clone(),
            ingredients: drink.ingredients(),
            available: Some(drink.available),
            image: drink.image.clone(),
        }
    }
}

/// Single-field updates that can be applied without rewriting the whole drink.
#[derive(Debug, Clone, PartialEq)]
pub enum DrinkField {
    Available(bool),
    Image(ImageRef),
}
