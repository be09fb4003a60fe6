//! Substitution strategy using fake data

use super::{apply_replacements, AnonymizedText, Anonymizer};
use crate::anonymization::config::AnonymizationMode;
use crate::anonymization::models::{Detection, MappingEntry, SubstitutionMapping};
use crate::domain::errors::ShroudError;
use crate::domain::Result;
use fake::faker::address::raw::{BuildingNumber, CityName, StreetName, ZipCode};
use fake::faker::company::raw::CompanyName;
use fake::faker::creditcard::raw::CreditCardNumber;
use fake::faker::internet::raw::SafeEmail;
use fake::faker::name::raw::Name;
use fake::faker::phone_number::raw::PhoneNumber;
use fake::locales::{Data, EN, FR_FR};
use fake::Fake;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

/// Locale used to generate substitutes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FakerLocale {
    #[default]
    En,
    FrFr,
}

impl FakerLocale {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::En => "en",
            Self::FrFr => "fr_fr",
        }
    }
}

impl FromStr for FakerLocale {
    type Err = ShroudError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "en" | "en_us" | "en_gb" => Ok(Self::En),
            "fr" | "fr_fr" => Ok(Self::FrFr),
            other => Err(ShroudError::Configuration(format!(
                "Unsupported faker locale: {other}"
            ))),
        }
    }
}

impl fmt::Display for FakerLocale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Substitution strategy - replaces each span with a realistic fake value of
/// the same entity type and records a reversible mapping
///
/// Identical originals of the same type receive the same substitute within
/// one call. Each call gets a fresh reverse key.
pub struct SubstitutionStrategy {
    locale: FakerLocale,
    rng: StdRng,
}

impl SubstitutionStrategy {
    /// Create a strategy seeded from system entropy
    pub fn new(locale: FakerLocale) -> Self {
        Self {
            locale,
            rng: StdRng::from_entropy(),
        }
    }

    /// Create a deterministic strategy
    pub fn with_seed(locale: FakerLocale, seed: u64) -> Self {
        Self {
            locale,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn locale(&self) -> FakerLocale {
        self.locale
    }

    /// Generate a substitute for `entity_type`
    pub fn generate(&mut self, entity_type: &str) -> String {
        match self.locale {
            FakerLocale::En => fake_value(EN, entity_type, &mut self.rng),
            FakerLocale::FrFr => fake_value(FR_FR, entity_type, &mut self.rng),
        }
    }

    /// Put the original values back into an anonymized text
    ///
    /// Longer substitutes are restored first so one substitute that contains
    /// another is not split.
    pub fn restore(anonymized: &str, mapping: &SubstitutionMapping) -> String {
        let mut entries: Vec<&MappingEntry> = mapping.values().collect();
        entries.sort_by(|a, b| b.substitute.chars().count().cmp(&a.substitute.chars().count()));

        let mut restored = anonymized.to_string();
        for entry in entries {
            if !entry.substitute.is_empty() {
                restored = restored.replacen(&entry.substitute, &entry.original, 1);
            }
        }
        restored
    }
}

impl Anonymizer for SubstitutionStrategy {
    fn mode(&self) -> AnonymizationMode {
        AnonymizationMode::Substitute
    }

    fn anonymize(&mut self, text: &str, detections: &[Detection]) -> Result<AnonymizedText> {
        let mut mapping = SubstitutionMapping::new();
        let mut issued: HashMap<(String, String), String> = HashMap::new();

        let substituted = apply_replacements(text, detections, |detection, index| {
            let cache_key = (detection.entity_type.clone(), detection.text.clone());
            let substitute = match issued.get(&cache_key) {
                Some(existing) => existing.clone(),
                None => {
                    let value = self.generate(&detection.entity_type);
                    issued.insert(cache_key, value.clone());
                    value
                }
            };

            mapping.insert(
                format!("{}_{}", detection.entity_type, index),
                MappingEntry {
                    entity_type: detection.entity_type.clone(),
                    original: detection.text.clone(),
                    substitute: substitute.clone(),
                },
            );
            substitute
        })?;

        let reverse_key = uuid::Uuid::new_v4().to_string();
        tracing::debug!(
            substitutions = mapping.len(),
            locale = %self.locale,
            reverse_key = %reverse_key,
            "Substitution mapping created"
        );

        Ok(AnonymizedText {
            text: substituted,
            mapping: Some(mapping),
            reverse_key: Some(reverse_key),
        })
    }
}

impl Default for SubstitutionStrategy {
    fn default() -> Self {
        Self::new(FakerLocale::default())
    }
}

fn fake_value<L: Data + Copy, R: Rng>(locale: L, entity_type: &str, rng: &mut R) -> String {
    match entity_type.to_uppercase().as_str() {
        "PERSON" | "PER" => Name(locale).fake_with_rng(rng),
        "PHONE" | "PHONE_NUMBER" => PhoneNumber(locale).fake_with_rng(rng),
        "EMAIL" | "EMAIL_ADDRESS" => SafeEmail(locale).fake_with_rng(rng),
        "LOCATION" | "LOC" | "CITY" => CityName(locale).fake_with_rng(rng),
        "ORGANIZATION" | "ORG" => CompanyName(locale).fake_with_rng(rng),
        "ADDRESS" => {
            let street: String = StreetName(locale).fake_with_rng(rng);
            let number: String = BuildingNumber(locale).fake_with_rng(rng);
            format!("{street} {number}")
        }
        "POSTAL_CODE" => ZipCode(locale).fake_with_rng(rng),
        "CREDIT_CARD" => CreditCardNumber(locale).fake_with_rng(rng),
        "DATE" => format!(
            "{:02}/{:02}/{}",
            rng.gen_range(1..=28),
            rng.gen_range(1..=12),
            rng.gen_range(1950..=2005)
        ),
        "TAX_ID" => fake_tax_id(rng),
        "VAT_NUMBER" => format!("IT{}", digits(rng, 11)),
        "IBAN" => format!(
            "IT{}{}{}",
            digits(rng, 2),
            letters(rng, 1),
            digits(rng, 22)
        ),
        _ => placeholder(entity_type),
    }
}

/// `[Title Case]` label for types without a generator
fn placeholder(entity_type: &str) -> String {
    let words: Vec<String> = entity_type
        .split(['_', ' '])
        .filter(|w| !w.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => {
                    first.to_uppercase().collect::<String>() + &chars.as_str().to_lowercase()
                }
                None => String::new(),
            }
        })
        .collect();
    format!("[{}]", words.join(" "))
}

/// Shape of an Italian fiscal code: 6 letters, 2 digits, letter, 2 digits,
/// letter, 3 digits, check letter
fn fake_tax_id<R: Rng>(rng: &mut R) -> String {
    format!(
        "{}{}{}{}{}{}{}",
        letters(rng, 6),
        digits(rng, 2),
        letters(rng, 1),
        digits(rng, 2),
        letters(rng, 1),
        digits(rng, 3),
        letters(rng, 1)
    )
}

fn digits<R: Rng>(rng: &mut R, count: usize) -> String {
    (0..count)
        .map(|_| char::from(b'0' + rng.gen_range(0..10u8)))
        .collect()
}

fn letters<R: Rng>(rng: &mut R, count: usize) -> String {
    (0..count)
        .map(|_| char::from(b'A' + rng.gen_range(0..26u8)))
        .collect()
}
