//! Detection and anonymization result models

pub mod detection;
pub mod result;

pub use detection::{entity_types, Detection};
pub use result::{AnonymizationResult, MappingEntry, SubstitutionMapping};
