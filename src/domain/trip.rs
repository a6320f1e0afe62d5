//! Trip record - the slot-filling structure assembled across conversation turns.
//!
//! Each conversation owns one `TripRecord`. Fields start empty and are filled
//! by merging `SlotUpdates` extracted from model replies. Merges never clear a
//! populated field; the `no especificado` sentinel is ignored.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::extractor::SlotUpdates;

/// Sentinel the model emits for fields it could not determine.
pub const UNSPECIFIED: &str = "no especificado";

/// The structured representation of a trip being assembled.
///
/// Required fields are origin, destination, start_date, end_date,
/// num_travelers and budget; `additional_notes` is optional free text.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TripRecord {
    pub origin: Option<String>,
    pub destination: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub num_travelers: Option<u32>,
    pub budget: Option<String>,
    pub additional_notes: Option<String>,
}

impl TripRecord {
    /// Creates an empty record.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the Spanish labels of the required fields still missing,
    /// in fixed order.
    pub fn missing_fields(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.origin.is_none() {
            missing.push("origen");
        }
        if self.destination.is_none() {
            missing.push("destino");
        }
        if self.start_date.is_none() {
            missing.push("fecha de inicio");
        }
        if self.end_date.is_none() {
            missing.push("fecha de fin");
        }
        if self.num_travelers.is_none() {
            missing.push("número de viajeros");
        }
        if self.budget.is_none() {
            missing.push("presupuesto");
        }
        missing
    }

    /// True iff all six required fields are populated.
    pub fn is_complete(&self) -> bool {
        self.missing_fields().is_empty()
    }

    /// Merges extracted slot updates into the record.
    ///
    /// A field is overwritten only when the incoming value is present,
    /// non-empty and not the `no especificado` sentinel. A later turn can
    /// replace a value with a more specific one, but never erase it.
    pub fn merge(&mut self, updates: &SlotUpdates) {
        if let Some(value) = updates.origin() {
            self.origin = Some(value);
        }
        if let Some(value) = updates.destination() {
            self.destination = Some(value);
        }
        if let Some(value) = updates.start_date() {
            self.start_date = Some(value);
        }
        if let Some(value) = updates.end_date() {
            self.end_date = Some(value);
        }
        if let Some(value) = updates.num_travelers() {
            self.num_travelers = Some(value);
        }
        if let Some(value) = updates.budget() {
            self.budget = Some(value);
        }
        if let Some(value) = updates.additional_notes() {
            self.additional_notes = Some(value);
        }
    }

    /// Renders a field for prompt interpolation, using the sentinel for gaps.
    ///
    /// Missing fields are never rendered blank so the prompt's slot schema
    /// stays stable across turns.
    pub fn field_or_unspecified(&self, field: TripField) -> String {
        let value = match field {
            TripField::Origin => self.origin.clone(),
            TripField::Destination => self.destination.clone(),
            TripField::StartDate => self.start_date.clone(),
            TripField::EndDate => self.end_date.clone(),
            TripField::Travelers => self.num_travelers.map(|n| n.to_string()),
            TripField::Budget => self.budget.clone(),
            TripField::Notes => self.additional_notes.clone(),
        };
        value.unwrap_or_else(|| UNSPECIFIED.to_string())
    }
}

/// The prompt-addressable fields of a trip record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TripField {
    Origin,
    Destination,
    StartDate,
    EndDate,
    Travelers,
    Budget,
    Notes,
}

impl fmt::Display for TripRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Current Travel Info:")?;
        writeln!(f, "Origin: {}", self.field_or_unspecified(TripField::Origin))?;
        writeln!(
            f,
            "Destination: {}",
            self.field_or_unspecified(TripField::Destination)
        )?;
        writeln!(
            f,
            "Start Date: {}",
            self.field_or_unspecified(TripField::StartDate)
        )?;
        writeln!(f, "End Date: {}", self.field_or_unspecified(TripField::EndDate))?;
        writeln!(
            f,
            "Travelers: {}",
            self.field_or_unspecified(TripField::Travelers)
        )?;
        write!(f, "Budget: {}", self.field_or_unspecified(TripField::Budget))?;
        if self.additional_notes.is_some() {
            write!(
                f,
                "\nAdditional Notes: {}",
                self.field_or_unspecified(TripField::Notes)
            )?;
        }
        Ok(())
    }
}
