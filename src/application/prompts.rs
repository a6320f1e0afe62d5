//! Prompt catalog - templates loaded from an external YAML resource.
//!
//! Two templates drive the whole conversation: `extraction` (slot filling
//! and follow-up questions) and `itinerary` (final itinerary generation).
//! Both are loaded once at startup; a missing key is a fatal
//! configuration error, not something to discover mid-conversation.

use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;

use crate::domain::conversation::{ConversationHistory, PROMPT_WINDOW};
use crate::domain::trip::{TripField, TripRecord};

/// Prompt loading errors. All fatal at startup.
#[derive(Debug, Error)]
pub enum PromptError {
    #[error("failed to read prompt file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse prompt file {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("prompt file is missing required template '{key}'")]
    MissingTemplate { key: &'static str },
}

#[derive(Debug, Deserialize)]
struct RawCatalog {
    #[serde(flatten)]
    templates: HashMap<String, String>,
}

/// The two templates the planner renders.
#[derive(Debug, Clone)]
pub struct PromptCatalog {
    extraction: String,
    itinerary: String,
}

impl PromptCatalog {
    /// Loads and validates the catalog from a YAML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, PromptError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| PromptError::Io {
            path: path.display().to_string(),
            source,
        })?;

        let raw: RawCatalog = serde_yaml::from_str(&text).map_err(|source| PromptError::Parse {
            path: path.display().to_string(),
            source,
        })?;

        Self::from_templates(raw.templates)
    }

    /// Builds a catalog from already-parsed templates.
    pub fn from_templates(mut templates: HashMap<String, String>) -> Result<Self, PromptError> {
        let extraction = templates
            .remove("extraction")
            .ok_or(PromptError::MissingTemplate { key: "extraction" })?;
        let itinerary = templates
            .remove("itinerary")
            .ok_or(PromptError::MissingTemplate { key: "itinerary" })?;

        Ok(Self {
            extraction,
            itinerary,
        })
    }

    /// Renders the extraction prompt for the current turn.
    ///
    /// Missing record fields are rendered as the `no especificado` sentinel
    /// so the slot schema in the prompt stays stable across turns.
    pub fn render_extraction(
        &self,
        message: &str,
        history: &ConversationHistory,
        record: &TripRecord,
    ) -> String {
        render(
            &self.extraction,
            &[
                ("message", message.to_string()),
                (
                    "conversation_history",
                    history.render_recent(PROMPT_WINDOW),
                ),
                ("origin", record.field_or_unspecified(TripField::Origin)),
                (
                    "destination",
                    record.field_or_unspecified(TripField::Destination),
                ),
                (
                    "start_date",
                    record.field_or_unspecified(TripField::StartDate),
                ),
                ("end_date", record.field_or_unspecified(TripField::EndDate)),
                (
                    "travelers",
                    record.field_or_unspecified(TripField::Travelers),
                ),
                ("budget", record.field_or_unspecified(TripField::Budget)),
                ("preferences", record.field_or_unspecified(TripField::Notes)),
            ],
        )
    }

    /// Renders the itinerary prompt from the record and serialized search
    /// results.
    pub fn render_itinerary(&self, record: &TripRecord, search_results: &str) -> String {
        render(
            &self.itinerary,
            &[
                (
                    "destination",
                    record.field_or_unspecified(TripField::Destination),
                ),
                (
                    "start_date",
                    record.field_or_unspecified(TripField::StartDate),
                ),
                ("end_date", record.field_or_unspecified(TripField::EndDate)),
                (
                    "travelers",
                    record.field_or_unspecified(TripField::Travelers),
                ),
                ("budget", record.field_or_unspecified(TripField::Budget)),
                ("search_results", search_results.to_string()),
            ],
        )
    }
}

/// Substitutes `{name}` placeholders. Unknown placeholders are left intact
/// so a template typo shows up verbatim in logs instead of vanishing.
fn render(template: &str, values: &[(&str, String)]) -> String {
    let mut rendered = template.to_string();
    for (name, value) in values {
        rendered = rendered.replace(&format!("{{{name}}}"), value);
    }
    rendered
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_catalog(contents: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn loads_both_templates() {
        let file = write_catalog(
            "extraction: \"Mensaje: {message}\"\nitinerary: \"Destino: {destination}\"\n",
        );
        let catalog = PromptCatalog::from_file(file.path()).unwrap();

        let record = TripRecord::new();
        let history = ConversationHistory::new();
        let prompt = catalog.render_extraction("hola", &history, &record);
        assert_eq!(prompt, "Mensaje: hola");
    }

    #[test]
    fn missing_template_is_fatal() {
        let file = write_catalog("extraction: \"solo una\"\n");
        let err = PromptCatalog::from_file(file.path()).unwrap_err();
        assert!(matches!(
            err,
            PromptError::MissingTemplate { key: "itinerary" }
        ));
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let err = PromptCatalog::from_file("/nonexistent/prompts.yaml").unwrap_err();
        assert!(matches!(err, PromptError::Io { .. }));
    }

    #[test]
    fn unfilled_record_fields_render_the_sentinel() {
        let file = write_catalog(
            "extraction: \"{origin} -> {destination}\"\nitinerary: \"x\"\n",
        );
        let catalog = PromptCatalog::from_file(file.path()).unwrap();

        let mut record = TripRecord::new();
        record.destination = Some("Madrid".to_string());
        let history = ConversationHistory::new();

        let prompt = catalog.render_extraction("hola", &history, &record);
        assert_eq!(prompt, "no especificado -> Madrid");
    }

    #[test]
    fn itinerary_prompt_embeds_search_results() {
        let file = write_catalog(
            "extraction: \"x\"\nitinerary: \"Viaje a {destination}: {search_results}\"\n",
        );
        let catalog = PromptCatalog::from_file(file.path()).unwrap();

        let mut record = TripRecord::new();
        record.destination = Some("Roma".to_string());

        let prompt = catalog.render_itinerary(&record, "[\"Coliseo\"]");
        assert_eq!(prompt, "Viaje a Roma: [\"Coliseo\"]");
    }

    #[test]
    fn unknown_placeholders_are_left_intact() {
        let catalog = PromptCatalog::from_templates(HashMap::from([
            ("extraction".to_string(), "{message} {typo_field}".to_string()),
            ("itinerary".to_string(), "x".to_string()),
        ]))
        .unwrap();

        let prompt = catalog.render_extraction(
            "hola",
            &ConversationHistory::new(),
            &TripRecord::new(),
        );
        assert_eq!(prompt, "hola {typo_field}");
    }
}
