//! Travel planner - the per-turn conversation controller.
//!
//! Each user message runs through the same pipeline: obtain a credential,
//! render the extraction prompt, invoke the model (rotating credentials on
//! rate limits), extract slot updates from the raw reply, merge them into
//! the trip record, then decide the turn's outcome from the record's
//! completeness and the session flags.
//!
//! Every failure resolves to a user-facing Spanish message; a turn never
//! returns an error to the caller.

use std::sync::Arc;
use uuid::Uuid;

use crate::application::credentials::{CredentialError, CredentialPool};
use crate::application::prompts::PromptCatalog;
use crate::application::search::{AggregateError, SearchAggregator};
use crate::domain::conversation::{ConversationHistory, Turn};
use crate::domain::extractor::SlotExtractor;
use crate::domain::phase::{is_affirmative, plan_turn, TurnAction};
use crate::domain::trip::{TripField, TripRecord};
use crate::ports::{AIError, AIProvider, CompletionRequest, SearchProvider};

/// Start marker for the user-visible portion of a model reply.
const RESPONSE_OPEN: &str = "<RESPONSE>";
/// End marker for the user-visible portion of a model reply.
const RESPONSE_CLOSE: &str = "</RESPONSE>";

const MSG_MALFORMED_REPLY: &str =
    "Lo siento, hubo un problema al procesar la respuesta. Por favor, intentá nuevamente. 🔧";
const MSG_SERVICE_UNAVAILABLE: &str = "Lo siento, el servicio está temporalmente no disponible. \
     Por favor, intentá nuevamente en unos minutos. 🔄";
const MSG_GENERIC_PROBLEM: &str = "Disculpá, hubo un problema al procesar tu mensaje. \
     Por favor, intentá nuevamente. Si el problema persiste, contactá al soporte. 🔧";
const MSG_NO_RESULTS: &str = "No pude encontrar información sobre ese destino. \
     ¿Podrías confirmar si el destino está bien escrito? 🤔";
const MSG_ITINERARY_BUSY: &str =
    "El servicio está temporalmente ocupado. Por favor, intentá nuevamente en unos minutos. 🕒";
const MSG_ITINERARY_PROBLEM: &str = "Hubo un problema al generar el itinerario. \
     Por favor, intentá nuevamente. Si el problema persiste, contactá al soporte. 🔧";

/// Per-conversation state: the record being filled, the dialogue so far,
/// and the once-per-session flags.
#[derive(Debug, Clone, Default)]
pub struct TripSession {
    pub id: Uuid,
    pub record: TripRecord,
    pub history: ConversationHistory,
    pub search_completed: bool,
    pub itinerary_created: bool,
}

impl TripSession {
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            record: TripRecord::new(),
            history: ConversationHistory::new(),
            search_completed: false,
            itinerary_created: false,
        }
    }

    /// Starts the conversation over: new record, empty history, flags
    /// cleared. The session id is kept for log continuity.
    pub fn reset(&mut self) {
        self.record = TripRecord::new();
        self.history = ConversationHistory::new();
        self.search_completed = false;
        self.itinerary_created = false;
    }
}

/// Why a generation attempt could not produce text.
enum GenerationFailure {
    /// Every credential sits inside a rate-limit window.
    AllExhausted(CredentialError),
    /// The provider failed with something rotation cannot fix.
    Provider(AIError),
}

/// The conversation controller.
pub struct TravelPlanner<P, S> {
    provider: P,
    pool: Arc<CredentialPool>,
    prompts: PromptCatalog,
    aggregator: SearchAggregator<S>,
    extractor: SlotExtractor,
    temperature: f32,
}

impl<P: AIProvider, S: SearchProvider> TravelPlanner<P, S> {
    pub fn new(
        provider: P,
        pool: Arc<CredentialPool>,
        prompts: PromptCatalog,
        aggregator: SearchAggregator<S>,
        temperature: f32,
    ) -> Self {
        Self {
            provider,
            pool,
            prompts,
            aggregator,
            extractor: SlotExtractor::new(),
            temperature,
        }
    }

    /// Processes one user turn and returns the assistant's reply.
    ///
    /// Never fails: every error path resolves to a user-facing message.
    pub async fn process_message(&self, session: &mut TripSession, message: &str) -> String {
        tracing::debug!(session = %session.id, record = %session.record, "turn started");

        // Appended exactly once; credential rotation retries the model call,
        // not this whole method, so re-entry cannot duplicate the entry.
        session.history.push(Turn::user(message));

        let prompt =
            self.prompts
                .render_extraction(message, &session.history, &session.record);

        let raw_reply = match self.generate(&prompt).await {
            Ok(text) => text,
            Err(failure) => return self.describe_turn_failure(failure),
        };

        let visible = extract_delimited(&raw_reply)
            .unwrap_or_else(|| MSG_MALFORMED_REPLY.to_string());

        // Slot updates can sit outside the delimited region, so extraction
        // looks at the full raw reply.
        match self.extractor.extract(&raw_reply) {
            Ok(updates) if updates.is_empty() => {
                tracing::debug!(session = %session.id, "payload carried no usable fields");
            }
            Ok(updates) => {
                session.record.merge(&updates);
                tracing::debug!(session = %session.id, record = %session.record, "record updated");
            }
            Err(_) => {
                tracing::debug!(session = %session.id, "no structured data this turn");
            }
        }

        let decision = plan_turn(
            session.record.is_complete(),
            is_affirmative(message),
            session.search_completed,
        );
        tracing::debug!(session = %session.id, phase = ?decision.phase, "turn decided");

        match decision.action {
            TurnAction::RelayModelReply => {
                session.history.push(Turn::assistant(&visible));
                visible
            }
            TurnAction::AskConfirmation => {
                let summary = self.confirmation_summary(&session.record);
                session.history.push(Turn::assistant(&summary));
                summary
            }
            TurnAction::RunSearch => self.run_search_and_itinerary(session).await,
        }
    }

    /// SEARCHING phase: research the destination, then generate the
    /// itinerary from the aggregated results.
    async fn run_search_and_itinerary(&self, session: &mut TripSession) -> String {
        session.search_completed = true;

        let destination = session.record.field_or_unspecified(TripField::Destination);
        let searching_msg = format!(
            "¡Excelente! Vamos a crear un itinerario increíble para tu viaje a {destination}. \n\n\
             Comenzaré buscando las mejores actividades y lugares que se ajusten a tus intereses y presupuesto.\n\n\
             Dame un momento mientras preparo un itinerario detallado para vos... ✨"
        );
        session.history.push(Turn::assistant(&searching_msg));

        let bundle = match self.aggregator.aggregate(&session.record).await {
            Ok(bundle) => bundle,
            Err(AggregateError::NoResults) => {
                // Recoverable: let the user fix the destination and confirm
                // again.
                session.search_completed = false;
                tracing::info!(session = %session.id, "search produced no results");
                return MSG_NO_RESULTS.to_string();
            }
        };

        let prompt = self
            .prompts
            .render_itinerary(&session.record, &bundle.to_json());

        match self.generate(&prompt).await {
            Ok(raw) => {
                session.itinerary_created = true;
                // The itinerary call tolerates a missing delimiter: raw
                // text here is still an itinerary, not a protocol reply.
                let itinerary =
                    extract_delimited(&raw).unwrap_or_else(|| raw.trim().to_string());
                session.history.push(Turn::assistant(&itinerary));
                tracing::info!(session = %session.id, "itinerary delivered");
                itinerary
            }
            Err(GenerationFailure::AllExhausted(err)) => {
                tracing::warn!(session = %session.id, error = %err, "itinerary generation exhausted credentials");
                MSG_ITINERARY_BUSY.to_string()
            }
            Err(GenerationFailure::Provider(err)) => {
                tracing::error!(session = %session.id, error = %err, "itinerary generation failed");
                if err.is_rate_limited() {
                    MSG_ITINERARY_BUSY.to_string()
                } else {
                    MSG_ITINERARY_PROBLEM.to_string()
                }
            }
        }
    }

    /// Invokes the model, rotating credentials on rate limits.
    ///
    /// The rotation loop is bounded by pool size + 1: each rate-limited
    /// credential gets marked, so the loop either reaches a healthy key,
    /// exhausts the pool (AllExhausted), or gives up on a 429 whose body
    /// never matched the rate-limit signature.
    async fn generate(&self, prompt: &str) -> Result<String, GenerationFailure> {
        let max_rotations = self.pool.len() + 1;
        let mut last_rate_limit: Option<AIError> = None;

        for _ in 0..max_rotations {
            let credential = self
                .pool
                .next_available()
                .map_err(GenerationFailure::AllExhausted)?;

            let request = CompletionRequest::new(prompt, credential.token().clone())
                .with_temperature(self.temperature);

            match self.provider.complete(request).await {
                Ok(response) => return Ok(response.content.trim().to_string()),
                Err(AIError::RateLimited { message }) => {
                    tracing::warn!(suffix = %credential.suffix(), "rate limited, rotating credential");
                    self.pool.mark_rate_limited(&credential, &message);
                    last_rate_limit = Some(AIError::rate_limited(message));
                }
                Err(err) => return Err(GenerationFailure::Provider(err)),
            }
        }

        Err(GenerationFailure::Provider(last_rate_limit.unwrap_or_else(
            || AIError::unavailable("credential rotation made no progress"),
        )))
    }

    fn describe_turn_failure(&self, failure: GenerationFailure) -> String {
        match failure {
            GenerationFailure::AllExhausted(err) => {
                tracing::warn!(error = %err, "all credentials exhausted");
                format!("Lo siento, todas las API keys están en rate limit. {err}")
            }
            GenerationFailure::Provider(err) if err.is_retryable() => {
                tracing::error!(error = %err, "model unavailable after retries");
                MSG_SERVICE_UNAVAILABLE.to_string()
            }
            GenerationFailure::Provider(err) => {
                tracing::error!(error = %err, "turn aborted");
                MSG_GENERIC_PROBLEM.to_string()
            }
        }
    }

    fn confirmation_summary(&self, record: &TripRecord) -> String {
        format!(
            "¡Perfecto! Creo que ya tenemos bastante informacion para planear tu itinerario. \
             Antes confirmemos estos datos:\n\n\
             - Viaje: de {origin} a {destination}\n\
             - Fechas: del {start} al {end}\n\
             - Viajeros: {travelers}\n\
             - Presupuesto: {budget}\n\
             ¿Estamos listos para empezar la busqueda, o querés cambiar algo? ✨",
            origin = record.field_or_unspecified(TripField::Origin),
            destination = record.field_or_unspecified(TripField::Destination),
            start = record.field_or_unspecified(TripField::StartDate),
            end = record.field_or_unspecified(TripField::EndDate),
            travelers = record.field_or_unspecified(TripField::Travelers),
            budget = record.field_or_unspecified(TripField::Budget),
        )
    }
}

/// Extracts the text between the response markers, if both are present.
fn extract_delimited(text: &str) -> Option<String> {
    let open = text.find(RESPONSE_OPEN)? + RESPONSE_OPEN.len();
    let close = open + text[open..].find(RESPONSE_CLOSE)?;
    Some(text[open..close].trim().to_string())
}
