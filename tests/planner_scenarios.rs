//! End-to-end conversation scenarios against mock providers.

use std::collections::HashMap;
use std::sync::Arc;

use rumbo::adapters::ai::{MockAIProvider, MockError};
use rumbo::adapters::search::MockSearchProvider;
use rumbo::application::search::AggregatorLimits;
use rumbo::application::{
    CredentialPool, PromptCatalog, SearchAggregator, TravelPlanner, TripSession,
};
use rumbo::domain::trip::TripRecord;
use rumbo::ports::SearchHit;

fn catalog() -> PromptCatalog {
    PromptCatalog::from_templates(HashMap::from([
        (
            "extraction".to_string(),
            "Mensaje: {message}\nHistorial:\n{conversation_history}\n\
             Origen: {origin} Destino: {destination} Inicio: {start_date} Fin: {end_date}\n\
             Viajeros: {travelers} Presupuesto: {budget} Preferencias: {preferences}"
                .to_string(),
        ),
        (
            "itinerary".to_string(),
            "Itinerario {destination} {start_date}-{end_date} para {travelers} con {budget}:\n{search_results}"
                .to_string(),
        ),
    ]))
    .unwrap()
}

fn planner_with(
    provider: MockAIProvider,
    search: MockSearchProvider,
    keys: &[&str],
) -> (
    TravelPlanner<MockAIProvider, MockSearchProvider>,
    Arc<CredentialPool>,
) {
    let pool = Arc::new(CredentialPool::new(keys.iter().map(|k| k.to_string()).collect()).unwrap());
    let planner = TravelPlanner::new(
        provider,
        Arc::clone(&pool),
        catalog(),
        SearchAggregator::new(search, AggregatorLimits::default()),
        0.7,
    );
    (planner, pool)
}

fn complete_record() -> TripRecord {
    TripRecord {
        origin: Some("Buenos Aires".to_string()),
        destination: Some("Madrid".to_string()),
        start_date: Some("2026-10-01".to_string()),
        end_date: Some("2026-10-10".to_string()),
        num_travelers: Some(2),
        budget: Some("3000 USD".to_string()),
        additional_notes: None,
    }
}

fn madrid_hits() -> Vec<SearchHit> {
    vec![
        SearchHit::new(
            "Top 10 attractions in Madrid",
            "https://example.com/attractions",
            "Prado, Retiro, Palacio Real",
        ),
        SearchHit::new(
            "Madrid in three days",
            "https://example.com/three-days",
            "A walking route through the center",
        ),
    ]
}

#[tokio::test]
async fn first_message_fills_destination_and_asks_for_the_rest() {
    let provider = MockAIProvider::new().with_response(
        "```json\n{\"destination\": \"Madrid\", \"origin\": \"no especificado\"}\n```\n\
         <RESPONSE>¡Qué lindo destino! ¿Desde dónde salís?</RESPONSE>",
    );
    let (planner, _pool) = planner_with(provider, MockSearchProvider::new(), &["gsk_key_one"]);
    let mut session = TripSession::new();

    let reply = planner
        .process_message(&mut session, "Quiero viajar a Madrid")
        .await;

    assert_eq!(reply, "¡Qué lindo destino! ¿Desde dónde salís?");
    assert_eq!(session.record.destination.as_deref(), Some("Madrid"));
    assert!(session.record.origin.is_none());
    assert!(session.record.start_date.is_none());
    assert!(session.record.num_travelers.is_none());
    assert!(session.record.budget.is_none());
    assert!(!session.record.is_complete());
    assert!(!session.search_completed);
}

#[tokio::test]
async fn confirmation_triggers_search_and_delivers_itinerary() {
    let provider = MockAIProvider::new()
        // Extraction turn: pure acknowledgement, no structured payload.
        .with_response("<RESPONSE>¡Dale, arranco!</RESPONSE>")
        // Itinerary turn.
        .with_response("<RESPONSE>Día 1 en Madrid: Prado y Retiro. Día 2: Palacio Real.</RESPONSE>");
    let search = MockSearchProvider::new()
        .with_hits(madrid_hits())
        .with_hits(vec![SearchHit::new(
            "Madrid travel tips",
            "https://example.com/tips",
            "Best time to visit is spring",
        )]);

    let (planner, _pool) = planner_with(provider.clone(), search.clone(), &["gsk_key_one"]);
    let mut session = TripSession::new();
    session.record = complete_record();

    let reply = planner.process_message(&mut session, "sí").await;

    assert!(reply.contains("Madrid"));
    assert!(session.search_completed);
    assert!(session.itinerary_created);

    // Extraction call plus itinerary call.
    let calls = provider.get_calls();
    assert_eq!(calls.len(), 2);
    assert!(calls[1].prompt.contains("Tourist Attractions"));
    assert!(calls[1].prompt.contains("3000 USD"));

    // Both categorized queries were issued for the destination.
    let queries = search.queries();
    assert_eq!(queries.len(), 2);
    assert!(queries.iter().all(|q| q.contains("Madrid")));
}

#[tokio::test]
async fn non_affirmative_message_reshows_confirmation_summary() {
    let provider = MockAIProvider::new().with_response("<RESPONSE>Claro, decime.</RESPONSE>");
    let (planner, _pool) = planner_with(provider.clone(), MockSearchProvider::new(), &["gsk_key_one"]);
    let mut session = TripSession::new();
    session.record = complete_record();

    let reply = planner
        .process_message(&mut session, "cambiemos el presupuesto")
        .await;

    assert!(reply.contains("confirmemos estos datos"));
    assert!(reply.contains("de Buenos Aires a Madrid"));
    assert!(reply.contains("del 2026-10-01 al 2026-10-10"));
    assert!(!session.search_completed);
    assert!(!session.itinerary_created);
    // Only the extraction call ran; no search, no itinerary.
    assert_eq!(provider.call_count(), 1);
}

#[tokio::test]
async fn rate_limit_rotates_credentials_without_reaching_the_user() {
    let provider = MockAIProvider::new()
        .with_error(MockError::RateLimited {
            message: "Rate limit reached for model in organization `org_xyz` on tokens \
                      per minute. Please try again in 1m30s."
                .to_string(),
        })
        .with_response("<RESPONSE>¿A dónde te gustaría viajar?</RESPONSE>");
    let (planner, pool) =
        planner_with(provider.clone(), MockSearchProvider::new(), &["gsk_key_one", "gsk_key_two"]);
    let mut session = TripSession::new();

    let reply = planner.process_message(&mut session, "Hola").await;

    // The user sees the clean reply, not the rate-limit error.
    assert_eq!(reply, "¿A dónde te gustaría viajar?");

    // The first key was marked and rotation moved to the second.
    let calls = provider.get_calls();
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[0].api_key, "gsk_key_one");
    assert_eq!(calls[1].api_key, "gsk_key_two");
    assert_eq!(pool.next_available().unwrap().suffix(), "_key_two");

    // The retry did not duplicate the user's history entry.
    assert_eq!(session.history.len(), 2);
}

#[tokio::test]
async fn slot_updates_accumulate_across_turns() {
    let provider = MockAIProvider::new()
        .with_response(
            "```json\n{\"destination\": \"Madrid\"}\n```\n<RESPONSE>¿Desde dónde?</RESPONSE>",
        )
        .with_response(
            "```json\n{\"origin\": \"Buenos Aires\", \"num_travelers\": 2}\n```\n\
             <RESPONSE>¿Qué fechas?</RESPONSE>",
        );
    let (planner, _pool) = planner_with(provider, MockSearchProvider::new(), &["gsk_key_one"]);
    let mut session = TripSession::new();

    planner
        .process_message(&mut session, "Quiero ir a Madrid")
        .await;
    planner
        .process_message(&mut session, "Salimos dos desde Buenos Aires")
        .await;

    assert_eq!(session.record.destination.as_deref(), Some("Madrid"));
    assert_eq!(session.record.origin.as_deref(), Some("Buenos Aires"));
    assert_eq!(session.record.num_travelers, Some(2));
    // user + assistant per turn
    assert_eq!(session.history.len(), 4);
}

#[tokio::test]
async fn failed_search_allows_retrying_the_confirmation() {
    let provider = MockAIProvider::new()
        .with_response("<RESPONSE>¡Vamos!</RESPONSE>")
        .with_response("<RESPONSE>¡Ahora sí!</RESPONSE>")
        .with_response("<RESPONSE>Itinerario por Madrid</RESPONSE>");
    // First attractions query fails; after the user retries, both succeed.
    let search = MockSearchProvider::new()
        .with_hits(Vec::new())
        .with_hits(madrid_hits())
        .with_hits(vec![SearchHit::new(
            "Tips",
            "https://example.com/tips",
            "Spring",
        )]);
    let (planner, _pool) = planner_with(provider, search, &["gsk_key_one"]);
    let mut session = TripSession::new();
    session.record = complete_record();

    let first = planner.process_message(&mut session, "sí").await;
    assert!(first.contains("destino está bien escrito"));
    assert!(!session.search_completed);

    let second = planner.process_message(&mut session, "sí, está bien escrito").await;
    assert!(second.contains("Madrid"));
    assert!(session.search_completed);
    assert!(session.itinerary_created);
}
