//! Credential pool - rotation across rate-limited API keys.
//!
//! Providers enforce per-key rate limits, so the service carries several
//! keys and rotates between them. Each credential tracks an
//! `unavailable_until` instant set when the provider reports a rate limit;
//! selection walks the pool in load order and returns the first credential
//! whose window has passed.
//!
//! Time-dependent operations come in pairs: the public method uses the wall
//! clock, and an `_at` variant takes the instant explicitly so tests can
//! drive the clock.

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use secrecy::{ExposeSecret, Secret};
use std::sync::Mutex;
use std::time::Duration;
use thiserror::Error;

/// Environment variable prefix for key slots (`GROQ_API_KEY1`..`GROQ_API_KEY8`).
pub const KEY_SLOT_PREFIX: &str = "GROQ_API_KEY";

/// Number of environment slots scanned for keys.
pub const KEY_SLOT_COUNT: usize = 8;

/// Fallback unavailability window when a rate-limit message carries no
/// parseable wait time.
const DEFAULT_WAIT: Duration = Duration::from_secs(30);

/// Credential pool errors.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum CredentialError {
    /// No keys were present in any environment slot.
    #[error("no API keys found in environment variables")]
    NoCredentials,

    /// Every credential is inside a rate-limit window.
    #[error("all API keys are rate limited; shortest wait: {min_wait_secs:.2} seconds")]
    AllExhausted {
        /// Seconds until the soonest credential frees up.
        min_wait_secs: f64,
    },
}

/// A single API key plus its display suffix.
#[derive(Debug, Clone)]
pub struct ApiCredential {
    index: usize,
    token: Secret<String>,
    suffix: String,
}

impl ApiCredential {
    fn new(index: usize, token: String) -> Self {
        let suffix_start = token.len().saturating_sub(8);
        // Keys are ASCII; fall back to the whole key for short test tokens.
        let suffix = token
            .get(suffix_start..)
            .unwrap_or(token.as_str())
            .to_string();
        Self {
            index,
            token: Secret::new(token),
            suffix,
        }
    }

    /// The secret key material.
    pub fn token(&self) -> &Secret<String> {
        &self.token
    }

    /// Last 8 characters of the key, safe to log.
    pub fn suffix(&self) -> &str {
        &self.suffix
    }
}

#[derive(Debug)]
struct SlotState {
    credential: ApiCredential,
    unavailable_until: Option<DateTime<Utc>>,
}

/// Pool of API credentials with rate-limit aware rotation.
///
/// Interior state is behind a mutex: the pool is the one piece of state
/// shared across conversations, so access must be serialized.
#[derive(Debug)]
pub struct CredentialPool {
    slots: Mutex<Vec<SlotState>>,
}

impl CredentialPool {
    /// Builds a pool from explicit keys, trimming and deduplicating.
    pub fn new(keys: Vec<String>) -> Result<Self, CredentialError> {
        let mut seen: Vec<String> = Vec::new();
        let mut slots = Vec::new();

        for key in keys {
            let key = key.trim().to_string();
            if key.is_empty() || seen.contains(&key) {
                continue;
            }
            let credential = ApiCredential::new(slots.len(), key.clone());
            tracing::info!(suffix = %credential.suffix(), "API key loaded");
            seen.push(key);
            slots.push(SlotState {
                credential,
                unavailable_until: None,
            });
        }

        if slots.is_empty() {
            return Err(CredentialError::NoCredentials);
        }
        tracing::info!(total = slots.len(), "credential pool ready");

        Ok(Self {
            slots: Mutex::new(slots),
        })
    }

    /// Builds a pool from the `GROQ_API_KEY1`..`GROQ_API_KEY8` env slots.
    ///
    /// Missing slots are skipped; gaps are allowed.
    pub fn from_env_slots() -> Result<Self, CredentialError> {
        let keys = (1..=KEY_SLOT_COUNT)
            .filter_map(|slot| match std::env::var(format!("{KEY_SLOT_PREFIX}{slot}")) {
                Ok(value) => Some(value),
                Err(_) => {
                    tracing::debug!(slot, "API key slot empty");
                    None
                }
            })
            .collect();
        Self::new(keys)
    }

    /// Number of distinct credentials in the pool.
    pub fn len(&self) -> usize {
        self.slots.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the first credential not currently inside a rate-limit window.
    pub fn next_available(&self) -> Result<ApiCredential, CredentialError> {
        self.next_available_at(Utc::now())
    }

    /// Clock-injected variant of [`next_available`](Self::next_available).
    pub fn next_available_at(&self, now: DateTime<Utc>) -> Result<ApiCredential, CredentialError> {
        let slots = self.slots.lock().unwrap();

        for slot in slots.iter() {
            match slot.unavailable_until {
                Some(until) if now < until => {
                    let wait = (until - now).num_milliseconds() as f64 / 1000.0;
                    tracing::debug!(
                        suffix = %slot.credential.suffix(),
                        wait_secs = wait,
                        "credential rate limited, skipping"
                    );
                }
                _ => {
                    tracing::debug!(suffix = %slot.credential.suffix(), "credential available");
                    return Ok(slot.credential.clone());
                }
            }
        }

        let min_wait_secs = slots
            .iter()
            .filter_map(|slot| slot.unavailable_until)
            .map(|until| (until - now).num_milliseconds() as f64 / 1000.0)
            .fold(f64::INFINITY, f64::min);

        Err(CredentialError::AllExhausted { min_wait_secs })
    }

    /// Handles a rate-limit error body for the given credential.
    ///
    /// Only messages that actually look like a rate limit (contain both
    /// "try again in" and "rate limit", case-insensitively) mark the
    /// credential; anything else is logged and ignored. The unavailability
    /// window comes from the advertised wait, or 30 seconds when the
    /// message carries none.
    pub fn mark_rate_limited(&self, credential: &ApiCredential, error_message: &str) {
        self.mark_rate_limited_at(credential, error_message, Utc::now())
    }

    /// Clock-injected variant of [`mark_rate_limited`](Self::mark_rate_limited).
    pub fn mark_rate_limited_at(
        &self,
        credential: &ApiCredential,
        error_message: &str,
        now: DateTime<Utc>,
    ) {
        let lowered = error_message.to_lowercase();
        if !(lowered.contains("try again in") && lowered.contains("rate limit")) {
            tracing::warn!(
                suffix = %credential.suffix(),
                message = %error_message,
                "provider error was not a rate limit"
            );
            return;
        }

        // The org id only matters for operator logs.
        if let Some(org_id) = extract_organization(error_message) {
            tracing::info!(suffix = %credential.suffix(), organization = %org_id, "rate limited key belongs to organization");
        }

        let wait = parse_advertised_wait(error_message).unwrap_or(DEFAULT_WAIT);
        let until = now + ChronoDuration::milliseconds(wait.as_millis() as i64);

        let mut slots = self.slots.lock().unwrap();
        if let Some(slot) = slots.get_mut(credential.index) {
            slot.unavailable_until = Some(until);
            tracing::warn!(
                suffix = %credential.suffix(),
                wait_secs = wait.as_secs_f64(),
                "credential marked rate limited"
            );
        }
    }

    /// Remaining wait for a credential's window, if any.
    pub fn wait_duration_at(
        &self,
        credential: &ApiCredential,
        now: DateTime<Utc>,
    ) -> Option<Duration> {
        let slots = self.slots.lock().unwrap();
        let until = slots.get(credential.index)?.unavailable_until?;
        if now >= until {
            return None;
        }
        Some(Duration::from_millis((until - now).num_milliseconds() as u64))
    }

    /// Sleeps out a credential's rate-limit window, plus a one second
    /// buffer so the provider-side clock has settled.
    pub async fn wait_for(&self, credential: &ApiCredential) {
        if let Some(wait) = self.wait_duration_at(credential, Utc::now()) {
            tracing::info!(
                suffix = %credential.suffix(),
                wait_secs = wait.as_secs_f64(),
                "waiting out rate limit window"
            );
            tokio::time::sleep(wait + Duration::from_secs(1)).await;
        }
    }
}

/// Parses the advertised wait out of a `try again in <m>m<s>s` message.
fn parse_advertised_wait(message: &str) -> Option<Duration> {
    let lowered = message.to_lowercase();
    let at = lowered.find("try again in ")? + "try again in ".len();
    let rest = &lowered[at..];

    let minutes_end = rest.find('m')?;
    let minutes: u64 = rest[..minutes_end].trim().parse().ok()?;

    let after_minutes = &rest[minutes_end + 1..];
    let seconds_end = after_minutes.find('s')?;
    let seconds: f64 = after_minutes[..seconds_end].trim().parse().ok()?;

    Some(Duration::from_secs_f64(minutes as f64 * 60.0 + seconds))
}

/// Pulls the organization id out of an ``organization `org_...` `` fragment.
fn extract_organization(message: &str) -> Option<&str> {
    let at = message.find("organization `")? + "organization `".len();
    let rest = &message[at..];
    let end = rest.find('`')?;
    Some(&rest[..end])
}

#[cfg(test)]
mod tests {
    use super::*;

    const RATE_LIMIT_BODY: &str = "Rate limit reached for model in organization `org_abc123` \
        on tokens per minute. Please try again in 2m1.5s.";

    fn pool_with(keys: &[&str]) -> CredentialPool {
        CredentialPool::new(keys.iter().map(|k| k.to_string()).collect()).unwrap()
    }

    mod loading {
        use super::*;

        #[test]
        fn trims_and_deduplicates_keys() {
            let pool = pool_with(&["  gsk_first_key  ", "gsk_first_key", "", "gsk_second_key"]);
            assert_eq!(pool.len(), 2);
        }

        #[test]
        fn empty_pool_is_an_error() {
            let result = CredentialPool::new(vec!["".to_string(), "  ".to_string()]);
            assert_eq!(result.unwrap_err(), CredentialError::NoCredentials);
        }

        #[test]
        fn suffix_is_last_eight_characters() {
            let pool = pool_with(&["gsk_abcdefgh12345678"]);
            let credential = pool.next_available().unwrap();
            assert_eq!(credential.suffix(), "12345678");
        }
    }

    mod rotation {
        use super::*;

        #[test]
        fn returns_first_available_in_load_order() {
            let pool = pool_with(&["gsk_key_one", "gsk_key_two"]);
            let now = Utc::now();
            let credential = pool.next_available_at(now).unwrap();
            assert_eq!(credential.suffix(), "_key_one");
        }

        #[test]
        fn skips_rate_limited_credential() {
            let pool = pool_with(&["gsk_key_one", "gsk_key_two"]);
            let now = Utc::now();
            let first = pool.next_available_at(now).unwrap();
            pool.mark_rate_limited_at(&first, RATE_LIMIT_BODY, now);

            let next = pool.next_available_at(now).unwrap();
            assert_eq!(next.suffix(), "_key_two");
        }

        #[test]
        fn credential_frees_up_after_window() {
            let pool = pool_with(&["gsk_key_one"]);
            let now = Utc::now();
            let credential = pool.next_available_at(now).unwrap();
            pool.mark_rate_limited_at(&credential, RATE_LIMIT_BODY, now);

            assert!(pool.next_available_at(now).is_err());

            let later = now + ChronoDuration::seconds(122);
            let freed = pool.next_available_at(later).unwrap();
            assert_eq!(freed.suffix(), "_key_one");
        }

        #[test]
        fn all_exhausted_reports_minimum_wait() {
            let pool = pool_with(&["gsk_key_one", "gsk_key_two"]);
            let now = Utc::now();

            let first = pool.next_available_at(now).unwrap();
            pool.mark_rate_limited_at(&first, RATE_LIMIT_BODY, now);
            let second = pool.next_available_at(now).unwrap();
            pool.mark_rate_limited_at(
                &second,
                "Rate limit reached. Please try again in 0m10.0s.",
                now,
            );

            match pool.next_available_at(now).unwrap_err() {
                CredentialError::AllExhausted { min_wait_secs } => {
                    assert!((min_wait_secs - 10.0).abs() < 0.5);
                }
                other => panic!("unexpected error: {other:?}"),
            }
        }
    }

    mod rate_limit_detection {
        use super::*;

        #[test]
        fn non_rate_limit_error_leaves_credential_available() {
            let pool = pool_with(&["gsk_key_one"]);
            let now = Utc::now();
            let credential = pool.next_available_at(now).unwrap();

            pool.mark_rate_limited_at(&credential, "internal server error", now);
            assert!(pool.next_available_at(now).is_ok());
        }

        #[test]
        fn both_signature_fragments_are_required() {
            let pool = pool_with(&["gsk_key_one"]);
            let now = Utc::now();
            let credential = pool.next_available_at(now).unwrap();

            // "try again in" alone is not enough.
            pool.mark_rate_limited_at(&credential, "busy, try again in 1m0s", now);
            assert!(pool.next_available_at(now).is_ok());
        }

        #[test]
        fn unparseable_wait_falls_back_to_thirty_seconds() {
            let pool = pool_with(&["gsk_key_one"]);
            let now = Utc::now();
            let credential = pool.next_available_at(now).unwrap();

            pool.mark_rate_limited_at(&credential, "Rate limit hit, try again in a while", now);
            let wait = pool.wait_duration_at(&credential, now).unwrap();
            assert_eq!(wait, Duration::from_secs(30));
        }
    }

    mod wait_parsing {
        use super::*;

        #[test]
        fn parses_minutes_and_fractional_seconds() {
            let wait = parse_advertised_wait("Please try again in 2m1.5s.").unwrap();
            assert_eq!(wait, Duration::from_secs_f64(121.5));
        }

        #[test]
        fn parses_whole_seconds() {
            let wait = parse_advertised_wait("try again in 0m30s").unwrap();
            assert_eq!(wait, Duration::from_secs(30));
        }

        #[test]
        fn rejects_malformed_wait() {
            assert!(parse_advertised_wait("try again in soon").is_none());
            assert!(parse_advertised_wait("try again in 5 minutes").is_none());
        }

        #[test]
        fn extracts_organization_id() {
            assert_eq!(
                extract_organization(RATE_LIMIT_BODY),
                Some("org_abc123")
            );
            assert_eq!(extract_organization("no org here"), None);
        }
    }
}
