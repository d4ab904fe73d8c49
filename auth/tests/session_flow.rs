//! Integration tests for the login, refresh and logout flow.
//!
//! Runs the session service against the in-memory mocks and checks the
//! lifecycle properties of state tokens and refresh tokens.

#![allow(clippy::unwrap_used)] // Test code can use unwrap

use accounts_auth::{
    mocks::{FixedClock, MockAccountStore, MockOAuthClient},
    SessionConfig, SessionEnvironment, SessionError, SessionService, TokenSigner,
};
use chrono::{Duration, TimeZone, Utc};
use std::sync::Arc;

const SECRET: &[u8] = b"integration-secret";

type TestService = SessionService<MockAccountStore, MockOAuthClient, FixedClock>;

struct Harness {
    service: Arc<TestService>,
    store: MockAccountStore,
    clock: FixedClock,
}

/// Create a service whose provider knows `code123 → ext1 → acct-42` and
/// `code456 → ext2 → acct-7`.
fn harness() -> Harness {
    harness_with(MockOAuthClient::new(), SessionConfig::default())
}

fn harness_with(oauth: MockOAuthClient, config: SessionConfig) -> Harness {
    let oauth = oauth
        .with_login("code123", "ext1", "acct-42")
        .with_login("code456", "ext2", "acct-7");
    let store = MockAccountStore::new();
    // Whole seconds, so issuance time survives the JWT round trip exactly.
    let clock = FixedClock::new(Utc.timestamp_opt(Utc::now().timestamp(), 0).unwrap());
    let env = SessionEnvironment::new(store.clone(), oauth, clock.clone());
    let signer = TokenSigner::new(SECRET, Duration::seconds(3600));

    Harness {
        service: Arc::new(SessionService::new(env, signer, config)),
        store,
        clock,
    }
}

// ═══════════════════════════════════════════════════════════════════════
// State tokens
// ═══════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn test_state_token_is_single_use() {
    let h = harness();
    let state = h.service.begin_login("return=/home").await.unwrap();

    let first = h.service.complete_login(None, "code123", &state, None).await;
    assert!(first.is_ok());

    let second = h.service.complete_login(None, "code123", &state, None).await;
    assert_eq!(second.unwrap_err(), SessionError::InvalidState);
}

#[tokio::test]
async fn test_concurrent_completions_of_one_state_grant_once() {
    // The provider is slow enough that both completions overlap.
    let oauth = MockOAuthClient::new().with_delay(std::time::Duration::from_millis(50));
    let h = harness_with(oauth, SessionConfig::default());
    let state = h.service.begin_login("return=/home").await.unwrap();

    let (first, second) = tokio::join!(
        h.service.complete_login(None, "code123", &state, None),
        h.service.complete_login(None, "code123", &state, None),
    );

    let granted = [&first, &second].iter().filter(|r| r.is_ok()).count();
    assert_eq!(granted, 1);
    let rejected = if first.is_ok() { second } else { first };
    assert_eq!(rejected.unwrap_err(), SessionError::InvalidState);
    assert_eq!(h.store.user_tokens().unwrap().len(), 1);
    assert!(h.store.state(&state).unwrap().unwrap().used);
}

#[tokio::test]
async fn test_unknown_state_is_rejected_before_upstream() {
    let oauth = MockOAuthClient::new();
    let h = harness_with(oauth.clone(), SessionConfig::default());

    let err = h
        .service
        .complete_login(None, "code123", "never-issued", None)
        .await
        .unwrap_err();

    assert_eq!(err, SessionError::InvalidState);
    assert!(oauth.exchange_calls().unwrap().is_empty());
}

#[tokio::test]
async fn test_state_tokens_are_distinct() {
    let h = harness();

    let a = h.service.begin_login("").await.unwrap();
    let b = h.service.begin_login("").await.unwrap();

    assert_ne!(a, b);
    assert!(a.len() >= 22, "at least 128 bits of entropy");
}

#[tokio::test]
async fn test_failed_mark_used_does_not_fail_login() {
    let h = harness();
    h.store.set_fail_mark_state_used(true).unwrap();
    let state = h.service.begin_login("").await.unwrap();

    let outcome = h
        .service
        .complete_login(None, "code123", &state, None)
        .await
        .unwrap();

    assert_eq!(outcome.account_id, "acct-42");
    let row = h.store.state(&state).unwrap().unwrap();
    assert!(!row.used);
    assert!(row.claimed);

    // The claim alone keeps the state from being replayed.
    h.store.set_fail_mark_state_used(false).unwrap();
    let replay = h.service.complete_login(None, "code123", &state, None).await;
    assert_eq!(replay.unwrap_err(), SessionError::InvalidState);
}

// ═══════════════════════════════════════════════════════════════════════
// Login
// ═══════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn test_login_writes_in_order() {
    let h = harness();
    let state = h.service.begin_login("").await.unwrap();

    h.service
        .complete_login(None, "code123", &state, None)
        .await
        .unwrap();

    assert_eq!(
        h.store.writes().unwrap(),
        vec![
            "insert_state",
            "claim_state",
            "record_oauth_tokens",
            "record_user_token",
            "upsert_for_account",
            "mark_state_used",
        ]
    );
}

#[tokio::test]
async fn test_login_audits_provider_tokens() {
    let h = harness();
    let state = h.service.begin_login("").await.unwrap();

    h.service
        .complete_login(None, "code123", &state, None)
        .await
        .unwrap();

    let audit = h.store.oauth_tokens().unwrap();
    assert_eq!(audit.len(), 1);
    assert_eq!(audit[0].account_id, "acct-42");
    assert_eq!(audit[0].authorization_code, "code123");
    assert_eq!(audit[0].external_access_token, "ext1");
}

#[tokio::test]
async fn test_login_records_user_agent() {
    let h = harness();
    let state = h.service.begin_login("").await.unwrap();

    h.service
        .complete_login(None, "code123", &state, Some("Mozilla/5.0 (Test)"))
        .await
        .unwrap();

    let rows = h.store.refresh_tokens_for("acct-42").unwrap();
    assert_eq!(rows[0].user_agent.as_deref(), Some("Mozilla/5.0 (Test)"));
}

#[tokio::test]
async fn test_rejected_code_leaves_state_reusable() {
    let h = harness();
    let state = h.service.begin_login("").await.unwrap();

    let err = h
        .service
        .complete_login(None, "bad-code", &state, None)
        .await
        .unwrap_err();

    assert!(matches!(err, SessionError::UpstreamExchangeFailed(_)));
    assert_eq!(
        h.store.writes().unwrap(),
        vec!["insert_state", "claim_state", "release_state"]
    );

    // The state was not consumed, so the user can retry with a fresh code.
    let retry = h.service.complete_login(None, "code123", &state, None).await;
    assert!(retry.is_ok());
}

#[tokio::test]
async fn test_identity_failure_aborts_login() {
    let oauth = MockOAuthClient::new()
        .with_identity_failure(SessionError::UpstreamIdentityFailed("no account".to_string()));
    let h = harness_with(oauth, SessionConfig::default());
    let state = h.service.begin_login("").await.unwrap();

    let err = h
        .service
        .complete_login(None, "code123", &state, None)
        .await
        .unwrap_err();

    assert!(matches!(err, SessionError::UpstreamIdentityFailed(_)));
    assert!(h.store.oauth_tokens().unwrap().is_empty());
    assert!(h.store.refresh_tokens_for("acct-42").unwrap().is_empty());
}

#[tokio::test]
async fn test_slow_provider_times_out() {
    let oauth = MockOAuthClient::new().with_delay(std::time::Duration::from_millis(200));
    let config =
        SessionConfig::default().with_upstream_timeout(std::time::Duration::from_millis(50));
    let h = harness_with(oauth, config);
    let state = h.service.begin_login("").await.unwrap();

    let err = h
        .service
        .complete_login(None, "code123", &state, None)
        .await
        .unwrap_err();

    assert_eq!(err, SessionError::UpstreamTimeout);
    assert!(h.store.user_tokens().unwrap().is_empty());
    let row = h.store.state(&state).unwrap().unwrap();
    assert!(!row.used);
    assert!(!row.claimed, "a timed-out login releases its claim");
}

#[tokio::test]
async fn test_storage_outage_is_reported() {
    let h = harness();
    h.store.set_unavailable(true).unwrap();

    let err = h.service.begin_login("").await.unwrap_err();

    assert!(matches!(err, SessionError::StorageUnavailable(_)));
}

// ═══════════════════════════════════════════════════════════════════════
// One session row per account
// ═══════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn test_relogin_updates_the_single_row() {
    let h = harness();

    let s1 = h.service.begin_login("").await.unwrap();
    let first = h
        .service
        .complete_login(None, "code123", &s1, None)
        .await
        .unwrap();
    assert_eq!(h.store.refresh_tokens_for("acct-42").unwrap().len(), 1);

    let s2 = h.service.begin_login("").await.unwrap();
    let second = h
        .service
        .complete_login(None, "code123", &s2, None)
        .await
        .unwrap();

    let rows = h.store.refresh_tokens_for("acct-42").unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].refresh_token_value, second.token.refresh_token);

    // Re-login rotated the first session's refresh token away.
    let err = h.service.refresh(&first.token.refresh_token).await.unwrap_err();
    assert_eq!(err, SessionError::SessionNotFound);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_logins_leave_one_row() {
    let h = harness();

    let mut states = Vec::new();
    for _ in 0..16 {
        states.push(h.service.begin_login("").await.unwrap());
    }

    let handles: Vec<_> = states
        .into_iter()
        .map(|state| {
            let service = Arc::clone(&h.service);
            tokio::spawn(async move {
                service
                    .complete_login(None, "code123", &state, None)
                    .await
            })
        })
        .collect();

    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    assert_eq!(h.store.refresh_tokens_for("acct-42").unwrap().len(), 1);
}

#[tokio::test]
async fn test_accounts_have_separate_sessions() {
    let h = harness();

    let s1 = h.service.begin_login("").await.unwrap();
    let s2 = h.service.begin_login("").await.unwrap();
    h.service
        .complete_login(None, "code123", &s1, None)
        .await
        .unwrap();
    h.service
        .complete_login(None, "code456", &s2, None)
        .await
        .unwrap();

    assert_eq!(h.store.refresh_tokens_for("acct-42").unwrap().len(), 1);
    assert_eq!(h.store.refresh_tokens_for("acct-7").unwrap().len(), 1);
}

// ═══════════════════════════════════════════════════════════════════════
// Refresh rotation
// ═══════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn test_refresh_token_is_single_use() {
    let h = harness();
    let state = h.service.begin_login("").await.unwrap();
    let login = h
        .service
        .complete_login(None, "code123", &state, None)
        .await
        .unwrap();

    let first = h.service.refresh(&login.token.refresh_token).await.unwrap();

    // The login's value was rotated away.
    let err = h.service.refresh(&login.token.refresh_token).await.unwrap_err();
    assert_eq!(err, SessionError::SessionNotFound);

    // The latest value works, once.
    let second = h.service.refresh(&first.refresh_token).await.unwrap();
    assert_ne!(second.refresh_token, first.refresh_token);
    assert_eq!(
        h.service.refresh(&first.refresh_token).await.unwrap_err(),
        SessionError::SessionNotFound
    );
}

#[tokio::test]
async fn test_refresh_unknown_value() {
    let h = harness();

    let err = h.service.refresh("never-issued").await.unwrap_err();

    assert_eq!(err, SessionError::SessionNotFound);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_refresh_of_one_value_succeeds_once() {
    let h = harness();
    let state = h.service.begin_login("").await.unwrap();
    let login = h
        .service
        .complete_login(None, "code123", &state, None)
        .await
        .unwrap();

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let service = Arc::clone(&h.service);
            let value = login.token.refresh_token.clone();
            tokio::spawn(async move { service.refresh(&value).await })
        })
        .collect();

    let mut successes = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => successes += 1,
            Err(err) => assert_eq!(err, SessionError::SessionNotFound),
        }
    }

    assert_eq!(successes, 1);
}

// ═══════════════════════════════════════════════════════════════════════
// Logout
// ═══════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn test_refresh_after_logout_fails() {
    let h = harness();
    let state = h.service.begin_login("").await.unwrap();
    let login = h
        .service
        .complete_login(None, "code123", &state, None)
        .await
        .unwrap();

    h.service
        .logout(Some(&login.token.access_token), &login.token.refresh_token)
        .await
        .unwrap();

    let err = h.service.refresh(&login.token.refresh_token).await.unwrap_err();
    assert_eq!(err, SessionError::SessionLoggedOut);
}

#[tokio::test]
async fn test_logout_is_idempotent() {
    let h = harness();
    let state = h.service.begin_login("").await.unwrap();
    let login = h
        .service
        .complete_login(None, "code123", &state, None)
        .await
        .unwrap();

    h.service
        .logout(None, &login.token.refresh_token)
        .await
        .unwrap();
    h.service
        .logout(None, &login.token.refresh_token)
        .await
        .unwrap();
    h.service.logout(None, "never-issued").await.unwrap();

    let writes = h.store.writes().unwrap();
    assert_eq!(writes.iter().filter(|w| **w == "mark_logged_out").count(), 1);
}

#[tokio::test]
async fn test_logout_records_time_and_keeps_row() {
    let h = harness();
    let state = h.service.begin_login("").await.unwrap();
    let login = h
        .service
        .complete_login(None, "code123", &state, None)
        .await
        .unwrap();

    h.clock.advance(Duration::minutes(5));
    h.service
        .logout(None, &login.token.refresh_token)
        .await
        .unwrap();

    let rows = h.store.refresh_tokens_for("acct-42").unwrap();
    assert_eq!(rows.len(), 1);
    assert!(rows[0].is_logged_out);
    assert_eq!(rows[0].logout_at, Some(h.clock_now()));
}

#[tokio::test]
async fn test_login_after_logout_reactivates_session() {
    let h = harness();
    let s1 = h.service.begin_login("").await.unwrap();
    let first = h
        .service
        .complete_login(None, "code123", &s1, None)
        .await
        .unwrap();
    h.service
        .logout(None, &first.token.refresh_token)
        .await
        .unwrap();

    let s2 = h.service.begin_login("").await.unwrap();
    let second = h
        .service
        .complete_login(None, "code123", &s2, None)
        .await
        .unwrap();

    let rows = h.store.refresh_tokens_for("acct-42").unwrap();
    assert_eq!(rows.len(), 1);
    assert!(!rows[0].is_logged_out);
    assert_eq!(rows[0].logout_at, None);
    assert!(h.service.refresh(&second.token.refresh_token).await.is_ok());
}

#[tokio::test]
async fn test_access_token_stays_valid_after_logout() {
    let h = harness();
    let state = h.service.begin_login("").await.unwrap();
    let login = h
        .service
        .complete_login(None, "code123", &state, None)
        .await
        .unwrap();

    h.service
        .logout(Some(&login.token.access_token), &login.token.refresh_token)
        .await
        .unwrap();

    assert_eq!(
        h.service.authenticate(&login.token.access_token).unwrap(),
        "acct-42"
    );
}

// ═══════════════════════════════════════════════════════════════════════
// Access tokens
// ═══════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn test_issued_tokens_expire_after_ttl() {
    let h = harness();
    let state = h.service.begin_login("").await.unwrap();
    let login = h
        .service
        .complete_login(None, "code123", &state, None)
        .await
        .unwrap();

    h.clock.advance(Duration::seconds(90));
    let refreshed = h.service.refresh(&login.token.refresh_token).await.unwrap();

    let audit = h.store.user_tokens().unwrap();
    assert_eq!(audit.len(), 2);

    let login_issued = h.clock_now() - Duration::seconds(90);
    assert_eq!(audit[0].expires_at, login_issued + Duration::seconds(3600));
    assert_eq!(audit[0].token_value, login.token.access_token);
    assert_eq!(audit[1].expires_at, h.clock_now() + Duration::seconds(3600));
    assert_eq!(audit[1].token_value, refreshed.access_token);

    let verifier = TokenSigner::new(SECRET, Duration::seconds(3600));
    for row in &audit {
        let claims = verifier.verify(&row.token_value).unwrap();
        assert_eq!(claims.sub, "acct-42");
        assert_eq!(row.account_id, "acct-42");
        assert_eq!(claims.exp, row.expires_at.timestamp());
    }
}

#[tokio::test]
async fn test_user_info_for_bearer() {
    let h = harness();
    h.store
        .insert_user("acct-42", "Mars", "https://example.com/a.png")
        .unwrap();
    let state = h.service.begin_login("").await.unwrap();
    let login = h
        .service
        .complete_login(None, "code123", &state, None)
        .await
        .unwrap();

    let info = h.service.user_info(&login.token.access_token).await.unwrap();

    assert_eq!(info.user_id, "acct-42");
    assert_eq!(info.name, "Mars");
    assert_eq!(info.icon, "https://example.com/a.png");
}

#[tokio::test]
async fn test_user_info_without_profile() {
    let h = harness();
    let state = h.service.begin_login("").await.unwrap();
    let login = h
        .service
        .complete_login(None, "code456", &state, None)
        .await
        .unwrap();

    let err = h
        .service
        .user_info(&login.token.access_token)
        .await
        .unwrap_err();

    assert_eq!(err, SessionError::UserNotFound);
}

#[tokio::test]
async fn test_user_info_rejects_foreign_token() {
    let h = harness();
    let forged = TokenSigner::new(b"other-secret", Duration::seconds(3600))
        .sign("acct-42", Utc::now())
        .unwrap();

    let err = h.service.user_info(&forged.value).await.unwrap_err();

    assert_eq!(err, SessionError::InvalidAccessToken);
}

// ═══════════════════════════════════════════════════════════════════════
// End to end
// ═══════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn test_login_refresh_logout_scenario() {
    let h = harness();

    let state = h.service.begin_login("return=/home").await.unwrap();
    let login = h
        .service
        .complete_login(Some("https://app.example.com/cb"), "code123", &state, None)
        .await
        .unwrap();

    assert_eq!(login.account_id, "acct-42");
    assert_eq!(login.query_string, "return=/home");
    assert_eq!(h.store.refresh_tokens_for("acct-42").unwrap().len(), 1);

    let refreshed = h.service.refresh(&login.token.refresh_token).await.unwrap();
    assert_ne!(refreshed.access_token, login.token.access_token);
    assert_ne!(refreshed.refresh_token, login.token.refresh_token);

    h.service
        .logout(Some(&refreshed.access_token), &refreshed.refresh_token)
        .await
        .unwrap();

    let err = h.service.refresh(&refreshed.refresh_token).await.unwrap_err();
    assert_eq!(err, SessionError::SessionLoggedOut);
}

impl Harness {
    fn clock_now(&self) -> chrono::DateTime<Utc> {
        use accounts_auth::providers::Clock;
        self.clock.now()
    }
}
