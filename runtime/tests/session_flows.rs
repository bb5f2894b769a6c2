// Copyright 2026 Scout Contributors
// SPDX-License-Identifier: Apache-2.0

//! End-to-end session flows against the scripted portal.

mod support;

use std::sync::Arc;
use std::time::Duration;

use scout_runtime::catalog::{CatalogFilters, InstallStatus};
use scout_runtime::error::FailureKind;
use scout_runtime::events::Operation;
use scout_runtime::trust::{Credentials, StaticCredentials};
use scout_runtime::{AuthFailure, AuthState, CatalogSession, ScoutEvent};

use support::*;

fn spawn(portal: &MockPortal) -> CatalogSession {
    CatalogSession::builder(portal.browser())
        .config(test_config())
        .credentials(Arc::new(
            StaticCredentials::new().with(6, Credentials::new("scout", "hunter2")),
        ))
        .spawn()
}

fn page_url(page: u32) -> String {
    CatalogFilters::default()
        .with_page(page)
        .query_url(&endpoints())
}

fn is_page_loaded(e: &ScoutEvent) -> bool {
    matches!(e, ScoutEvent::PageLoaded { .. })
}

fn is_failure(op: Operation) -> impl Fn(&ScoutEvent) -> bool {
    move |e: &ScoutEvent| matches!(e, ScoutEvent::OperationFailed { operation, .. } if *operation == op)
}

/// Load page 1 with two known items so detail loads can take the direct path.
async fn load_first_page(session: &CatalogSession, portal: &MockPortal) {
    portal.document(page_url(1), catalog_page(&["101", "102"], Some("1-2 of 34")));
    let mut rx = session.events().subscribe();
    session.load_page(CatalogFilters::default(), true);
    next_event(&mut rx, is_page_loaded).await;
}

// ── Catalog pages ────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_page_with_caption_reports_totals() {
    let portal = MockPortal::new();
    portal.document(page_url(1), catalog_page(&["101", "102"], Some("1-2 of 34")));
    let session = spawn(&portal);
    let mut rx = session.events().subscribe();

    session.load_page(CatalogFilters::default(), true);

    match next_event(&mut rx, |e| matches!(e, ScoutEvent::PageLoadingStarted { .. })).await {
        ScoutEvent::PageLoadingStarted { query_url } => assert_eq!(query_url, page_url(1)),
        other => panic!("unexpected event {other:?}"),
    }
    match next_event(&mut rx, is_page_loaded).await {
        ScoutEvent::PageLoaded { page, from_cache } => {
            assert!(!from_cache);
            assert_eq!(page.items.len(), 2);
            assert_eq!(page.current_page, 1);
            assert_eq!(page.total_pages, 17);
            assert_eq!(page.total_items, 34);
            assert_eq!(page.items[0].id, "101");
            assert_eq!(page.items[0].author, "ann");
        }
        other => panic!("unexpected event {other:?}"),
    }

    let stub = session.cached_item("101").await.expect("stub cached");
    assert_eq!(stub.title, "Item 101");
    assert!(!stub.has_details());
    assert_eq!(session.current_page().await.map(|p| p.total_items), Some(34));
    assert!(!session.is_loading().await);
}

#[tokio::test]
async fn test_page_without_caption_uses_estimate() {
    let portal = MockPortal::new();
    portal.document(page_url(1), catalog_page(&["1", "2", "3", "4", "5"], None));
    let session = spawn(&portal);
    let mut rx = session.events().subscribe();

    session.load_page(CatalogFilters::default(), true);

    match next_event(&mut rx, is_page_loaded).await {
        ScoutEvent::PageLoaded { page, .. } => {
            assert_eq!(page.items.len(), 5);
            assert_eq!(page.total_items, 15);
            assert_eq!(page.total_pages, 1);
            assert_eq!(page.current_page, 1);
        }
        other => panic!("unexpected event {other:?}"),
    }
}

#[tokio::test]
async fn test_repeated_page_load_is_served_from_cache() {
    let portal = MockPortal::new();
    let session = spawn(&portal);
    load_first_page(&session, &portal).await;

    let mut rx = session.events().subscribe();
    session.load_page(CatalogFilters::default(), true);
    match next_event(&mut rx, is_page_loaded).await {
        ScoutEvent::PageLoaded { page, from_cache } => {
            assert!(from_cache);
            assert_eq!(page.total_items, 34);
        }
        other => panic!("unexpected event {other:?}"),
    }
    assert_eq!(portal.navigations().len(), 1);

    // Bypassing the cache goes back to the browser.
    session.load_page(CatalogFilters::default(), false);
    next_event(&mut rx, |e| matches!(e, ScoutEvent::PageLoaded { from_cache: false, .. })).await;
    assert_eq!(portal.navigations().len(), 2);
}

#[tokio::test]
async fn test_second_page_load_while_busy_is_ignored() {
    let portal = MockPortal::new();
    portal.document(page_url(1), catalog_page(&["101"], Some("1-1 of 1")));
    portal.document(page_url(2), catalog_page(&["201"], Some("16-16 of 16")));

    let mut config = test_config();
    config.timings.page_settle = Duration::from_millis(30);
    let session = CatalogSession::builder(portal.browser()).config(config).spawn();
    let mut rx = session.events().subscribe();

    session.load_page(CatalogFilters::default(), true);
    session.load_page(CatalogFilters::default().with_page(2), true);

    match next_event(&mut rx, is_page_loaded).await {
        ScoutEvent::PageLoaded { page, .. } => assert_eq!(page.items[0].id, "101"),
        other => panic!("unexpected event {other:?}"),
    }
    tokio::time::sleep(Duration::from_millis(50)).await;

    assert_eq!(portal.navigations(), vec![page_url(1)]);
    assert!(!drain(&mut rx).iter().any(is_page_loaded));
}

#[tokio::test]
async fn test_navigation_failure_reports_once_and_frees_flow() {
    let portal = MockPortal::new();
    portal.fail_navigation(page_url(3));
    portal.document(page_url(1), catalog_page(&["101"], None));
    let session = spawn(&portal);
    let mut rx = session.events().subscribe();

    session.load_page(CatalogFilters::default().with_page(3), true);
    match next_event(&mut rx, is_failure(Operation::LoadPage)).await {
        ScoutEvent::OperationFailed { kind, message, .. } => {
            assert_eq!(kind, FailureKind::Navigation);
            assert!(message.contains("failed to load page"), "{message}");
        }
        other => panic!("unexpected event {other:?}"),
    }
    assert!(session.current_page().await.is_none());

    session.load_page(CatalogFilters::default(), true);
    next_event(&mut rx, is_page_loaded).await;
    assert!(!drain(&mut rx).iter().any(is_failure(Operation::LoadPage)));
}

#[tokio::test]
async fn test_catalog_redirect_to_sign_in_fails_page() {
    let portal = MockPortal::new();
    portal.redirect(page_url(1), format!("{SITE}/login/home/?goto=workshop"));
    let session = spawn(&portal);
    let mut rx = session.events().subscribe();

    session.load_page(CatalogFilters::default(), true);
    match next_event(&mut rx, is_failure(Operation::LoadPage)).await {
        ScoutEvent::OperationFailed { kind, message, .. } => {
            assert_eq!(kind, FailureKind::Navigation);
            assert!(message.contains("sign-in required"), "{message}");
        }
        other => panic!("unexpected event {other:?}"),
    }
}

struct Installed(&'static str);

impl InstallStatus for Installed {
    fn is_installed(&self, id: &str) -> bool {
        id == self.0
    }
}

#[tokio::test]
async fn test_emitted_items_are_annotated_but_cache_is_not() {
    let portal = MockPortal::new();
    portal.document(page_url(1), catalog_page(&["101", "102"], None));
    let session = CatalogSession::builder(portal.browser())
        .config(test_config())
        .install_status(Arc::new(Installed("101")))
        .spawn();
    let mut rx = session.events().subscribe();

    session.load_page(CatalogFilters::default(), true);
    match next_event(&mut rx, is_page_loaded).await {
        ScoutEvent::PageLoaded { page, .. } => {
            assert!(page.items[0].is_installed);
            assert!(!page.items[1].is_installed);
        }
        other => panic!("unexpected event {other:?}"),
    }
    assert!(!session.cached_item("101").await.unwrap().is_installed);
}

// ── Sign-in ──────────────────────────────────────────────────────────────────

fn login_url() -> String {
    endpoints().login_url()
}

async fn auth_result(session: &CatalogSession, account: u32) -> (Vec<AuthState>, ScoutEvent) {
    let mut rx = session.events().subscribe();
    session.ensure_authenticated(account);

    let mut states = Vec::new();
    loop {
        let event = next_event(&mut rx, |e| {
            matches!(
                e,
                ScoutEvent::AuthStateChanged { .. }
                    | ScoutEvent::LoginSucceeded
                    | ScoutEvent::OperationFailed { .. }
            )
        })
        .await;
        match event {
            ScoutEvent::AuthStateChanged { state } => states.push(state),
            terminal => return (states, terminal),
        }
    }
}

#[tokio::test]
async fn test_empty_credentials_fail_without_submit() {
    let portal = MockPortal::new();
    portal.login_form(LoginForm::Submits(SubmitOutcome::Stay));
    let session = CatalogSession::builder(portal.browser())
        .config(test_config())
        .credentials(Arc::new(StaticCredentials::new().with(6, Credentials::new("", ""))))
        .spawn();

    let (_, terminal) = auth_result(&session, 6).await;
    match terminal {
        ScoutEvent::OperationFailed {
            operation, kind, message, ..
        } => {
            assert_eq!(operation, Operation::Authenticate);
            assert_eq!(kind, FailureKind::Authentication);
            assert!(message.contains("no credentials"), "{message}");
        }
        other => panic!("unexpected event {other:?}"),
    }
    assert_eq!(
        session.auth_state().await,
        AuthState::Failed(AuthFailure::NoCredentials)
    );
    assert_eq!(portal.count(|c| *c == Call::Fill), 0);
}

#[tokio::test]
async fn test_existing_session_skips_credentials() {
    let portal = MockPortal::new();
    portal.redirect(login_url(), format!("{SITE}/id/scout/"));
    let session = spawn(&portal);

    let (states, terminal) = auth_result(&session, 6).await;
    assert!(matches!(terminal, ScoutEvent::LoginSucceeded));
    assert_eq!(states, vec![AuthState::CheckingSession, AuthState::Authenticated]);
    assert_eq!(portal.count(|c| *c == Call::Fill), 0);

    // Already signed in: reported again without touching the browser.
    let (_, terminal) = auth_result(&session, 6).await;
    assert!(matches!(terminal, ScoutEvent::LoginSucceeded));
    assert_eq!(portal.navigations().len(), 1);
}

#[tokio::test]
async fn test_successful_sign_in_walks_every_state() {
    let portal = MockPortal::new();
    portal.login_form(LoginForm::Submits(SubmitOutcome::Redirect(format!("{SITE}/id/scout/"))));
    let session = spawn(&portal);

    let (states, terminal) = auth_result(&session, 6).await;
    assert!(matches!(terminal, ScoutEvent::LoginSucceeded));
    assert_eq!(
        states,
        vec![
            AuthState::CheckingSession,
            AuthState::FillingCredentials,
            AuthState::AwaitingSubmitResult,
            AuthState::VerifyingSuccess,
            AuthState::Authenticated,
        ]
    );
    assert_eq!(portal.count(|c| *c == Call::Fill), 1);
    assert_eq!(session.auth_state().await, AuthState::Authenticated);
}

async fn expect_auth_failure(form: LoginForm, expected: AuthFailure) -> MockPortal {
    let portal = MockPortal::new();
    portal.login_form(form);
    let session = spawn(&portal);

    let (_, terminal) = auth_result(&session, 6).await;
    assert!(
        matches!(terminal, ScoutEvent::OperationFailed { operation: Operation::Authenticate, .. }),
        "unexpected {terminal:?}"
    );
    assert_eq!(session.auth_state().await, AuthState::Failed(expected));
    portal
}

#[tokio::test]
async fn test_second_factor_is_reported() {
    expect_auth_failure(
        LoginForm::Submits(SubmitOutcome::Guard),
        AuthFailure::SecondFactorRequired,
    )
    .await;
}

#[tokio::test]
async fn test_inline_error_text_is_reported() {
    expect_auth_failure(
        LoginForm::Submits(SubmitOutcome::InlineError("Wrong password".into())),
        AuthFailure::InlineError("Wrong password".into()),
    )
    .await;
}

#[tokio::test]
async fn test_missing_form_gives_up_after_twenty_attempts() {
    let portal = expect_auth_failure(LoginForm::Missing, AuthFailure::FormNotFound).await;
    assert_eq!(portal.count(|c| *c == Call::Fill), 20);
}

#[tokio::test]
async fn test_missing_submit_button_fails_immediately() {
    let portal = expect_auth_failure(LoginForm::NoSubmit, AuthFailure::SubmitNotFound).await;
    assert_eq!(portal.count(|c| *c == Call::Fill), 1);
}

#[tokio::test]
async fn test_stuck_on_sign_in_times_out() {
    let portal = expect_auth_failure(
        LoginForm::Submits(SubmitOutcome::Stay),
        AuthFailure::Timeout,
    )
    .await;
    assert_eq!(portal.count(|c| *c == Call::Check), 40);
}

#[tokio::test]
async fn test_unreachable_login_page_fails() {
    let portal = MockPortal::new();
    portal.fail_navigation(login_url());
    let session = spawn(&portal);

    let (_, terminal) = auth_result(&session, 6).await;
    match terminal {
        ScoutEvent::OperationFailed { message, .. } => {
            assert!(message.contains("failed to load login page"), "{message}")
        }
        other => panic!("unexpected event {other:?}"),
    }

    // A failed attempt does not block catalog browsing.
    load_first_page(&session, &portal).await;
}

// ── Item details ─────────────────────────────────────────────────────────────

fn is_details_loaded(e: &ScoutEvent) -> bool {
    matches!(e, ScoutEvent::DetailsLoaded { .. })
}

#[tokio::test]
async fn test_detail_timeout_fails_once_and_keeps_stub() {
    let portal = MockPortal::new();
    let session = spawn(&portal);
    load_first_page(&session, &portal).await;
    let before = session.cached_item("101").await.unwrap();

    portal.detail_reply("101", DetailReply::Error("Timeout".into()));
    let mut rx = session.events().subscribe();
    session.load_details("101", true);

    match next_event(&mut rx, is_failure(Operation::LoadDetails)).await {
        ScoutEvent::OperationFailed { kind, .. } => {
            assert_eq!(kind, FailureKind::DetailFetchTimeout)
        }
        other => panic!("unexpected event {other:?}"),
    }
    tokio::time::sleep(Duration::from_millis(30)).await;
    let rest = drain(&mut rx);
    assert!(!rest.iter().any(is_failure(Operation::LoadDetails)));
    assert!(!rest.iter().any(is_details_loaded));

    assert_eq!(session.cached_item("101").await.unwrap(), before);
    assert_eq!(portal.navigations().len(), 1, "direct path skips navigation");
    assert_eq!(portal.count(|c| *c == Call::Inject("101".into())), 1);
}

#[tokio::test]
async fn test_detail_network_error_is_reported() {
    let portal = MockPortal::new();
    let session = spawn(&portal);
    load_first_page(&session, &portal).await;

    portal.detail_reply("102", DetailReply::Error("HTTP 503".into()));
    let mut rx = session.events().subscribe();
    session.load_details("102", true);

    match next_event(&mut rx, is_failure(Operation::LoadDetails)).await {
        ScoutEvent::OperationFailed { kind, message, .. } => {
            assert_eq!(kind, FailureKind::Network);
            assert!(message.contains("HTTP 503"), "{message}");
        }
        other => panic!("unexpected event {other:?}"),
    }
}

#[tokio::test]
async fn test_details_merge_into_stub_and_then_hit_cache() {
    let portal = MockPortal::new();
    let session = spawn(&portal);
    load_first_page(&session, &portal).await;

    portal
        .detail_reply("101", DetailReply::Html(detail_page("Neon Harbor")))
        .detail_delay(3);
    let mut rx = session.events().subscribe();
    session.load_details("101", true);

    match next_event(&mut rx, |e| matches!(e, ScoutEvent::DetailsLoadingStarted { .. })).await {
        ScoutEvent::DetailsLoadingStarted { item_id, request_id } => {
            assert_eq!(item_id, "101");
            assert_eq!(request_id, 1);
        }
        other => panic!("unexpected event {other:?}"),
    }
    match next_event(&mut rx, is_details_loaded).await {
        ScoutEvent::DetailsLoaded { item, from_cache } => {
            assert!(!from_cache);
            assert_eq!(item.title, "Neon Harbor");
            assert_eq!(item.file_size, "48.213 MB");
            assert_eq!(item.author, "ann");
            assert_eq!(item.preview_url, "https://cdn.test/101.jpg");
            assert_eq!(item.tags.get("Type").map(String::as_str), Some("Scene"));
        }
        other => panic!("unexpected event {other:?}"),
    }
    assert!(portal.count(|c| *c == Call::Poll) >= 4);

    session.load_details("101", true);
    match next_event(&mut rx, is_details_loaded).await {
        ScoutEvent::DetailsLoaded { item, from_cache } => {
            assert!(from_cache);
            assert!(item.has_details());
        }
        other => panic!("unexpected event {other:?}"),
    }
    assert_eq!(portal.count(|c| matches!(c, Call::Inject(_))), 1);
}

#[tokio::test]
async fn test_superseded_detail_request_has_no_effect() {
    let portal = MockPortal::new();
    let session = spawn(&portal);
    load_first_page(&session, &portal).await;

    portal
        .detail_reply("101", DetailReply::Html(detail_page("First")))
        .detail_reply("102", DetailReply::Html(detail_page("Second")))
        .hold_polls(true);
    let mut rx = session.events().subscribe();

    session.load_details("101", true);
    portal
        .wait_until(|calls| calls.iter().any(|c| *c == Call::Poll))
        .await;
    session.load_details("102", true);
    next_event(&mut rx, |e| {
        matches!(e, ScoutEvent::DetailsLoadingStarted { request_id: 2, .. })
    })
    .await;
    portal.hold_polls(false);

    match next_event(&mut rx, is_details_loaded).await {
        ScoutEvent::DetailsLoaded { item, .. } => {
            assert_eq!(item.id, "102");
            assert_eq!(item.title, "Second");
        }
        other => panic!("unexpected event {other:?}"),
    }
    tokio::time::sleep(Duration::from_millis(30)).await;
    let rest = drain(&mut rx);
    assert!(!rest.iter().any(is_details_loaded));
    assert!(!rest.iter().any(is_failure(Operation::LoadDetails)));

    assert!(!session.cached_item("101").await.unwrap().has_details());
    assert!(session.cached_item("102").await.unwrap().has_details());
}

#[tokio::test]
async fn test_details_off_site_navigate_first() {
    let portal = MockPortal::new();
    portal.detail_reply("555", DetailReply::Html(detail_page("Lone Item")));
    let session = spawn(&portal);
    let mut rx = session.events().subscribe();

    session.load_details("555", true);

    match next_event(&mut rx, is_details_loaded).await {
        ScoutEvent::DetailsLoaded { item, .. } => {
            assert_eq!(item.id, "555");
            assert_eq!(item.title, "Lone Item");
            assert!(item.author.is_empty());
        }
        other => panic!("unexpected event {other:?}"),
    }
    assert_eq!(portal.navigations(), vec![endpoints().details_url("555")]);
}

// ── Lifecycle ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_clear_cache_forces_reload() {
    let portal = MockPortal::new();
    let session = spawn(&portal);
    load_first_page(&session, &portal).await;

    session.clear_cache();
    assert!(session.cached_item("101").await.is_none());

    let mut rx = session.events().subscribe();
    session.load_page(CatalogFilters::default(), true);
    next_event(&mut rx, |e| matches!(e, ScoutEvent::PageLoaded { from_cache: false, .. })).await;
    assert_eq!(portal.navigations().len(), 2);
}

#[tokio::test]
async fn test_shutdown_closes_browser() {
    let portal = MockPortal::new();
    let session = spawn(&portal);
    let other = session.clone();

    session.shutdown().await;
    assert!(portal.is_closed());

    // Handles outlive the actor and degrade to defaults.
    assert_eq!(other.auth_state().await, AuthState::Unauthenticated);
    assert!(!other.is_loading().await);
    other.load_page(CatalogFilters::default(), true);
}
