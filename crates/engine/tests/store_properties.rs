use chrono::{DateTime, Duration, TimeZone, Utc};
use proptest::prelude::*;
use redraft_common::patch::{BlockOutcome, PatchBlock, PatchEngine};
use redraft_common::types::{Actor, DocumentKind};
use redraft_engine::lock::EditCoordinator;
use redraft_engine::store::{DocumentStore, NewDocument, StoreError, StoreLimits};
use uuid::Uuid;

fn t0() -> DateTime<Utc> {
    Utc.timestamp_opt(1_700_000_000, 0).single().expect("timestamp should be valid")
}

fn new_store() -> DocumentStore {
    DocumentStore::new(StoreLimits::default())
}

fn create(store: &mut DocumentStore, kind: DocumentKind, content: &str) -> Uuid {
    store
        .create_document(NewDocument::new(kind, "doc").with_content(content), t0())
        .expect("create should succeed")
}

fn content(store: &DocumentStore, id: Uuid) -> String {
    store.get(id).expect("document should exist").content().to_owned()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn undo_walks_back_through_every_spaced_update(
        updates in proptest::collection::vec("[a-z \n]{0,24}", 1..12),
    ) {
        let mut store = new_store();
        let id = create(&mut store, DocumentKind::Text, "seed");
        let mut expected = vec!["seed".to_owned()];

        for (step, text) in updates.iter().enumerate() {
            let at = t0() + Duration::seconds(2 * (step as i64 + 1));
            store.update_content(id, text.clone(), at).expect("update should succeed");
            expected.push(text.clone());
        }

        for previous in expected.iter().rev().skip(1) {
            prop_assert!(store.undo(id));
            prop_assert_eq!(&content(&store, id), previous);
        }
        prop_assert!(!store.undo(id));

        for next in expected.iter().skip(1) {
            prop_assert!(store.redo(id));
            prop_assert_eq!(&content(&store, id), next);
        }
    }

    #[test]
    fn sequences_strictly_increase_under_any_edit_schedule(
        gaps_ms in proptest::collection::vec(0i64..2_500, 1..40),
        undo_every in 2usize..7,
    ) {
        let limits = StoreLimits { max_revisions: 8, ..StoreLimits::default() };
        let mut store = DocumentStore::new(limits);
        let id = store
            .create_document(NewDocument::new(DocumentKind::Code, "doc"), t0())
            .expect("create should succeed");
        let mut at = t0();

        for (step, gap) in gaps_ms.iter().enumerate() {
            at += Duration::milliseconds(*gap);
            if step % undo_every == 0 {
                store.undo(id);
            }
            store.update_content(id, format!("step {step}"), at).expect("update");

            let document = store.get(id).expect("document");
            prop_assert!(document.check_invariants().is_ok());
            prop_assert!(document.revisions.len() <= 8);
            prop_assert_eq!(document.active_index, document.revisions.len() - 1);
            prop_assert_eq!(document.content(), format!("step {step}"));
        }
    }
}

#[test]
fn idempotent_patch_reports_already_applied() {
    let mut store = new_store();
    let id = create(&mut store, DocumentKind::Code, "fn add(a: i32) -> i32 { a }");
    let engine = PatchEngine::default();
    let block = [PatchBlock::new("{ a }", "{ a + 1 }")];

    let first =
        store.apply_patch(id, &block, &engine, t0() + Duration::seconds(5)).expect("patch");
    let after_first = content(&store, id);
    let second =
        store.apply_patch(id, &block, &engine, t0() + Duration::seconds(10)).expect("patch");

    assert!(matches!(first.outcomes[0].outcome, BlockOutcome::Applied { .. }));
    assert_eq!(second.outcomes[0].outcome, BlockOutcome::AlreadyApplied);
    assert_eq!(second.applied_count, 1);
    assert_eq!(content(&store, id), after_first);
}

#[test]
fn ambiguous_search_leaves_content_unchanged() {
    let mut store = new_store();
    let id = create(&mut store, DocumentKind::Text, "log();\nwork();\nlog();\n");

    let report = store
        .apply_patch(id, &[PatchBlock::new("log();", "trace();")], &PatchEngine::default(), t0())
        .expect("patch");

    assert_eq!(report.outcomes[0].outcome, BlockOutcome::MultipleMatches { count: 2 });
    assert_eq!(report.applied_count, 0);
    assert_eq!(content(&store, id), "log();\nwork();\nlog();\n");
}

#[test]
fn debounced_stream_collapses_into_one_revision() {
    let mut store = new_store();
    let id = create(&mut store, DocumentKind::Markdown, "");
    let mut streamed = String::new();

    for chunk in 0..20 {
        streamed.push_str("word ");
        let at = t0() + Duration::seconds(10) + Duration::milliseconds(150 * chunk);
        store.update_content(id, streamed.clone(), at).expect("update");
    }

    let document = store.get(id).expect("document");
    assert_eq!(document.revisions.len(), 2);
    assert_eq!(document.content(), streamed);
}

#[test]
fn capacity_is_enforced_unless_something_is_idle() {
    let mut store = new_store();
    let first = create(&mut store, DocumentKind::Text, "");
    for _ in 1..10 {
        create(&mut store, DocumentKind::Text, "");
    }

    let soon = t0() + Duration::minutes(5);
    assert_eq!(
        store.create_document(NewDocument::new(DocumentKind::Text, "x"), soon),
        Err(StoreError::CapacityExceeded { limit: 10 })
    );

    let later = t0() + Duration::minutes(31);
    let created = store
        .create_document(NewDocument::new(DocumentKind::Text, "x"), later)
        .expect("an idle document should be evicted");
    assert_eq!(store.len(), 10);
    assert!(store.get(first).is_none());
    assert_eq!(store.active_id(), Some(created));
}

#[test]
fn lock_idempotence() {
    let mut store = new_store();
    let id = create(&mut store, DocumentKind::Text, "");
    let coordinator = EditCoordinator::default();

    assert!(coordinator.acquire(&mut store, id, Actor::Ai, t0()));
    assert!(coordinator.acquire(&mut store, id, Actor::Ai, t0()));
    assert!(!coordinator.acquire(&mut store, id, Actor::User, t0()));
}

#[test]
fn login_guard_clause_patch_creates_a_revision() {
    let original = "function login(user, pass) {\n  return api.auth(user, pass);\n}";
    let guarded = "function login(user, pass) {\n  if (!user) throw new Error('user required');\n  return api.auth(user, pass);\n}";
    let mut store = new_store();
    let id = create(&mut store, DocumentKind::Code, original);
    let engine = PatchEngine::default();
    let parsed = engine.parse(&PatchBlock::new(original, guarded).to_patch_text());
    assert!(parsed.is_clean());

    let report =
        store.apply_patch(id, &parsed.blocks, &engine, t0() + Duration::seconds(3)).expect("patch");

    assert!(matches!(report.outcomes[0].outcome, BlockOutcome::Applied { line: 1, .. }));
    assert!(content(&store, id).contains("if (!user) throw"));
    assert_eq!(store.get(id).expect("document").revisions.len(), 2);
    assert!(store.undo(id));
    assert_eq!(content(&store, id), original);
}

#[test]
fn unrelated_search_gets_no_suggestion() {
    let mut store = new_store();
    let id = create(&mut store, DocumentKind::Code, "bar()\nbaz()\n");

    let report = store
        .apply_patch(id, &[PatchBlock::new("foo()", "qux()")], &PatchEngine::default(), t0())
        .expect("patch");

    assert_eq!(report.outcomes[0].outcome, BlockOutcome::NotFound { suggestion: None });
    assert_eq!(store.get(id).expect("document").revisions.len(), 1);
}

#[test]
fn scenario_partial_batch_keeps_successful_blocks() {
    let mut store = new_store();
    let id = create(&mut store, DocumentKind::Text, "alpha\nbeta\ngamma\n");
    let engine = PatchEngine::default();
    let blocks = [
        PatchBlock::new("alpha", "ALPHA"),
        PatchBlock::new("delta", "DELTA"),
        PatchBlock::new("gamma", "GAMMA"),
    ];

    let report =
        store.apply_patch(id, &blocks, &engine, t0() + Duration::seconds(3)).expect("patch");

    assert_eq!(report.applied_count, 2);
    assert!(matches!(report.outcomes[1].outcome, BlockOutcome::NotFound { .. }));
    assert_eq!(content(&store, id), "ALPHA\nbeta\nGAMMA\n");
}
