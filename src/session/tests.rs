// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Halimede-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Halimede and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use std::cell::{Cell, RefCell};
use std::time::Duration;

use rstest::{fixture, rstest};

use super::*;
use crate::api::{DiagramDocument, SaveResponse};
use crate::locate::ElementSnapshot;
use crate::model::ShapeKind;
use crate::validate::LocalValidator;

const START: &str = "flowchart TD\n    A[Start] --> B[End]\n    C[Other]\n";

#[derive(Default)]
struct RecordingStore {
    content: String,
    saves: RefCell<Vec<(String, Option<PatchSpec>)>>,
    offline: Cell<bool>,
}

impl RecordingStore {
    fn with_content(content: &str) -> Self {
        Self { content: content.to_owned(), ..Self::default() }
    }
}

impl DiagramStore for RecordingStore {
    async fn get_diagram(&self, id: &DiagramId) -> Result<DiagramDocument, ApiError> {
        Ok(DiagramDocument {
            id: id.to_string(),
            name: "Test".to_owned(),
            content: self.content.clone(),
        })
    }

    async fn save_diagram(
        &self,
        _id: &DiagramId,
        content: &str,
        patch: Option<&PatchSpec>,
    ) -> Result<SaveResponse, ApiError> {
        if self.offline.get() {
            return Err(ApiError::Network { message: "offline".to_owned() });
        }
        self.saves.borrow_mut().push((content.to_owned(), patch.cloned()));
        Ok(SaveResponse { success: true, error: None, line: None })
    }
}

/// Local validation after a fixed delay, standing in for the network round trip.
struct SlowValidator {
    delay: Duration,
}

impl Validator for SlowValidator {
    async fn validate(&self, content: &str) -> Result<Verdict, ApiError> {
        tokio::time::sleep(self.delay).await;
        Ok(LocalValidator::verdict(content))
    }
}

fn ident(value: &str) -> NodeIdent {
    NodeIdent::new(value).expect("node ident")
}

fn edge(source: &str, target: &str) -> EdgeKey {
    EdgeKey::new(ident(source), ident(target))
}

fn diagram_id() -> DiagramId {
    DiagramId::new("auth-flow").expect("diagram id")
}

#[fixture]
fn session() -> EditorSession<LocalValidator> {
    EditorSession::new(diagram_id(), START, LocalValidator, &EditorConfig::default())
}

fn updated(content: &str) -> ServerMessage {
    ServerMessage::DiagramUpdated { id: "auth-flow".to_owned(), content: content.to_owned() }
}

#[tokio::test]
async fn open_loads_the_document_as_the_first_snapshot() {
    let store = RecordingStore::with_content(START);
    let session =
        EditorSession::open(&store, diagram_id(), LocalValidator, &EditorConfig::default())
            .await
            .expect("open");
    assert_eq!(session.text(), START);
    assert_eq!(session.history().len(), 1);
    assert!(!session.has_unsaved_changes());
}

#[rstest]
#[tokio::test]
async fn committed_edit_updates_text_history_and_autosave(
    mut session: EditorSession<LocalValidator>,
) {
    session
        .apply(&EditOp::CreateNode {
            id: "D".to_owned(),
            kind: ShapeKind::Decision,
            label: "Check".to_owned(),
        })
        .await
        .expect("create node");

    assert!(session.text().contains("D{\"Check\"}"));
    assert_eq!(session.history().len(), 2);
    assert!(session.has_unsaved_changes());
    assert!(session.locate_node(&ident("D")).is_some());
}

#[rstest]
#[tokio::test]
async fn rejected_candidate_leaves_state_untouched(mut session: EditorSession<LocalValidator>) {
    let err = session
        .apply(&EditOp::Patch { find: "A[Start]".to_owned(), replace: "A[]".to_owned() })
        .await
        .expect_err("invalid candidate");

    assert!(matches!(err, EditorError::Validation { line: Some(2), .. }), "{err:?}");
    assert_eq!(session.text(), START);
    assert_eq!(session.history().len(), 1);
    assert!(!session.has_unsaved_changes());
}

#[rstest]
#[tokio::test]
async fn operation_errors_map_to_the_editor_taxonomy(mut session: EditorSession<LocalValidator>) {
    let conflict = session
        .apply(&EditOp::CreateNode {
            id: "A".to_owned(),
            kind: ShapeKind::Action,
            label: "Again".to_owned(),
        })
        .await;
    assert_eq!(conflict, Err(EditorError::IdentifierConflict { id: "A".to_owned() }));

    let missing = session.apply(&EditOp::DeleteEdge { edge: edge("B", "A") }).await;
    assert!(matches!(missing, Err(EditorError::NotFound { .. })));

    let ambiguous = session
        .apply(&EditOp::Patch { find: "    ".to_owned(), replace: "  ".to_owned() })
        .await;
    assert_eq!(ambiguous, Err(EditorError::AmbiguousPatch { count: 2 }));
}

#[rstest]
#[tokio::test]
async fn echo_of_own_save_does_not_touch_history(mut session: EditorSession<LocalValidator>) {
    let store = RecordingStore::default();
    session
        .apply(&EditOp::RelabelEdge { edge: edge("A", "B"), label: "go".to_owned() })
        .await
        .expect("relabel");
    let saved = session.text().to_owned();
    assert!(session.flush(&store).await.expect("flush"));
    assert_eq!(store.saves.borrow().len(), 1);

    let history_len = session.history().len();
    assert_eq!(session.receive_remote(&updated(&saved)), RemoteOutcome::Echo);
    assert_eq!(session.history().len(), history_len);
}

#[rstest]
#[tokio::test]
async fn external_update_replaces_text_and_pushes_history(
    mut session: EditorSession<LocalValidator>,
) {
    let remote = "flowchart TD\n    A --> Z\n";
    assert_eq!(session.receive_remote(&updated(remote)), RemoteOutcome::Applied);
    assert_eq!(session.text(), remote);
    assert_eq!(session.history().len(), 2);
    assert!(!session.has_unsaved_changes());

    assert_eq!(session.receive_remote(&updated(remote)), RemoteOutcome::Unchanged);
    assert!(session.undo());
    assert_eq!(session.text(), START);
}

#[rstest]
fn messages_for_other_diagrams_are_ignored(mut session: EditorSession<LocalValidator>) {
    let other = ServerMessage::DiagramUpdated { id: "other".to_owned(), content: "x".to_owned() };
    assert_eq!(session.receive_remote(&other), RemoteOutcome::Ignored);
    assert_eq!(session.receive_remote(&ServerMessage::Unknown), RemoteOutcome::Ignored);
    assert_eq!(session.text(), START);
}

#[rstest]
#[tokio::test]
async fn deleted_diagram_stops_autosave(mut session: EditorSession<LocalValidator>) {
    let store = RecordingStore::default();
    session.edit_text(format!("{START}    C --> A\n"));
    let deleted = ServerMessage::DiagramDeleted { id: "auth-flow".to_owned() };
    assert_eq!(session.receive_remote(&deleted), RemoteOutcome::Orphaned);
    assert!(session.is_orphaned());
    assert!(!session.has_unsaved_changes());

    let text = session.text().to_owned();
    session.persist(&store, text).await.expect("persist");
    assert!(store.saves.borrow().is_empty());
}

#[rstest]
#[tokio::test(start_paused = true)]
async fn keystroke_bursts_coalesce_into_one_save(mut session: EditorSession<LocalValidator>) {
    let store = RecordingStore::default();
    session.edit_text(format!("{START}    C"));
    tokio::time::advance(Duration::from_millis(200)).await;
    session.edit_text(format!("{START}    C -"));
    tokio::time::advance(Duration::from_millis(200)).await;
    session.edit_text(format!("{START}    C --> A\n"));

    let text = session.next_autosave().await;
    assert_eq!(text, format!("{START}    C --> A\n"));
    session.persist(&store, text).await.expect("persist");
    assert_eq!(store.saves.borrow().len(), 1);
    assert!(!session.has_unsaved_changes());
}

#[rstest]
#[tokio::test]
async fn failed_save_rearms_autosave(mut session: EditorSession<LocalValidator>) {
    let store = RecordingStore::default();
    store.offline.set(true);
    session.edit_text(format!("{START}    C --> A\n"));

    let err = session.flush(&store).await.expect_err("offline");
    assert!(matches!(err, EditorError::Network { .. }));
    assert!(session.has_unsaved_changes());
    assert_eq!(session.text(), format!("{START}    C --> A\n"));

    store.offline.set(false);
    assert!(session.flush(&store).await.expect("retry"));
    assert_eq!(store.saves.borrow().len(), 1);
}

#[rstest]
#[tokio::test]
async fn patch_edits_are_forwarded_with_the_save(mut session: EditorSession<LocalValidator>) {
    let store = RecordingStore::default();
    let patch = PatchSpec { find: "B[End]".to_owned(), replace: "B[Finish]".to_owned() };
    session
        .apply(&EditOp::Patch { find: patch.find.clone(), replace: patch.replace.clone() })
        .await
        .expect("patch");
    session.flush(&store).await.expect("flush");

    let saves = store.saves.borrow();
    assert_eq!(saves.len(), 1);
    assert_eq!(saves[0].1.as_ref(), Some(&patch));
    assert!(saves[0].0.contains("B[Finish]"));
}

#[rstest]
#[tokio::test]
async fn click_completes_pending_reroute(mut session: EditorSession<LocalValidator>) {
    session.begin_reroute_destination(edge("A", "B")).expect("begin");
    assert!(session.context_menu(&ElementSnapshot::new().with_attr("data-id", "C")).is_none());

    let click = session.click_node(ident("C")).await.expect("click");
    assert_eq!(click, NodeClick::Completed);
    assert!(session.text().contains("A[Start] --> C"));
    assert_eq!(session.mode(), &InteractionMode::Idle);
}

#[rstest]
#[tokio::test]
async fn idle_click_jumps_to_the_node(mut session: EditorSession<LocalValidator>) {
    let click = session.click_node(ident("C")).await.expect("click");
    match click {
        NodeClick::JumpTo(location) => assert_eq!(location.line, 2),
        other => panic!("expected jump, got {other:?}"),
    }
    assert_eq!(session.click_node(ident("Nope")).await, Ok(NodeClick::Ignored));
}

#[rstest]
fn context_menu_resolves_rendered_edges(session: EditorSession<LocalValidator>) {
    let element = ElementSnapshot::new().with_attr("id", "L-A-B-0");
    let context = session.context_menu(&element).expect("edge context");
    match context {
        VisualContext::Edge { edge: found, location } => {
            assert_eq!(found, edge("A", "B"));
            assert_eq!(location.line, 1);
        }
        other => panic!("expected edge, got {other:?}"),
    }

    let unknown = ElementSnapshot::new().with_attr("data-id", "Ghost");
    assert!(session.context_menu(&unknown).is_none());
}

#[test]
fn context_menu_picks_the_edge_reading_present_in_source() {
    let text = "flowchart TD\n  Start_1 --> End\n";
    let session = EditorSession::new(diagram_id(), text, LocalValidator, &EditorConfig::default());
    let element = ElementSnapshot::new().with_attr("id", "L_Start_1_End_0");
    match session.context_menu(&element) {
        Some(VisualContext::Edge { edge: found, location }) => {
            assert_eq!(found, edge("Start_1", "End"));
            assert_eq!(location.line, 1);
        }
        other => panic!("expected edge, got {other:?}"),
    }

    let ambiguous = "flowchart TD\n  a_b --> c\n";
    let session =
        EditorSession::new(diagram_id(), ambiguous, LocalValidator, &EditorConfig::default());
    match session.context_menu(&ElementSnapshot::new().with_attr("id", "L_a_b_c_0")) {
        Some(VisualContext::Edge { edge: found, .. }) => assert_eq!(found, edge("a_b", "c")),
        other => panic!("expected edge, got {other:?}"),
    }
}

#[tokio::test(start_paused = true)]
async fn dropping_an_in_flight_edit_commits_nothing() {
    let mut session = EditorSession::new(
        diagram_id(),
        START,
        SlowValidator { delay: Duration::from_secs(5) },
        &EditorConfig::default(),
    );
    session.begin_add_transition(ident("C"), Some("retry".to_owned())).expect("begin");

    let pending =
        tokio::time::timeout(Duration::from_millis(10), session.click_node(ident("A"))).await;
    assert!(pending.is_err(), "validation should still be outstanding");
    assert!(!session.escape());

    assert_eq!(session.text(), START);
    assert_eq!(session.history().len(), 1);
    assert!(!session.has_unsaved_changes());
}

#[rstest]
#[tokio::test]
async fn format_commits_canonical_text(mut session: EditorSession<LocalValidator>) {
    session.format().await.expect("format");
    let formatted = session.text().to_owned();
    assert_eq!(session.history().len(), 2);

    session.format().await.expect("format again");
    assert_eq!(session.text(), formatted);
    assert_eq!(session.history().len(), 2);
}

#[rstest]
fn undo_redo_rearm_autosave(mut session: EditorSession<LocalValidator>) {
    session.edit_text(format!("{START}    C --> A\n"));
    assert!(session.undo());
    assert_eq!(session.text(), START);
    assert!(session.has_unsaved_changes());
    assert!(session.redo());
    assert_eq!(session.text(), format!("{START}    C --> A\n"));
    assert!(!session.redo());
}

#[rstest]
fn busy_mode_is_reported(mut session: EditorSession<LocalValidator>) {
    session.begin_reroute_origin(edge("A", "B")).expect("begin");
    assert_eq!(
        session.begin_add_transition(ident("A"), None),
        Err(EditorError::Busy { active: "selecting_origin" })
    );
    assert!(session.cancel_interaction());
}
