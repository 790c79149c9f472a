mod common;

use codesynth_application::SynthesizerSession;
use codesynth_core::config::SynthConfig;
use codesynth_core::prompt::Preferences;
use codesynth_core::session::{Message, SessionStateRepository, Transcript};
use codesynth_core::storage::KeyValueStore;
use codesynth_core::workspace::{Document, DocumentSet};
use codesynth_infrastructure::session_state_repository::{
    CHAT_HISTORY_KEY, FILES_KEY, SELECTED_FILE_KEY,
};
use codesynth_infrastructure::{JsonFileStore, KvSessionStateRepository, MemoryStore, SynthPaths};
use common::{Reply, ScriptedModel};
use std::sync::Arc;
use tempfile::TempDir;

const RESPONSE: &str = "**Part 1: Best Practices & Novelty Analysis**\n\
* Uses print\n\n\
**Part 2: The Advanced Super Script**\n\
```python\nprint(1)\n```\n\
Run it with python.\n\
```python\nprint(2)\n```\n";

struct Fixture {
    store: Arc<MemoryStore>,
    model: ScriptedModel,
    session: SynthesizerSession,
}

fn open(store: Arc<MemoryStore>, model: ScriptedModel) -> Fixture {
    let repository = Arc::new(KvSessionStateRepository::new(store.clone()));
    let session =
        SynthesizerSession::bootstrap(SynthConfig::default(), Arc::new(model.clone()), repository)
            .unwrap();
    Fixture {
        store,
        model,
        session,
    }
}

fn fresh(replies: Vec<Reply>) -> Fixture {
    open(Arc::new(MemoryStore::new()), ScriptedModel::new(replies))
}

fn doc(name: &str) -> Document {
    Document::new(name, format!("# {name}\n"))
}

#[test]
fn test_first_added_document_is_selected_and_persisted() {
    let fx = fresh(vec![]);

    let added = fx
        .session
        .add_documents(vec![doc("a.py"), doc("b.py"), doc("a.py")])
        .unwrap();

    assert_eq!(added, 2);
    assert_eq!(fx.session.selected_document().unwrap().name, "a.py");
    assert_eq!(fx.store.get(SELECTED_FILE_KEY).unwrap().as_deref(), Some("a.py"));
    let stored: DocumentSet =
        serde_json::from_str(&fx.store.get(FILES_KEY).unwrap().unwrap()).unwrap();
    assert_eq!(stored.len(), 2);

    assert_eq!(fx.session.add_documents(vec![doc("b.py")]).unwrap(), 0);
}

#[test]
fn test_select_unknown_document_is_rejected() {
    let fx = fresh(vec![]);
    fx.session.add_documents(vec![doc("a.py"), doc("b.py")]).unwrap();

    fx.session.select_document("b.py").unwrap();
    assert_eq!(fx.store.get(SELECTED_FILE_KEY).unwrap().as_deref(), Some("b.py"));

    let err = fx.session.select_document("zzz.py").unwrap_err();
    assert!(err.is_invalid_input());
    assert_eq!(fx.session.selected_document().unwrap().name, "b.py");
}

#[test]
fn test_bootstrap_restores_state_and_falls_back_to_first_document() {
    let store = Arc::new(MemoryStore::new());
    let repository = KvSessionStateRepository::new(store.clone());
    let documents: DocumentSet = [doc("a.py"), doc("b.py")].into_iter().collect();
    repository.save_documents(&documents).unwrap();
    repository
        .save_transcript(&Transcript::restore(vec![Message::model("old answer")]))
        .unwrap();
    repository.save_selected_document(Some("deleted.py")).unwrap();

    let fx = open(store, ScriptedModel::default());

    assert_eq!(fx.session.documents(), documents);
    assert_eq!(fx.session.selected_document().unwrap().name, "a.py");
    assert_eq!(fx.session.transcript().len(), 1);
}

#[test]
fn test_bootstrap_keeps_saved_selection() {
    let store = Arc::new(MemoryStore::new());
    let repository = KvSessionStateRepository::new(store.clone());
    repository
        .save_documents(&[doc("a.py"), doc("b.py")].into_iter().collect())
        .unwrap();
    repository.save_selected_document(Some("b.py")).unwrap();

    let fx = open(store, ScriptedModel::default());
    assert_eq!(fx.session.selected_document().unwrap().name, "b.py");
}

#[tokio::test]
async fn test_analysis_is_written_through_to_store() {
    let fx = fresh(vec![Reply::deltas(&["Hello ", "there"])]);
    fx.session.add_documents(vec![doc("a.py")]).unwrap();

    fx.session
        .start_analysis(&Preferences::new("Merge").unwrap())
        .await
        .unwrap();
    fx.session.flush().await;

    let raw = fx.store.get(CHAT_HISTORY_KEY).unwrap().unwrap();
    assert_eq!(raw, r#"[{"role":"model","content":"Hello there"}]"#);
    assert_eq!(fx.model.sent().len(), 1);
}

#[tokio::test]
async fn test_analysis_without_documents_is_rejected() {
    let fx = fresh(vec![]);
    let err = fx
        .session
        .start_analysis(&Preferences::new("Merge").unwrap())
        .await
        .unwrap_err();
    assert!(err.is_invalid_input());
    assert!(fx.model.sent().is_empty());
}

#[tokio::test]
async fn test_latest_script_and_export() {
    let fx = fresh(vec![Reply::deltas(&[RESPONSE])]);
    fx.session.add_documents(vec![doc("a.py")]).unwrap();
    fx.session
        .start_analysis(&Preferences::new("Merge").unwrap())
        .await
        .unwrap();

    let sectioned = fx.session.latest_review(|document| document.is_sectioned());
    assert_eq!(sectioned, Some(true));

    let artifact = fx.session.latest_script().unwrap();
    assert_eq!(artifact.file_name, "synthesized_script.py");
    assert_eq!(
        artifact.content,
        "print(1)\n\n# --- Synthesizer: Appended from next code block ---\n\nprint(2)"
    );

    let dir = TempDir::new().unwrap();
    let path = fx.session.export_script(dir.path()).await.unwrap().unwrap();
    assert_eq!(std::fs::read_to_string(path).unwrap(), artifact.content);
}

#[tokio::test]
async fn test_export_without_script_writes_nothing() {
    let fx = fresh(vec![Reply::deltas(&["Just prose, no code."])]);
    fx.session.add_documents(vec![doc("a.py")]).unwrap();
    fx.session
        .start_analysis(&Preferences::new("Merge").unwrap())
        .await
        .unwrap();

    let dir = TempDir::new().unwrap();
    assert_eq!(fx.session.export_script(dir.path()).await.unwrap(), None);
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
}

#[tokio::test]
async fn test_search_filters_transcript() {
    let fx = fresh(vec![Reply::deltas(&["Use PATHLIB here"]), Reply::deltas(&["ok"])]);
    fx.session.add_documents(vec![doc("a.py")]).unwrap();
    fx.session
        .start_analysis(&Preferences::new("Merge").unwrap())
        .await
        .unwrap();
    fx.session.send_follow_up("why pathlib?").await.unwrap();

    let indices = fx
        .session
        .search("pathlib", |view| view.entries.iter().map(|e| e.index).collect::<Vec<_>>());
    assert_eq!(indices, vec![0, 1]);

    assert_eq!(fx.session.search("", |view| view.len()), 3);
    assert!(fx.session.search("missing", |view| view.is_empty()));
}

#[tokio::test]
async fn test_ingest_files_reads_accepted_extensions() {
    let dir = TempDir::new().unwrap();
    let py = dir.path().join("tool.py");
    let txt = dir.path().join("readme.txt");
    std::fs::write(&py, "x = 1\n").unwrap();
    std::fs::write(&txt, "hi").unwrap();

    let fx = fresh(vec![]);
    let added = fx.session.ingest_files(&[py, txt]).await.unwrap();

    assert_eq!(added, 1);
    assert_eq!(fx.session.selected_document().unwrap().content, "x = 1\n");
}

#[tokio::test]
async fn test_clear_all_forgets_everything() {
    let fx = fresh(vec![Reply::deltas(&["analysis"])]);
    fx.session.add_documents(vec![doc("a.py")]).unwrap();
    fx.session
        .start_analysis(&Preferences::new("Merge").unwrap())
        .await
        .unwrap();

    fx.session.clear_all().await.unwrap();

    assert!(fx.session.documents().is_empty());
    assert!(fx.session.selected_document().is_none());
    assert!(fx.session.transcript().is_empty());
    for key in [FILES_KEY, CHAT_HISTORY_KEY, SELECTED_FILE_KEY] {
        assert_eq!(fx.store.get(key).unwrap(), None);
    }
}

#[tokio::test]
async fn test_streamed_transcript_reaches_state_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("state.json");
    let deltas: Vec<String> = (0..200).map(|i| format!("chunk {i} ")).collect();
    let delta_refs: Vec<&str> = deltas.iter().map(String::as_str).collect();
    let model = ScriptedModel::new([Reply::deltas(&delta_refs)]);

    let store = Arc::new(JsonFileStore::open(&path).unwrap());
    let session = SynthesizerSession::bootstrap(
        SynthConfig::default(),
        Arc::new(model),
        Arc::new(KvSessionStateRepository::new(store)),
    )
    .unwrap();
    session.add_documents(vec![doc("a.py")]).unwrap();
    session
        .start_analysis(&Preferences::new("Merge").unwrap())
        .await
        .unwrap();
    session.flush().await;

    let reopened = KvSessionStateRepository::new(Arc::new(JsonFileStore::open(&path).unwrap()));
    let snapshot = reopened.load();
    assert_eq!(snapshot.transcript, session.transcript());
    assert_eq!(snapshot.transcript.last().unwrap().content, deltas.concat());
    assert_eq!(snapshot.documents.len(), 1);
}

#[tokio::test]
async fn test_open_recovers_from_corrupt_state_file() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("state.json"), "{ not json").unwrap();
    std::fs::write(
        dir.path().join("secret.json"),
        r#"{"gemini":{"api_key":"test-key"}}"#,
    )
    .unwrap();

    let paths = SynthPaths::new(Some(dir.path())).unwrap();
    let session = SynthesizerSession::open(&paths).unwrap();

    assert!(session.documents().is_empty());
    assert!(session.transcript().is_empty());
    assert!(dir.path().join("state.json.corrupt").exists());

    session.add_documents(vec![doc("a.py")]).unwrap();
    drop(session);
    let session = SynthesizerSession::open(&paths).unwrap();
    assert_eq!(session.selected_document().unwrap().name, "a.py");
}
