//! Integration tests for the session controller: aggregation, persistence,
//! staleness, task guards, and range downloads.

mod support;
use support::fixtures::{Gate, MockSource, numbered_chapters};
use support::socket_guard::start_mock_server_or_skip;

use std::sync::Arc;

use manga_fetcher::download::{ChapterDownloader, NoProgress, chapter_dir};
use manga_fetcher::session::{
    ChapterPosition, Session, SessionError, SessionStore, TaskKind, aggregate_search,
};
use manga_fetcher::source::{Manga, SourceId, SourceRegistry};
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, ResponseTemplate};

fn ids(names: &[&str]) -> Vec<SourceId> {
    names.iter().map(|name| SourceId::new(*name)).collect()
}

fn open_session(temp: &TempDir, registry: SourceRegistry) -> Session {
    Session::open(
        registry,
        SessionStore::new(temp.path().join("state").join("session.json")),
        temp.path().join("downloads"),
        ChapterDownloader::new(false),
    )
}

fn two_source_registry() -> SourceRegistry {
    let mut registry = SourceRegistry::new();
    registry.register(MockSource::new("alpha").with_results(&["A One", "A Two"]));
    registry.register(MockSource::new("beta").with_results(&["B One"]));
    registry
}

#[tokio::test]
async fn test_aggregate_search_groups_by_source_order() {
    let mut registry = SourceRegistry::new();
    registry.register(MockSource::new("alpha").with_results(&["A One", "A Two"]));
    registry.register(MockSource::new("broken").failing_search(500));
    registry.register(MockSource::new("beta").with_results(&["B One"]));

    let results = aggregate_search(&registry, &ids(&["beta", "broken", "alpha"]), "q", 1)
        .await
        .unwrap();

    let rows: Vec<(String, String)> = results
        .iter()
        .map(|entry| (entry.source.to_string(), entry.manga.title.clone()))
        .collect();
    assert_eq!(
        rows,
        vec![
            ("beta".to_string(), "B One".to_string()),
            ("alpha".to_string(), "A One".to_string()),
            ("alpha".to_string(), "A Two".to_string()),
        ]
    );
}

#[tokio::test]
async fn test_aggregate_search_all_sources_failing_is_empty_not_error() {
    let mut registry = SourceRegistry::new();
    registry.register(MockSource::new("broken").failing_search(503));

    let results = aggregate_search(&registry, &ids(&["broken", "missing"]), "q", 1)
        .await
        .unwrap();
    assert!(results.is_empty());
}

#[tokio::test]
async fn test_aggregate_search_without_sources_is_invalid_selection() {
    let err = aggregate_search(&two_source_registry(), &[], "q", 1)
        .await
        .unwrap_err();
    assert!(matches!(err, SessionError::InvalidSelection { .. }));
    assert_eq!(err.to_string(), "no source selected");
}

#[tokio::test]
async fn test_session_search_uses_active_sources_and_stores_results() {
    let temp = TempDir::new().unwrap();
    let session = open_session(&temp, two_source_registry());
    assert_eq!(session.active_sources(), ids(&["alpha"]));

    session.toggle_source(&SourceId::new("beta")).unwrap();
    let results = session.search("one", 1).await.unwrap();

    assert_eq!(results.len(), 3);
    assert_eq!(session.results(), results);
    assert_eq!(session.snapshot().last_query.as_deref(), Some("one"));
}

#[tokio::test]
async fn test_search_groups_results_in_toggle_order() {
    let temp = TempDir::new().unwrap();
    let session = open_session(&temp, two_source_registry());

    session.toggle_source(&SourceId::new("beta")).unwrap();
    session.toggle_source(&SourceId::new("alpha")).unwrap();
    session.toggle_source(&SourceId::new("alpha")).unwrap();
    assert_eq!(session.active_sources(), ids(&["beta", "alpha"]));

    let sources: Vec<String> = session
        .search("one", 1)
        .await
        .unwrap()
        .iter()
        .map(|entry| entry.source.to_string())
        .collect();
    assert_eq!(sources, vec!["beta", "alpha", "alpha"]);

    let reopened = open_session(&temp, two_source_registry());
    assert_eq!(reopened.active_sources(), ids(&["beta", "alpha"]));
}

#[test]
fn test_toggle_rejects_last_active_and_unknown_source() {
    let temp = TempDir::new().unwrap();
    let session = open_session(&temp, two_source_registry());

    let err = session.toggle_source(&SourceId::new("alpha")).unwrap_err();
    assert_eq!(err.to_string(), "at least one source must stay active");

    let err = session.toggle_source(&SourceId::new("gamma")).unwrap_err();
    assert!(matches!(err, SessionError::InvalidSelection { .. }));
    assert_eq!(session.active_sources(), ids(&["alpha"]));
}

#[test]
fn test_session_round_trip_restores_selection_range_and_theme() {
    let temp = TempDir::new().unwrap();
    {
        let session = open_session(&temp, two_source_registry());
        session.toggle_source(&SourceId::new("beta")).unwrap();
        session
            .select_manga(SourceId::new("beta"), Manga::new("first", "First", None))
            .unwrap();
        session.set_start(2).unwrap();
        session.set_end(4).unwrap();
        session
            .select_manga(SourceId::new("alpha"), Manga::new("second", "Second", None))
            .unwrap();
        session.click_advance(7).unwrap();
        session.set_theme("Solarized Dark");
    }

    let reopened = open_session(&temp, two_source_registry());
    assert_eq!(reopened.active_sources(), ids(&["alpha", "beta"]));
    let active = reopened.active().unwrap();
    assert_eq!(active.source, SourceId::new("alpha"));
    assert_eq!(active.manga.title, "Second");
    assert_eq!(reopened.range().start, Some(7));
    assert_eq!(reopened.range().end, None);
    assert_eq!(reopened.snapshot().theme_name.as_deref(), Some("Solarized Dark"));

    // The per-manga cache survives too.
    let range = reopened
        .select_manga(SourceId::new("beta"), Manga::new("first", "First", None))
        .unwrap();
    assert_eq!((range.start, range.end), (Some(2), Some(4)));
}

#[test]
fn test_corrupt_session_file_loads_defaults() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("state").join("session.json");
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(&path, "{ not json").unwrap();

    let session = open_session(&temp, two_source_registry());
    assert!(session.active().is_none());
    assert_eq!(session.active_sources(), ids(&["alpha"]));
}

#[test]
fn test_selection_from_unavailable_source_is_not_restored() {
    let temp = TempDir::new().unwrap();
    {
        let session = open_session(&temp, two_source_registry());
        session
            .select_manga(SourceId::new("beta"), Manga::new("b", "B", None))
            .unwrap();
    }

    let mut registry = SourceRegistry::new();
    registry.register(MockSource::new("alpha"));
    let session = open_session(&temp, registry);
    assert!(session.active().is_none());
}

#[test]
fn test_range_actions_require_active_manga() {
    let temp = TempDir::new().unwrap();
    let session = open_session(&temp, two_source_registry());

    let err = session.set_start(1).unwrap_err();
    assert_eq!(err.to_string(), "no manga selected");
    assert!(session.resolve_selection().is_err());
}

#[tokio::test]
async fn test_chapter_rows_mark_range_bounds() {
    let temp = TempDir::new().unwrap();
    let mut registry = SourceRegistry::new();
    registry.register(MockSource::new("alpha").with_chapters(numbered_chapters(5)));
    let session = open_session(&temp, registry);
    session
        .select_manga(SourceId::new("alpha"), Manga::new("m", "Manga", None))
        .unwrap();
    session.set_start(4).unwrap();
    session.set_end(2).unwrap();

    session.load_chapters().await.unwrap().unwrap();
    let positions: Vec<ChapterPosition> = session
        .chapter_rows()
        .iter()
        .map(|row| row.position)
        .collect();

    assert_eq!(
        positions,
        vec![
            ChapterPosition::Outside,
            ChapterPosition::End,
            ChapterPosition::InRange,
            ChapterPosition::Start,
            ChapterPosition::Outside,
        ]
    );
    assert_eq!(session.resolve_selection().unwrap(), (2, 4));
    assert_eq!(
        session.range_summary().as_deref(),
        Some("Chapter 2 -> Chapter 4")
    );
}

#[tokio::test]
async fn test_stale_chapter_load_is_dropped() {
    let temp = TempDir::new().unwrap();
    let gate = Gate::default();
    let mut registry = SourceRegistry::new();
    registry.register(
        MockSource::new("alpha")
            .with_chapters(numbered_chapters(3))
            .with_chapter_gate(gate.clone()),
    );
    let session = Arc::new(open_session(&temp, registry));
    session
        .select_manga(SourceId::new("alpha"), Manga::new("old", "Old", None))
        .unwrap();

    let loader = {
        let session = Arc::clone(&session);
        tokio::spawn(async move { session.load_chapters().await })
    };
    gate.entered.notified().await;
    session
        .select_manga(SourceId::new("alpha"), Manga::new("new", "New", None))
        .unwrap();
    gate.release.notify_one();

    let outcome = loader.await.unwrap().unwrap();
    assert!(outcome.is_none());
    assert!(session.chapters().is_empty());
    assert_eq!(session.active().unwrap().manga.slug, "new");
}

#[tokio::test]
async fn test_second_chapter_load_while_running_is_busy() {
    let temp = TempDir::new().unwrap();
    let gate = Gate::default();
    let mut registry = SourceRegistry::new();
    registry.register(
        MockSource::new("alpha")
            .with_chapters(numbered_chapters(2))
            .with_chapter_gate(gate.clone()),
    );
    let session = Arc::new(open_session(&temp, registry));
    session
        .select_manga(SourceId::new("alpha"), Manga::new("m", "Manga", None))
        .unwrap();

    let loader = {
        let session = Arc::clone(&session);
        tokio::spawn(async move { session.load_chapters().await })
    };
    gate.entered.notified().await;

    let err = session.load_chapters().await.unwrap_err();
    assert!(matches!(
        err,
        SessionError::Busy {
            kind: TaskKind::ChapterLoad
        }
    ));

    gate.release.notify_one();
    let loaded = loader.await.unwrap().unwrap().unwrap();
    assert_eq!(loaded.len(), 2);
    assert_eq!(session.chapters().len(), 2);
}

#[tokio::test]
async fn test_second_search_while_running_is_busy() {
    let temp = TempDir::new().unwrap();
    let gate = Gate::default();
    let mut registry = SourceRegistry::new();
    registry.register(
        MockSource::new("alpha")
            .with_results(&["Only"])
            .with_search_gate(gate.clone()),
    );
    let session = Arc::new(open_session(&temp, registry));

    let first = {
        let session = Arc::clone(&session);
        tokio::spawn(async move { session.search("a", 1).await })
    };
    gate.entered.notified().await;

    let err = session.search("b", 1).await.unwrap_err();
    assert!(matches!(err, SessionError::Busy { kind: TaskKind::Search }));

    gate.release.notify_one();
    assert_eq!(first.await.unwrap().unwrap().len(), 1);
}

#[tokio::test]
async fn test_download_selection_marks_downloaded_chapters() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    Mock::given(method("GET"))
        .and(path("/img.jpg"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"img".to_vec()))
        .mount(&server)
        .await;

    let temp = TempDir::new().unwrap();
    let page = vec![format!("{}/img.jpg", server.uri())];
    let mut registry = SourceRegistry::new();
    registry.register(
        MockSource::new("alpha")
            .with_chapters(numbered_chapters(4))
            .with_pages("c2", page.clone())
            .with_pages("c3", page),
    );
    let session = open_session(&temp, registry);
    session
        .select_manga(SourceId::new("alpha"), Manga::new("m", "My Manga", None))
        .unwrap();
    session.load_chapters().await.unwrap().unwrap();
    session.set_start(2).unwrap();
    session.set_end(3).unwrap();

    let summary = session.download_selection(&NoProgress).await.unwrap();
    assert_eq!(summary.completed.len(), 2);
    assert!(summary.failed.is_empty());
    assert!(
        chapter_dir(&temp.path().join("downloads"), "My Manga", "Chapter 3")
            .join("001.jpg")
            .exists()
    );

    let downloaded: Vec<bool> = session
        .chapter_rows()
        .iter()
        .map(|row| row.downloaded)
        .collect();
    assert_eq!(downloaded, vec![false, true, true, false]);
}

#[tokio::test]
async fn test_download_selection_uses_current_context_only() {
    let temp = TempDir::new().unwrap();
    let mut registry = SourceRegistry::new();
    registry.register(
        MockSource::new("alpha")
            .with_chapters(numbered_chapters(2))
            .with_pages("c1", vec!["http://127.0.0.1:9/unused.jpg".to_string()]),
    );
    let session = open_session(&temp, registry);
    session
        .select_manga(SourceId::new("alpha"), Manga::new("a", "First", None))
        .unwrap();
    session.load_chapters().await.unwrap().unwrap();

    // Switching clears the loaded list; the old chapters must not be used.
    session
        .select_manga(SourceId::new("alpha"), Manga::new("b", "Second", None))
        .unwrap();
    let err = session.download_selection(&NoProgress).await.unwrap_err();

    assert_eq!(err.to_string(), "no chapters");
    assert!(!temp.path().join("downloads").join("First").exists());
    assert!(!temp.path().join("downloads").join("Second").exists());
}

#[tokio::test]
async fn test_reconcile_on_load_sees_existing_directories() {
    let temp = TempDir::new().unwrap();
    let mut registry = SourceRegistry::new();
    registry.register(MockSource::new("alpha").with_chapters(numbered_chapters(3)));
    let session = open_session(&temp, registry);
    std::fs::create_dir_all(chapter_dir(&temp.path().join("downloads"), "Manga", "Chapter 1"))
        .unwrap();
    session
        .select_manga(SourceId::new("alpha"), Manga::new("m", "Manga", None))
        .unwrap();

    session.load_chapters().await.unwrap().unwrap();
    let first = session.refresh_downloaded().unwrap();
    let second = session.refresh_downloaded().unwrap();

    assert_eq!(first, second);
    assert!(first.contains("c1"));
    assert_eq!(first.len(), 1);
}
