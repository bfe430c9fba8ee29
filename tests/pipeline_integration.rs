//! End-to-end tests for the resolution pipeline against a mock mirror.
//!
//! These drive a real HTTP client through the full
//! crawl -> extract -> download flow and verify the health-store deltas
//! each terminal outcome produces.

use std::sync::Arc;

use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use paperdl_core::{
    ChooserStrategy, Database, HttpFetcher, Identifier, LinkExtractor, MirrorStore, OutputSpec,
    ProxyMap, ResolutionTask, TaskError, TaskRuntime, TaskStatus,
};

async fn runtime_for(mirror_url: &str) -> TaskRuntime {
    let db = Database::new_in_memory().await.expect("in-memory db");
    let store = MirrorStore::new(db);
    store.upsert(mirror_url).await.expect("seed mirror");

    TaskRuntime {
        store,
        fetcher: Arc::new(HttpFetcher::new(&ProxyMap::new()).expect("fetcher")),
        extractor: LinkExtractor::new("a#pdf", "href").expect("extractor"),
        strategy: ChooserStrategy::AvailabilityFirst,
    }
}

#[tokio::test]
async fn test_doi_task_reaches_done_and_updates_health() {
    let mock_server = MockServer::start().await;
    let temp_dir = tempfile::tempdir().expect("temp dir");

    Mock::given(method("GET"))
        .and(path("/10.1/xyz"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r##"<html>
                <head><title>Paper Title | Journal</title></head>
                <body><a id="pdf" href="/downloads/a.pdf">download</a></body>
            </html>"##,
        ))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/downloads/a.pdf"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"%PDF-1.4 fake"))
        .mount(&mock_server)
        .await;

    let mirror_url = mock_server.uri();
    let runtime = runtime_for(&mirror_url).await;

    let mut task = ResolutionTask::new(
        Identifier::doi("10.1/xyz").expect("doi"),
        None,
        OutputSpec::Dir(temp_dir.path().to_path_buf()),
        runtime.clone(),
    );
    task.run().await.expect("task should succeed");

    let context = task.context();
    assert_eq!(context.status(), TaskStatus::Done);
    assert_eq!(context.referer.as_deref(), Some(mirror_url.as_str()));

    let info = context.info.as_ref().expect("info set on success");
    assert_eq!(info.document_url, format!("{mirror_url}/downloads/a.pdf"));
    assert_eq!(info.title, "Journal");

    let output_path = context.output_path.as_ref().expect("output path set");
    assert_eq!(
        output_path.file_name().and_then(|n| n.to_str()),
        Some("Journal.pdf")
    );
    assert_eq!(
        std::fs::read(output_path).expect("document readable"),
        b"%PDF-1.4 fake"
    );

    let mirrors = runtime.store.get_all().await.expect("store readable");
    assert_eq!(mirrors.len(), 1);
    assert_eq!(mirrors[0].success_times, 1);
    assert_eq!(mirrors[0].failed_times, 0);
}

#[tokio::test]
async fn test_unmatched_selector_fails_extraction_and_charges_mirror() {
    let mock_server = MockServer::start().await;
    let temp_dir = tempfile::tempdir().expect("temp dir");

    Mock::given(method("GET"))
        .and(path("/10.1/xyz"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("<html><body><p>article moved</p></body></html>"),
        )
        .mount(&mock_server)
        .await;

    let runtime = runtime_for(&mock_server.uri()).await;

    let mut task = ResolutionTask::new(
        Identifier::doi("10.1/xyz").expect("doi"),
        None,
        OutputSpec::Dir(temp_dir.path().to_path_buf()),
        runtime.clone(),
    );
    let result = task.run().await;

    assert!(matches!(result, Err(TaskError::Extract(_))));
    assert_eq!(task.context().status(), TaskStatus::ExtractingFailed);
    assert!(task.context().error.is_some());

    let mirrors = runtime.store.get_all().await.expect("store readable");
    assert_eq!(mirrors[0].failed_times, 1);
    assert_eq!(mirrors[0].success_times, 0);
}

#[tokio::test]
async fn test_unreachable_mirror_fails_crawl_and_charges_mirror() {
    let mock_server = MockServer::start().await;
    let temp_dir = tempfile::tempdir().expect("temp dir");

    Mock::given(method("GET"))
        .and(path("/10.1/xyz"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&mock_server)
        .await;

    let runtime = runtime_for(&mock_server.uri()).await;

    let mut task = ResolutionTask::new(
        Identifier::doi("10.1/xyz").expect("doi"),
        None,
        OutputSpec::Dir(temp_dir.path().to_path_buf()),
        runtime.clone(),
    );
    let result = task.run().await;

    assert!(matches!(result, Err(TaskError::Crawl(_))));
    assert_eq!(task.context().status(), TaskStatus::CrawlingFailed);

    let mirrors = runtime.store.get_all().await.expect("store readable");
    assert_eq!(mirrors[0].failed_times, 1);
}

#[tokio::test]
async fn test_pmid_task_queries_pubmed_path() {
    let mock_server = MockServer::start().await;
    let temp_dir = tempfile::tempdir().expect("temp dir");

    Mock::given(method("GET"))
        .and(path("/pubmed/31452104"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(r#"<a id="pdf" href="/files/p.pdf">x</a>"#),
        )
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/files/p.pdf"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"%PDF"))
        .mount(&mock_server)
        .await;

    let runtime = runtime_for(&mock_server.uri()).await;

    let mut task = ResolutionTask::new(
        Identifier::pmid(31452104).expect("pmid"),
        None,
        OutputSpec::Dir(temp_dir.path().to_path_buf()),
        runtime,
    );
    task.run().await.expect("pmid task should succeed");

    // Empty title falls back to the document URL's filename.
    assert_eq!(
        task.context()
            .output_path
            .as_ref()
            .and_then(|p| p.file_name())
            .and_then(|n| n.to_str()),
        Some("p.pdf")
    );
}

#[tokio::test]
async fn test_title_task_queries_search_endpoint() {
    let mock_server = MockServer::start().await;
    let temp_dir = tempfile::tempdir().expect("temp dir");

    Mock::given(method("GET"))
        .and(path("/search"))
        .and(query_param("request", "deep learning"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(r#"<a id="pdf" href="/files/dl.pdf">x</a>"#),
        )
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/files/dl.pdf"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"%PDF"))
        .mount(&mock_server)
        .await;

    let runtime = runtime_for(&mock_server.uri()).await;

    let mut task = ResolutionTask::new(
        Identifier::title("deep learning").expect("title"),
        None,
        OutputSpec::Dir(temp_dir.path().to_path_buf()),
        runtime,
    );
    task.run().await.expect("title task should succeed");
    assert_eq!(task.context().status(), TaskStatus::Done);
}

#[tokio::test]
async fn test_explicit_file_output_spec_is_used_as_is() {
    let mock_server = MockServer::start().await;
    let temp_dir = tempfile::tempdir().expect("temp dir");

    Mock::given(method("GET"))
        .and(path("/10.1/xyz"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(r#"<a id="pdf" href="/files/a.pdf">x</a>"#),
        )
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/files/a.pdf"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"%PDF"))
        .mount(&mock_server)
        .await;

    let runtime = runtime_for(&mock_server.uri()).await;
    let explicit = temp_dir.path().join("nested").join("chosen-name.pdf");

    let mut task = ResolutionTask::new(
        Identifier::doi("10.1/xyz").expect("doi"),
        None,
        OutputSpec::File(explicit.clone()),
        runtime,
    );
    task.run().await.expect("task should succeed");

    // Parent directories are created for explicit file paths.
    assert!(explicit.exists());
}

#[tokio::test]
async fn test_consecutive_tasks_accumulate_health_statistics() {
    let mock_server = MockServer::start().await;
    let temp_dir = tempfile::tempdir().expect("temp dir");

    Mock::given(method("GET"))
        .and(path("/10.1/good"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(r#"<a id="pdf" href="/files/a.pdf">x</a>"#),
        )
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/files/a.pdf"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"%PDF"))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/10.1/bad"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&mock_server)
        .await;

    let runtime = runtime_for(&mock_server.uri()).await;

    let mut ok_task = ResolutionTask::new(
        Identifier::doi("10.1/good").expect("doi"),
        None,
        OutputSpec::Dir(temp_dir.path().to_path_buf()),
        runtime.clone(),
    );
    ok_task.run().await.expect("first task should succeed");

    let mut bad_task = ResolutionTask::new(
        Identifier::doi("10.1/bad").expect("doi"),
        None,
        OutputSpec::Dir(temp_dir.path().to_path_buf()),
        runtime.clone(),
    );
    let result = bad_task.run().await;
    assert!(result.is_err(), "second task must fail independently");

    let mirrors = runtime.store.get_all().await.expect("store readable");
    assert_eq!(mirrors[0].success_times, 1);
    assert_eq!(mirrors[0].failed_times, 1);
}
