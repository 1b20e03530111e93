//! End-to-end crawl runs against a mock origin.

use std::collections::BTreeSet;

use tempfile::TempDir;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use lexcrawl::models::{Config, PageCursor, Partition, PartitionStatus};
use lexcrawl::pipeline::{Checkpoint, CheckpointStore, CrawlOptions, run_crawl};
use lexcrawl::storage::LocalStorage;

fn result_row(celex: &str, title: &str) -> String {
    format!(
        r#"<div class="SearchResult"><h2>
          <a class="title" href="./legal-content/AUTO/?uri=CELEX:{celex}&qid=1"
             name="./legal-content/AUTO/?uri=CELEX:{celex}">{title}</a>
        </h2></div>"#
    )
}

fn listing_page(rows: &[String], next_href: Option<&str>) -> String {
    let next = next_href
        .map(|h| format!(r#"<a href="{h}"><i class="fa fa-angle-right"></i></a>"#))
        .unwrap_or_default();
    format!(
        r#"<html><body>
        <div class="SearchResultsCount">{count} results</div>
        {rows}
        {next}
        </body></html>"#,
        count = rows.len(),
        rows = rows.join("\n"),
    )
}

fn document_page(classifier: &str, text: &str) -> String {
    format!(
        r#"<html><body>
        <div id="PPClass_Contents"><ul>
          <li><a href="./search.html?DC_CODED={classifier}">label</a></li>
        </ul></div>
        <div id="document1"><div class="tabContent">
          <p class="doc-ti">Title</p>
          <div><p>{text}</p></div>
        </div></div>
        </body></html>"#
    )
}

fn test_config(server_uri: &str, target_dir: &std::path::Path) -> Config {
    let mut config = Config::default();
    config.crawler.base_url = server_uri.to_string();
    config.crawler.sleep_time_ms = 1;
    config.crawler.max_retries = 2;
    config.crawler.workers = 1;
    config.filters.years = vec!["2020".to_string()];
    config.filters.categories = vec!["REG".to_string()];
    config.output.target_dir = target_dir.to_string_lossy().into_owned();
    config
}

async fn mount_listing(server: &MockServer, page: u32, body: String) {
    Mock::given(method("GET"))
        .and(path("/search.html"))
        .and(query_param("page", page.to_string()))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .mount(server)
        .await;
}

async fn mount_document(server: &MockServer, celex: &str, body: String) {
    Mock::given(method("GET"))
        .and(path("/legal-content/EN/ALL/"))
        .and(query_param("uri", format!("CELEX:{celex}")))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .mount(server)
        .await;
}

/// Two listing pages with three documents in total.
async fn mount_happy_origin(server: &MockServer) {
    mount_listing(
        server,
        1,
        listing_page(
            &[
                result_row("32020R0001", "Regulation one"),
                result_row("32020R0002", "Regulation two"),
            ],
            Some("./search.html?page=2"),
        ),
    )
    .await;
    mount_listing(
        server,
        2,
        listing_page(&[result_row("32020R0003", "Regulation three")], None),
    )
    .await;

    mount_document(server, "32020R0001", document_page("1309", "Article 1")).await;
    mount_document(server, "32020R0002", document_page("2771", "Article 2")).await;
    mount_document(server, "32020R0003", document_page("1309", "Article 3")).await;
}

#[tokio::test]
async fn crawl_stores_documents_and_completes_partition() {
    let server = MockServer::start().await;
    mount_happy_origin(&server).await;

    let tmp = TempDir::new().unwrap();
    let config = test_config(&server.uri(), tmp.path());
    let storage = LocalStorage::new(tmp.path());

    let summary = run_crawl(&config, &storage, &CrawlOptions::default())
        .await
        .unwrap();

    assert_eq!(summary.stored(), 3);
    assert_eq!(summary.skipped(), 0);
    assert_eq!(summary.failed(), 0);
    assert_eq!(summary.reports.len(), 1);
    assert_eq!(summary.reports[0].status, PartitionStatus::Completed);

    for celex in ["32020R0001", "32020R0002", "32020R0003"] {
        let path = tmp
            .path()
            .join(format!("en/2020/REG/documents/CELEX-{celex}.json"));
        assert!(path.exists(), "missing {path:?}");
    }

    let store = CheckpointStore::new(tmp.path().join("en"));
    let checkpoint = store.load().await.unwrap().unwrap();
    assert!(checkpoint.is_completed(&Partition::new("en", "2020", "REG")));
    assert!(checkpoint.current.is_none());
}

#[tokio::test]
async fn rerun_skips_already_stored_documents() {
    let server = MockServer::start().await;
    mount_happy_origin(&server).await;

    let tmp = TempDir::new().unwrap();
    let config = test_config(&server.uri(), tmp.path());
    let storage = LocalStorage::new(tmp.path());

    run_crawl(&config, &storage, &CrawlOptions::default())
        .await
        .unwrap();

    // Fresh run, no checkpoint resume: listing pages are walked again but
    // stored documents are recognized on disk and skipped.
    let summary = run_crawl(&config, &storage, &CrawlOptions::default())
        .await
        .unwrap();
    assert_eq!(summary.stored(), 0);
    assert_eq!(summary.skipped(), 3);
}

#[tokio::test]
async fn document_failure_does_not_stop_the_partition() {
    let server = MockServer::start().await;
    mount_listing(
        &server,
        1,
        listing_page(
            &[
                result_row("32020R0001", "Regulation one"),
                result_row("32020R0404", "Withdrawn act"),
                result_row("32020R0003", "Regulation three"),
            ],
            None,
        ),
    )
    .await;
    mount_document(&server, "32020R0001", document_page("1309", "Article 1")).await;
    mount_document(&server, "32020R0003", document_page("1309", "Article 3")).await;
    // 32020R0404 has no mock: the origin answers 404.

    let tmp = TempDir::new().unwrap();
    let config = test_config(&server.uri(), tmp.path());
    let storage = LocalStorage::new(tmp.path());

    let summary = run_crawl(&config, &storage, &CrawlOptions::default())
        .await
        .unwrap();

    assert_eq!(summary.stored(), 2);
    assert_eq!(summary.failed(), 1);
    assert_eq!(summary.reports[0].status, PartitionStatus::Completed);
    assert!(
        !tmp.path()
            .join("en/2020/REG/documents/CELEX-32020R0404.json")
            .exists()
    );
}

#[tokio::test]
async fn listing_failure_leaves_resumable_checkpoint() {
    let server = MockServer::start().await;
    mount_listing(
        &server,
        1,
        listing_page(
            &[result_row("32020R0001", "Regulation one")],
            Some("./search.html?page=2"),
        ),
    )
    .await;
    mount_document(&server, "32020R0001", document_page("1309", "Article 1")).await;
    Mock::given(method("GET"))
        .and(path("/search.html"))
        .and(query_param("page", "2"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let tmp = TempDir::new().unwrap();
    let config = test_config(&server.uri(), tmp.path());
    let storage = LocalStorage::new(tmp.path());

    let summary = run_crawl(&config, &storage, &CrawlOptions::default())
        .await
        .unwrap();

    assert_eq!(summary.stored(), 1);
    assert_eq!(summary.reports[0].status, PartitionStatus::Failed);
    assert_eq!(summary.incomplete().count(), 1);

    let store = CheckpointStore::new(tmp.path().join("en"));
    let checkpoint = store.load().await.unwrap().unwrap();
    let partition = Partition::new("en", "2020", "REG");
    assert!(!checkpoint.is_completed(&partition));
    let cursor = checkpoint.resume_cursor(&partition).unwrap();
    assert_eq!(cursor.index, 2);
    assert!(checkpoint.processed_ids(&partition).contains("CELEX-32020R0001"));

    let errors = std::fs::read_to_string(tmp.path().join("en/errors.txt")).unwrap();
    assert!(errors.contains("unreachable at"));
}

#[tokio::test]
async fn resume_starts_from_saved_cursor() {
    let server = MockServer::start().await;
    // Only page 2 exists; hitting page 1 would fail the partition.
    mount_listing(
        &server,
        2,
        listing_page(&[result_row("32020R0003", "Regulation three")], None),
    )
    .await;
    mount_document(&server, "32020R0003", document_page("1309", "Article 3")).await;

    let tmp = TempDir::new().unwrap();
    let config = test_config(&server.uri(), tmp.path());
    let storage = LocalStorage::new(tmp.path());

    let partition = Partition::new("en", "2020", "REG");
    let mut checkpoint = Checkpoint::new();
    checkpoint.begin_partition(
        &partition,
        PageCursor::first().next("./search.html?page=2"),
    );
    checkpoint.record_page(None, ["CELEX-32020R0001".to_string()]);
    let store = CheckpointStore::new(tmp.path().join("en"));
    store.save(&checkpoint).await.unwrap();

    let summary = run_crawl(
        &config,
        &storage,
        &CrawlOptions {
            resume: true,
            clean: false,
        },
    )
    .await
    .unwrap();

    assert_eq!(summary.stored(), 1);
    assert_eq!(summary.reports[0].status, PartitionStatus::Completed);

    let checkpoint = store.load().await.unwrap().unwrap();
    assert!(checkpoint.is_completed(&partition));
}

#[tokio::test]
async fn resume_skips_completed_partitions_without_requests() {
    let server = MockServer::start().await;
    // No mocks at all: any request would fail the partition.

    let tmp = TempDir::new().unwrap();
    let config = test_config(&server.uri(), tmp.path());
    let storage = LocalStorage::new(tmp.path());

    let partition = Partition::new("en", "2020", "REG");
    let mut checkpoint = Checkpoint::new();
    checkpoint.complete_partition(&partition);
    let store = CheckpointStore::new(tmp.path().join("en"));
    store.save(&checkpoint).await.unwrap();

    let summary = run_crawl(
        &config,
        &storage,
        &CrawlOptions {
            resume: true,
            clean: false,
        },
    )
    .await
    .unwrap();

    assert!(summary.reports.is_empty());
}

#[tokio::test]
async fn parallel_workers_store_every_document() {
    let server = MockServer::start().await;
    let celexes = [
        "32020R0001",
        "32020R0002",
        "32020R0003",
        "32020R0004",
        "32020R0005",
    ];
    let rows: Vec<String> = celexes
        .iter()
        .map(|c| result_row(c, &format!("Act {c}")))
        .collect();
    mount_listing(&server, 1, listing_page(&rows, None)).await;
    for celex in celexes {
        mount_document(&server, celex, document_page("1309", "Article")).await;
    }

    let tmp = TempDir::new().unwrap();
    let mut config = test_config(&server.uri(), tmp.path());
    config.crawler.workers = 3;
    let storage = LocalStorage::new(tmp.path());

    let summary = run_crawl(&config, &storage, &CrawlOptions::default())
        .await
        .unwrap();

    assert_eq!(summary.stored(), 5);
    assert_eq!(summary.reports[0].status, PartitionStatus::Completed);

    let store = CheckpointStore::new(tmp.path().join("en"));
    let checkpoint = store.load().await.unwrap().unwrap();
    assert!(checkpoint.is_completed(&Partition::new("en", "2020", "REG")));

    let stored: BTreeSet<String> = celexes
        .iter()
        .filter(|c| {
            tmp.path()
                .join(format!("en/2020/REG/documents/CELEX-{c}.json"))
                .exists()
        })
        .map(|c| c.to_string())
        .collect();
    assert_eq!(stored.len(), 5);
}

#[tokio::test]
async fn clean_run_refetches_stored_documents() {
    let server = MockServer::start().await;
    mount_happy_origin(&server).await;

    let tmp = TempDir::new().unwrap();
    let config = test_config(&server.uri(), tmp.path());
    let storage = LocalStorage::new(tmp.path());

    run_crawl(&config, &storage, &CrawlOptions::default())
        .await
        .unwrap();

    let summary = run_crawl(
        &config,
        &storage,
        &CrawlOptions {
            resume: false,
            clean: true,
        },
    )
    .await
    .unwrap();

    assert_eq!(summary.stored(), 3);
    assert_eq!(summary.skipped(), 0);
}
