// src/pipeline/crawl.rs

//! Run orchestration: partition enumeration, worker fan-out and checkpoint
//! bookkeeping.

use std::collections::HashSet;
use std::path::PathBuf;

use chrono::{Datelike, Utc};
use futures::{StreamExt, stream};

use crate::error::Result;
use crate::models::{
    Config, DocumentOutcome, DocumentRef, PageCursor, Partition, PartitionReport, PartitionStatus,
    RunSummary,
};
use crate::pipeline::checkpoint::{Checkpoint, CheckpointStore};
use crate::pipeline::dedup::Deduplicator;
use crate::services::documents::DocumentFetcher;
use crate::services::fetch::FetchClient;
use crate::services::traverse::{PageStep, PageTraverser};
use crate::storage::DocumentStorage;
use crate::utils::url::SearchUrlBuilder;

#[derive(Debug, Clone, Copy, Default)]
pub struct CrawlOptions {
    /// Continue from the saved checkpoint instead of starting over.
    pub resume: bool,
    /// Discard the checkpoint and refetch documents that are already stored.
    pub clean: bool,
}

/// Crawl every configured partition, resuming where the checkpoint left off.
pub async fn run_crawl(
    config: &Config,
    storage: &dyn DocumentStorage,
    options: &CrawlOptions,
) -> Result<RunSummary> {
    let urls = SearchUrlBuilder::new(&config.crawler.base_url, &config.filters.language)?;
    let fetch = FetchClient::new(&config.crawler)?;
    let store = CheckpointStore::new(
        PathBuf::from(&config.output.target_dir).join(&config.filters.language),
    );

    let mut checkpoint = if options.clean {
        store.clear().await?;
        Checkpoint::new()
    } else if options.resume {
        store.load().await?.unwrap_or_default()
    } else {
        Checkpoint::new()
    };

    let partitions = enumerate_partitions(config);
    log::info!(
        "Crawling {} partition(s) for language {}",
        partitions.len(),
        config.filters.language
    );

    let mut summary = RunSummary::default();
    for partition in partitions {
        if checkpoint.is_completed(&partition) {
            log::debug!("Partition {} already completed, skipping", partition);
            continue;
        }

        let report = crawl_partition(
            config,
            storage,
            &fetch,
            &urls,
            &store,
            &mut checkpoint,
            &partition,
            options,
        )
        .await?;
        summary.push(report);
    }

    summary.log();
    Ok(summary)
}

/// All (year, category) slices this run should cover, most recent year
/// first. The origin's special buckets "1001" (pre-1800 acts) and "?"
/// (no year recorded) come last.
fn enumerate_partitions(config: &Config) -> Vec<Partition> {
    let years: Vec<String> = if config.filters.years.is_empty() {
        let current = Utc::now().year();
        let mut years: Vec<String> = (1801..current).rev().map(|y| y.to_string()).collect();
        years.push("1001".to_string());
        years.push("?".to_string());
        years
    } else {
        config.filters.years.clone()
    };

    years
        .iter()
        .flat_map(|year| {
            config
                .filters
                .categories
                .iter()
                .map(move |category| Partition::new(&config.filters.language, year, category))
        })
        .collect()
}

#[allow(clippy::too_many_arguments)]
async fn crawl_partition(
    config: &Config,
    storage: &dyn DocumentStorage,
    fetch: &FetchClient,
    urls: &SearchUrlBuilder,
    store: &CheckpointStore,
    checkpoint: &mut Checkpoint,
    partition: &Partition,
    options: &CrawlOptions,
) -> Result<PartitionReport> {
    let mut report = PartitionReport::new(partition.clone());
    log::info!("Crawling partition {}", partition);

    let start = if options.resume {
        checkpoint
            .resume_cursor(partition)
            .unwrap_or_else(PageCursor::first)
    } else {
        PageCursor::first()
    };

    let dedup = Deduplicator::new();
    dedup.seed(storage.list_completed_ids(partition).await?);
    dedup.seed(checkpoint.processed_ids(partition));

    checkpoint.begin_partition(partition, start.clone());
    store.save(checkpoint).await?;

    let fetcher = DocumentFetcher::new(
        fetch,
        urls,
        storage,
        &dedup,
        config.output.save_data,
        config.output.save_html,
        options.clean,
    );

    let mut traverser = PageTraverser::new(fetch, urls, partition.clone(), start);

    loop {
        let page_cursor = traverser.cursor().cloned();
        match traverser.next_page().await {
            PageStep::Page(mut page) => {
                if config.output.save_html {
                    if let Err(e) = storage
                        .save_listing_html(partition, page.cursor.index, &page.raw_html)
                        .await
                    {
                        let _ = store.save(checkpoint).await;
                        return Err(e);
                    }
                }

                if !config.filters.label_types.is_empty() {
                    let keep: HashSet<&str> =
                        config.filters.label_types.iter().map(String::as_str).collect();
                    for item in &mut page.items {
                        item.labels.retain(|l| keep.contains(l.as_str()));
                    }
                }

                let processed = match process_page_items(
                    config,
                    &fetcher,
                    partition,
                    &page.items,
                    store,
                    checkpoint,
                    &mut report,
                )
                .await
                {
                    Ok(processed) => processed,
                    Err(e) => {
                        let _ = store.save(checkpoint).await;
                        return Err(e);
                    }
                };

                checkpoint.record_page(page.next.clone(), processed);
                store.save(checkpoint).await?;
            }
            PageStep::End => {
                checkpoint.complete_partition(partition);
                store.save(checkpoint).await?;
                report.status = PartitionStatus::Completed;
                log::info!("Partition {} completed", partition);
                break;
            }
            PageStep::Failed(error) => {
                log::error!("Partition {} stopped: {}", partition, error);
                if let Some(cursor) = page_cursor {
                    let url = urls.listing_url(partition, &cursor);
                    storage
                        .append_error_log(
                            urls.language(),
                            &format!("{url} unreachable at {}", Utc::now()),
                        )
                        .await?;
                }
                store.save(checkpoint).await?;
                report.status = PartitionStatus::Failed;
                break;
            }
        }
    }

    Ok(report)
}

/// Resolve every item of one listing page, fanning out to the worker pool
/// when more than one worker is configured. Returns the ids that were
/// stored or skipped; failed ids are left out so a rerun retries them.
async fn process_page_items(
    config: &Config,
    fetcher: &DocumentFetcher<'_>,
    partition: &Partition,
    items: &[DocumentRef],
    store: &CheckpointStore,
    checkpoint: &mut Checkpoint,
    report: &mut PartitionReport,
) -> Result<Vec<String>> {
    let workers = config.crawler.workers.max(1);
    let mut processed = Vec::new();

    if workers > 1 {
        let mut results = stream::iter(items)
            .map(|item| async move { (item.id.clone(), fetcher.fetch_document(partition, item).await) })
            .buffer_unordered(workers);

        while let Some((id, result)) = results.next().await {
            match result? {
                DocumentOutcome::Stored => {
                    report.stored += 1;
                    processed.push(id);
                }
                DocumentOutcome::Skipped => {
                    report.skipped += 1;
                    processed.push(id);
                }
                DocumentOutcome::Failed(reason) => {
                    log::warn!("Document {} failed: {}", id, reason);
                    report.failed += 1;
                }
            }
        }
    } else {
        let flush_every = config.output.dedup_flush_every.max(1);
        for item in items {
            match fetcher.fetch_document(partition, item).await? {
                DocumentOutcome::Stored => {
                    report.stored += 1;
                    processed.push(item.id.clone());
                }
                DocumentOutcome::Skipped => {
                    report.skipped += 1;
                    processed.push(item.id.clone());
                }
                DocumentOutcome::Failed(reason) => {
                    log::warn!("Document {} failed: {}", item.id, reason);
                    report.failed += 1;
                }
            }

            // Bound the rework window within very long pages.
            if processed.len() >= flush_every {
                checkpoint.record_page(None, processed.drain(..));
                store.save(checkpoint).await?;
            }
        }
    }

    Ok(processed)
}
