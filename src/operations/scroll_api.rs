// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Scroll API and streaming search.
//!
//! ```text
//! search_for_stream(query)
//!   ├─ POST /{index}/_search?scroll=1m     → batch 1 + scroll id
//!   ├─ POST /_search/scroll {scroll_id}    → batch 2 ...
//!   ├─ stop on empty batch or max_results
//!   └─ DELETE /_search/scroll {scroll_id}
//! ```
//!
//! Scroll ids opened here are tracked until cleared or past their
//! keep-alive; the count is exported as the `search_odm_open_scrolls` gauge.
//! A stream dropped before its end still clears its scroll, from a task
//! spawned on the current runtime.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;

use futures::stream::{self, Stream};
use serde_json::json;
use tracing::{debug, warn};

use super::{IndexCoordinates, SearchOperations};
use crate::error::OdmError;
use crate::mapping::Entity;
use crate::metrics::{self, LatencyTimer};
use crate::query::{time_value, Query};
use crate::response::{SearchHit, SearchHits};
use crate::transport::{path, EngineRequest, Transport};

impl SearchOperations {
    /// Open a scroll over the index of `T` and return the first batch
    pub async fn search_scroll_start<T: Entity>(
        &self,
        keep_alive: Duration,
        query: &Query,
    ) -> Result<SearchHits<T>, OdmError> {
        let coordinates = self.coordinates_for::<T>()?;
        self.search_scroll_start_in(keep_alive, query, &coordinates).await
    }

    pub async fn search_scroll_start_in<T: Entity>(
        &self,
        keep_alive: Duration,
        query: &Query,
        coordinates: &IndexCoordinates,
    ) -> Result<SearchHits<T>, OdmError> {
        if matches!(query, Query::Template(_)) {
            return Err(OdmError::InvalidQuery("template queries cannot be scrolled".into()));
        }

        let mut timer = LatencyTimer::new("scroll_start");
        let metadata = self.metadata_for::<T>()?;
        let index = self.index_path(coordinates);

        let mut query = query.clone();
        query.options_mut().scroll_time = Some(keep_alive);

        let request = EngineRequest::post(path(&[&index, "_search"]))
            .params(self.factory.search_params(&query))
            .json(self.factory.search_body(&query, Some(&metadata))?);

        let body = self.execute_ok(request, &index, None).await?;
        let hits = self.read_hits(&body, &metadata)?;
        if let Some(scroll_id) = &hits.scroll_id {
            self.track_scroll(None, scroll_id, keep_alive);
        }

        debug!(index = %index, hits = hits.len(), total = hits.total_hits, "Scroll opened");
        metrics::record_search_hits(hits.len());
        timer.success();
        Ok(hits)
    }

    /// Next batch of an open scroll
    pub async fn search_scroll_continue<T: Entity>(
        &self,
        scroll_id: &str,
        keep_alive: Duration,
    ) -> Result<SearchHits<T>, OdmError> {
        let mut timer = LatencyTimer::new("scroll_continue");
        let metadata = self.metadata_for::<T>()?;
        let index = self.index_path(&self.coordinates_for::<T>()?);

        let request = EngineRequest::post("/_search/scroll").json(json!({
            "scroll": time_value(keep_alive),
            "scroll_id": scroll_id,
        }));

        let body = self.execute_ok(request, &index, None).await?;
        let hits = self.read_hits(&body, &metadata)?;
        if let Some(next_id) = &hits.scroll_id {
            self.track_scroll(Some(scroll_id), next_id, keep_alive);
        }

        metrics::record_search_hits(hits.len());
        timer.success();
        Ok(hits)
    }

    /// Release scroll contexts. Already expired scrolls are not an error.
    pub async fn search_scroll_clear(&self, scroll_ids: &[String]) -> Result<(), OdmError> {
        if scroll_ids.is_empty() {
            return Ok(());
        }

        let response = self.execute(clear_scroll_request(scroll_ids)).await?;

        for id in scroll_ids {
            self.open_scrolls.remove(id);
        }
        metrics::set_open_scrolls(self.open_scrolls.len());

        if response.is_success() || response.is_not_found() {
            debug!(count = scroll_ids.len(), "Scrolls cleared");
            Ok(())
        } else {
            Err(OdmError::from_engine_response(response.status, response.body.as_ref(), "", None))
        }
    }

    /// Scroll ids opened by this instance, not yet cleared and still within
    /// their keep-alive
    pub fn open_scroll_count(&self) -> usize {
        let now = Instant::now();
        self.open_scrolls.retain(|_, expires_at| *expires_at > now);
        metrics::set_open_scrolls(self.open_scrolls.len());
        self.open_scrolls.len()
    }

    /// Stream every hit of `query`, scrolling batch by batch.
    ///
    /// Stops when a batch comes back empty or `max_results` hits were
    /// yielded, then clears the scroll. An error is yielded once and ends
    /// the stream. Dropping the stream early clears the scroll in the
    /// background.
    pub fn search_for_stream<'a, T: Entity>(
        &'a self,
        query: &Query,
    ) -> impl Stream<Item = Result<SearchHit<T>, OdmError>> + 'a {
        let state = StreamState {
            pending_query: Some(query.clone()),
            scroll: ScrollGuard {
                scroll_id: None,
                transport: Arc::clone(&self.transport),
                open_scrolls: Arc::clone(&self.open_scrolls),
            },
            buffer: VecDeque::new(),
            delivered: 0,
            max_results: query.options().max_results,
            keep_alive: query.options().scroll_time.unwrap_or_else(|| self.config.scroll_keep_alive()),
            done: false,
        };

        stream::unfold(state, move |mut state| async move {
            loop {
                if state.done {
                    return None;
                }
                if state.max_results.is_some_and(|max| state.delivered >= max) {
                    self.finish_stream(&mut state).await;
                    return None;
                }
                if let Some(hit) = state.buffer.pop_front() {
                    state.delivered += 1;
                    return Some((Ok(hit), state));
                }

                let batch = match state.pending_query.take() {
                    Some(query) => self.search_scroll_start::<T>(state.keep_alive, &query).await,
                    None => match state.scroll.scroll_id.clone() {
                        Some(id) => self.search_scroll_continue::<T>(&id, state.keep_alive).await,
                        None => {
                            state.done = true;
                            return None;
                        }
                    },
                };

                match batch {
                    Ok(hits) => {
                        if hits.scroll_id.is_some() {
                            state.scroll.scroll_id.clone_from(&hits.scroll_id);
                        }
                        if hits.is_empty() {
                            self.finish_stream(&mut state).await;
                            return None;
                        }
                        state.buffer.extend(hits.hits);
                    }
                    Err(e) => {
                        self.finish_stream(&mut state).await;
                        return Some((Err(e), state));
                    }
                }
            }
        })
    }

    async fn finish_stream<T>(&self, state: &mut StreamState<T>) {
        state.done = true;
        state.buffer.clear();
        if let Some(scroll_id) = state.scroll.scroll_id.take() {
            if let Err(e) = self.search_scroll_clear(&[scroll_id]).await {
                warn!(error = %e, "Failed to clear scroll");
            }
        }
    }

    fn track_scroll(&self, previous: Option<&str>, current: &str, keep_alive: Duration) {
        if let Some(previous) = previous.filter(|p| *p != current) {
            self.open_scrolls.remove(previous);
        }
        self.open_scrolls.insert(current.to_string(), Instant::now() + keep_alive);
        metrics::set_open_scrolls(self.open_scrolls.len());
    }
}

fn clear_scroll_request(scroll_ids: &[String]) -> EngineRequest {
    EngineRequest::delete("/_search/scroll").json(json!({ "scroll_id": scroll_ids }))
}

/// Scroll id of a running stream; cleared on drop unless the stream
/// already released it
struct ScrollGuard {
    scroll_id: Option<String>,
    transport: Arc<dyn Transport>,
    open_scrolls: Arc<DashMap<String, Instant>>,
}

impl Drop for ScrollGuard {
    fn drop(&mut self) {
        let Some(scroll_id) = self.scroll_id.take() else {
            return;
        };
        self.open_scrolls.remove(&scroll_id);
        metrics::set_open_scrolls(self.open_scrolls.len());

        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            warn!(scroll_id = %scroll_id, "Stream dropped outside a runtime, scroll left to expire");
            return;
        };
        let transport = Arc::clone(&self.transport);
        runtime.spawn(async move {
            match transport.send(clear_scroll_request(&[scroll_id])).await {
                Ok(response) if response.is_success() || response.is_not_found() => {
                    debug!("Cleared scroll of dropped stream");
                }
                Ok(response) => warn!(status = response.status, "Failed to clear scroll of dropped stream"),
                Err(e) => warn!(error = %e, "Failed to clear scroll of dropped stream"),
            }
        });
    }
}

struct StreamState<T> {
    /// Query of the first batch, taken once the scroll is open
    pending_query: Option<Query>,
    scroll: ScrollGuard,
    buffer: VecDeque<SearchHit<T>>,
    delivered: usize,
    max_results: Option<usize>,
    keep_alive: Duration,
    done: bool,
}
