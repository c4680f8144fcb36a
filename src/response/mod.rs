// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Typed views of engine responses: hits, pages, aggregations, bulk and
//! by-query results.

mod aggregations;
mod bulk;
mod converter;
mod hits;
mod page;

pub use aggregations::{Aggregate, Aggregations, Bucket};
pub use bulk::{BulkItemResponse, BulkResult, ByQueryFailure, ByQueryResponse, UpdateResponse, UpdateResult};
pub use converter::ResponseConverter;
pub use hits::{SearchHit, SearchHits, TotalHitsRelation};
pub use page::SearchPage;
