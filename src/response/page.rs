// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

use super::hits::SearchHits;
use crate::query::Pageable;

/// One page of hits with the request that produced it
#[derive(Debug, Clone, PartialEq)]
pub struct SearchPage<T> {
    pub hits: SearchHits<T>,
    pub pageable: Pageable,
}

impl<T> SearchPage<T> {
    pub fn new(hits: SearchHits<T>, pageable: Pageable) -> Self {
        Self { hits, pageable }
    }

    pub fn total_elements(&self) -> u64 {
        self.hits.total_hits
    }

    /// Zero for an empty result or a zero page size
    pub fn total_pages(&self) -> u64 {
        let size = self.pageable.size as u64;
        if size == 0 {
            return 0;
        }
        self.hits.total_hits.div_ceil(size)
    }

    #[must_use]
    pub fn has_next(&self) -> bool {
        (self.pageable.page as u64).saturating_add(1) < self.total_pages()
    }

    #[must_use]
    pub fn has_previous(&self) -> bool {
        self.pageable.page > 0
    }

    pub fn next_pageable(&self) -> Option<Pageable> {
        self.has_next().then(|| self.pageable.next())
    }

    pub fn previous_pageable(&self) -> Option<Pageable> {
        self.has_previous().then(|| self.pageable.previous())
    }

    pub fn content(&self) -> Vec<&T> {
        self.hits.contents()
    }
}
