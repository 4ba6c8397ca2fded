// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use crate::errors::PipelineError;

/// Lazily splits an ordered sequence into chunks of at most `chunk_size`.
///
/// Chunks are produced on demand, preserve input order, and only the last one
/// may be short. The iterator is finite and is not restartable.
#[derive(Debug)]
pub struct Chunks<I> {
    inner: I,
    chunk_size: usize,
}

impl<I: Iterator> Chunks<I> {
    pub fn new<T>(items: T, chunk_size: usize) -> Result<Self, PipelineError>
    where
        T: IntoIterator<IntoIter = I>,
    {
        if chunk_size == 0 {
            return Err(PipelineError::InvalidChunkSize);
        }
        Ok(Self {
            inner: items.into_iter(),
            chunk_size,
        })
    }
}

impl<I: Iterator> Iterator for Chunks<I> {
    type Item = Vec<I::Item>;

    fn next(&mut self) -> Option<Self::Item> {
        let chunk: Vec<I::Item> = self.inner.by_ref().take(self.chunk_size).collect();
        if chunk.is_empty() {
            None
        } else {
            Some(chunk)
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let (lower, upper) = self.inner.size_hint();
        (
            lower.div_ceil(self.chunk_size),
            upper.map(|upper| upper.div_ceil(self.chunk_size)),
        )
    }
}
