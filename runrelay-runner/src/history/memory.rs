// Copyright (c) The runrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use super::{HistoryKey, HistoryOptions, HistoryStore, HistoryWindow, RunSummary};
use crate::errors::HistoryError;
use std::{collections::BTreeMap, sync::Mutex};

/// A [`HistoryStore`] that keeps windows in memory.
#[derive(Debug, Default)]
pub struct MemoryHistoryStore {
    options: HistoryOptions,
    windows: Mutex<BTreeMap<HistoryKey, HistoryWindow>>,
}

impl MemoryHistoryStore {
    /// Creates an empty store.
    pub fn new(options: HistoryOptions) -> Self {
        Self {
            options,
            windows: Mutex::new(BTreeMap::new()),
        }
    }

    /// Replaces the window for `key`.
    pub fn insert(&self, key: HistoryKey, window: HistoryWindow) {
        self.lock().insert(key, window);
    }

    /// Returns every key with a window, in sorted order.
    pub fn keys(&self) -> Vec<HistoryKey> {
        self.lock().keys().cloned().collect()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BTreeMap<HistoryKey, HistoryWindow>> {
        // A panic while holding the lock can't leave a window half-updated.
        self.windows
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl HistoryStore for MemoryHistoryStore {
    fn record(&self, key: &HistoryKey, summary: RunSummary) -> Result<Vec<RunSummary>, HistoryError> {
        let mut windows = self.lock();
        let window = windows.entry(key.clone()).or_default();
        window.push_bounded(summary, self.options.max_entries);
        Ok(window.recent(self.options.recent_entries).to_vec())
    }

    fn read(&self, key: &HistoryKey) -> HistoryWindow {
        self.lock().get(key).cloned().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{classify::ClassificationKey, history::tests::summary};
    use proptest::prelude::*;
    use test_strategy::proptest;

    #[test]
    fn twenty_one_records() {
        let store = MemoryHistoryStore::new(HistoryOptions::default());
        let key = HistoryKey::from(&ClassificationKey::new("DEMO-7"));
        store.insert(
            key.clone(),
            HistoryWindow::new((0..20).map(|seq| summary(seq, 0, 1, 1)).collect()),
        );

        let newest = summary(20, 1, 0, 1);
        let recent = store.record(&key, newest).expect("memory store is infallible");
        assert_eq!(recent.len(), 3);
        assert_eq!(recent.last(), Some(&newest));

        let window = store.read(&key);
        assert_eq!(window.len(), 20);
        assert!(!window.entries().contains(&summary(0, 0, 1, 1)));
    }

    #[proptest]
    fn record_bound(#[strategy(0usize..50)] record_count: usize) {
        let store = MemoryHistoryStore::new(HistoryOptions::default());
        let key = HistoryKey::overall();

        let mut recent = Vec::new();
        for seq in 0..record_count {
            recent = store
                .record(&key, summary(seq as i64, 1, 0, 1))
                .expect("memory store is infallible");
        }

        let window = store.read(&key);
        prop_assert_eq!(window.len(), record_count.min(20));
        prop_assert_eq!(recent.len(), record_count.min(3));
        prop_assert_eq!(recent.as_slice(), window.recent(3));
        if record_count > 0 {
            prop_assert_eq!(
                window.entries().last(),
                Some(&summary(record_count as i64 - 1, 1, 0, 1))
            );
        }
    }
}
