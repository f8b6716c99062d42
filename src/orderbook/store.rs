//! Per-market store of synthetic books

use super::SyntheticOrderBook;
use crate::event::MarketEvent;
use crate::market::MarketSubscription;
use std::collections::HashMap;
use thiserror::Error;

/// Order book store errors
#[derive(Debug, Error)]
pub enum StoreError {
    /// Event references an asset this store does not hold
    #[error("Unknown asset {asset_id} for market {market_slug}")]
    UnknownAsset {
        market_slug: String,
        asset_id: String,
    },
    /// A binary market must have exactly two outcome books
    #[error("Market {market_slug} needs exactly 2 outcome books, got {count}")]
    NotBinary { market_slug: String, count: usize },
    /// The same asset was registered twice
    #[error("Duplicate asset {0}")]
    DuplicateAsset(String),
}

/// Holds the two outcome books of one binary market.
///
/// Books keep the order they were registered in; `pair()` returns them as
/// (book A, book B) in that order.
#[derive(Debug, Clone)]
pub struct OrderBookStore {
    market_slug: String,
    market_id: String,
    books: Vec<SyntheticOrderBook>,
    index: HashMap<String, usize>,
}

impl OrderBookStore {
    /// Create a store from exactly two books
    pub fn new(
        market_slug: impl Into<String>,
        market_id: impl Into<String>,
        books: Vec<SyntheticOrderBook>,
    ) -> Result<Self, StoreError> {
        let market_slug = market_slug.into();

        if books.len() != 2 {
            return Err(StoreError::NotBinary {
                market_slug,
                count: books.len(),
            });
        }

        let mut index = HashMap::with_capacity(books.len());
        for (i, book) in books.iter().enumerate() {
            if index.insert(book.asset_id.clone(), i).is_some() {
                return Err(StoreError::DuplicateAsset(book.asset_id.clone()));
            }
        }

        Ok(Self {
            market_slug,
            market_id: market_id.into(),
            books,
            index,
        })
    }

    /// Create empty books for every outcome of a subscription
    pub fn from_subscription(subscription: &MarketSubscription) -> Result<Self, StoreError> {
        let books = subscription
            .outcomes
            .iter()
            .map(|outcome| {
                SyntheticOrderBook::new(
                    &subscription.market_slug,
                    &subscription.market_id,
                    &outcome.outcome_name,
                    &outcome.asset_id,
                )
            })
            .collect();

        Self::new(&subscription.market_slug, &subscription.market_id, books)
    }

    /// Look up the book for an asset
    pub fn lookup(&self, asset_id: &str) -> Result<&SyntheticOrderBook, StoreError> {
        self.index
            .get(asset_id)
            .map(|&i| &self.books[i])
            .ok_or_else(|| self.unknown(asset_id))
    }

    fn lookup_mut(&mut self, asset_id: &str) -> Result<&mut SyntheticOrderBook, StoreError> {
        match self.index.get(asset_id) {
            Some(&i) => Ok(&mut self.books[i]),
            None => Err(self.unknown(asset_id)),
        }
    }

    fn unknown(&self, asset_id: &str) -> StoreError {
        StoreError::UnknownAsset {
            market_slug: self.market_slug.clone(),
            asset_id: asset_id.to_string(),
        }
    }

    /// Apply a batch of events in order.
    ///
    /// Every asset is resolved before any book is touched, so a batch that
    /// names an unknown asset fails without partially applying.
    pub fn apply_events(&mut self, events: &[MarketEvent]) -> Result<usize, StoreError> {
        for event in events {
            self.lookup(event.asset_id())?;
        }

        for event in events {
            let book = self.lookup_mut(event.asset_id())?;
            match event {
                MarketEvent::BookSnapshot { meta, asks, .. } => {
                    book.replace_all(asks, meta.timestamp);
                }
                MarketEvent::PriceDelta { meta, changes } => {
                    book.apply_delta(changes, meta.timestamp);
                }
            }

            tracing::trace!(
                market = %self.market_slug,
                asset_id = %event.asset_id(),
                kind = event.kind(),
                "Applied market event"
            );
        }

        Ok(events.len())
    }

    /// Books as (A, B) in registration order
    pub fn pair(&self) -> (&SyntheticOrderBook, &SyntheticOrderBook) {
        (&self.books[0], &self.books[1])
    }

    pub fn books(&self) -> &[SyntheticOrderBook] {
        &self.books
    }

    pub fn asset_ids(&self) -> Vec<String> {
        self.books.iter().map(|b| b.asset_id.clone()).collect()
    }

    pub fn contains(&self, asset_id: &str) -> bool {
        self.index.contains_key(asset_id)
    }

    pub fn market_slug(&self) -> &str {
        &self.market_slug
    }

    pub fn market_id(&self) -> &str {
        &self.market_id
    }
}
