//! Async repository trait for stored games.
//!
//! Methods return `impl Future + Send` so that callers can hold the store
//! inside spawned tasks.

use super::StoreError;
use crate::model::Game;
use std::future::Future;

pub trait GameStore: Send + Sync {
    fn get(&self, id: &str) -> impl Future<Output = Result<Option<Game>, StoreError>> + Send;

    /// Insert or replace a game, keyed by its uuid.
    fn put(&self, game: &Game) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// All games, most recently finished first.
    fn list(&self) -> impl Future<Output = Result<Vec<Game>, StoreError>> + Send;

    fn delete(&self, id: &str) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Fails with [`StoreError::NotFound`] for an unknown id.
    fn set_starred(
        &self,
        id: &str,
        starred: bool,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Starred games, most recently finished first.
    fn starred(&self) -> impl Future<Output = Result<Vec<Game>, StoreError>> + Send;
}
