use super::json_store::{JsonStore, Storable};
use super::traits::GameStore;
use super::StoreError;
use crate::model::Game;
use std::path::PathBuf;

impl Storable for Game {
    fn id(&self) -> &str {
        &self.uuid
    }
}

/// Games kept as JSON files under `<data_dir>/games`.
pub struct JsonGameStore {
    inner: JsonStore<Game>,
}

impl JsonGameStore {
    pub fn new(data_dir: PathBuf) -> Self {
        Self {
            inner: JsonStore::new(data_dir.join("games")),
        }
    }

    fn sorted(mut games: Vec<Game>) -> Vec<Game> {
        games.sort_by(|a, b| b.end_time.cmp(&a.end_time).then_with(|| a.uuid.cmp(&b.uuid)));
        games
    }
}

impl GameStore for JsonGameStore {
    async fn get(&self, id: &str) -> Result<Option<Game>, StoreError> {
        self.inner.load(id)
    }

    async fn put(&self, game: &Game) -> Result<(), StoreError> {
        self.inner.save(game)?;
        tracing::debug!(uuid = %game.uuid, "Stored game");
        Ok(())
    }

    async fn list(&self) -> Result<Vec<Game>, StoreError> {
        let games = Self::sorted(self.inner.load_all()?);
        tracing::debug!(dir = %self.inner.dir().display(), count = games.len(), "Listed games");
        Ok(games)
    }

    async fn delete(&self, id: &str) -> Result<(), StoreError> {
        self.inner.delete(id)
    }

    async fn set_starred(&self, id: &str, starred: bool) -> Result<(), StoreError> {
        let mut game = self
            .inner
            .load(id)?
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        if game.starred != starred {
            game.starred = starred;
            self.inner.save(&game)?;
        }
        Ok(())
    }

    async fn starred(&self) -> Result<Vec<Game>, StoreError> {
        let games = self.inner.load_all()?.into_iter().filter(|g| g.starred).collect();
        Ok(Self::sorted(games))
    }
}
