//! Game records, their local store and the chess.com archive client.

pub mod model;
pub mod persistence;
pub mod remote;

pub use model::{Accuracies, Game, Player};
pub use persistence::{GameStore, JsonGameStore, StoreError};
pub use remote::{ChessComClient, FetchError, RemoteGameSource};
