//! Sprites and players
//!
//! - [`Sprite`] - ordered multi-valued record with fluent reshaping operations
//! - [`SpritePlayer`] - push-based sink backends feed during bulk indexing

mod player;
mod record;

pub use player::{
    offer, play_batch, CollectingPlayer, FilteringPlayer, JsonLinesPlayer, SpritePlayer,
    TracingPlayer,
};
pub use record::{JoinOptions, Sprite};

#[cfg(test)]
mod tests;
