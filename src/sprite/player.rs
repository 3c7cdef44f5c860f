//! Streaming sink protocol for bulk ingestion
//!
//! Backends walk their data in fixed-size pages and push one [`Sprite`] per
//! row or element into a [`SpritePlayer`]. A backend opens a sub-stream per
//! class, table or edge label with `begin()` and closes it with `end()`, so a
//! player sees several `begin`/`end` pairs during one `provide_to` call and
//! must cope with that.

use super::record::Sprite;
use crate::error::{Error, Result};
use std::io::Write;

/// Sink for sprites produced by a backend
pub trait SpritePlayer: Send {
    /// Called before the first sprite of a sub-stream
    fn begin(&mut self) -> Result<()> {
        Ok(())
    }

    /// Gate checked before every `play`
    fn accept(&self, _sprite: &Sprite) -> bool {
        true
    }

    /// Consume one sprite
    fn play(&mut self, sprite: Sprite) -> Result<()>;

    /// Called after the last sprite of a sub-stream; may run many times
    fn end(&mut self) -> Result<()> {
        Ok(())
    }

    /// Number of sprites played so far
    fn processed(&self) -> u64;
}

/// Offer a sprite to the player, playing it if accepted.
///
/// Returns whether the sprite was played.
pub fn offer(player: &mut dyn SpritePlayer, sprite: Sprite) -> Result<bool> {
    if player.accept(&sprite) {
        player.play(sprite)?;
        Ok(true)
    } else {
        Ok(false)
    }
}

/// Run one complete sub-stream through a player
pub fn play_batch<I>(player: &mut dyn SpritePlayer, sprites: I) -> Result<u64>
where
    I: IntoIterator<Item = Sprite>,
{
    player.begin()?;
    let mut played = 0;
    for sprite in sprites {
        if offer(player, sprite)? {
            played += 1;
        }
    }
    player.end()?;
    Ok(played)
}

// ============================================================================
// Collecting Player
// ============================================================================

/// Keeps every sprite in memory
#[derive(Debug, Default)]
pub struct CollectingPlayer {
    sprites: Vec<Sprite>,
    begins: usize,
    ends: usize,
}

impl CollectingPlayer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sprites(&self) -> &[Sprite] {
        &self.sprites
    }

    pub fn into_sprites(self) -> Vec<Sprite> {
        self.sprites
    }

    /// Number of sub-streams started
    pub fn begins(&self) -> usize {
        self.begins
    }

    /// Number of sub-streams finished
    pub fn ends(&self) -> usize {
        self.ends
    }
}

impl SpritePlayer for CollectingPlayer {
    fn begin(&mut self) -> Result<()> {
        self.begins += 1;
        Ok(())
    }

    fn play(&mut self, sprite: Sprite) -> Result<()> {
        self.sprites.push(sprite);
        Ok(())
    }

    fn end(&mut self) -> Result<()> {
        self.ends += 1;
        Ok(())
    }

    fn processed(&self) -> u64 {
        self.sprites.len() as u64
    }
}

// ============================================================================
// Tracing Player
// ============================================================================

/// Logs each sprite at debug level
#[derive(Debug)]
pub struct TracingPlayer {
    name: String,
    processed: u64,
}

impl TracingPlayer {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            processed: 0,
        }
    }
}

impl SpritePlayer for TracingPlayer {
    fn begin(&mut self) -> Result<()> {
        tracing::debug!(player = %self.name, processed = self.processed, "sub-stream started");
        Ok(())
    }

    fn play(&mut self, sprite: Sprite) -> Result<()> {
        self.processed += 1;
        tracing::debug!(player = %self.name, n = self.processed, %sprite, "sprite");
        Ok(())
    }

    fn end(&mut self) -> Result<()> {
        tracing::info!(player = %self.name, processed = self.processed, "sub-stream finished");
        Ok(())
    }

    fn processed(&self) -> u64 {
        self.processed
    }
}

// ============================================================================
// Filtering Player
// ============================================================================

/// Wraps a player with an extra acceptance predicate
pub struct FilteringPlayer<P, F> {
    inner: P,
    predicate: F,
}

impl<P, F> FilteringPlayer<P, F>
where
    P: SpritePlayer,
    F: Fn(&Sprite) -> bool + Send,
{
    pub fn new(inner: P, predicate: F) -> Self {
        Self { inner, predicate }
    }

    pub fn into_inner(self) -> P {
        self.inner
    }
}

impl<P, F> SpritePlayer for FilteringPlayer<P, F>
where
    P: SpritePlayer,
    F: Fn(&Sprite) -> bool + Send,
{
    fn begin(&mut self) -> Result<()> {
        self.inner.begin()
    }

    fn accept(&self, sprite: &Sprite) -> bool {
        (self.predicate)(sprite) && self.inner.accept(sprite)
    }

    fn play(&mut self, sprite: Sprite) -> Result<()> {
        self.inner.play(sprite)
    }

    fn end(&mut self) -> Result<()> {
        self.inner.end()
    }

    fn processed(&self) -> u64 {
        self.inner.processed()
    }
}

// ============================================================================
// JSON Lines Player
// ============================================================================

/// Writes one JSON object per sprite
pub struct JsonLinesPlayer<W> {
    writer: W,
    processed: u64,
}

impl<W: Write + Send> JsonLinesPlayer<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            processed: 0,
        }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write + Send> SpritePlayer for JsonLinesPlayer<W> {
    fn play(&mut self, sprite: Sprite) -> Result<()> {
        serde_json::to_writer(&mut self.writer, &sprite)?;
        self.writer.write_all(b"\n").map_err(Error::Io)?;
        self.processed += 1;
        Ok(())
    }

    // flushing twice is harmless, so repeated sub-stream ends are fine
    fn end(&mut self) -> Result<()> {
        self.writer.flush().map_err(Error::Io)
    }

    fn processed(&self) -> u64 {
        self.processed
    }
}
