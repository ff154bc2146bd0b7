use std::collections::HashMap;
use std::rc::Rc;
use std::sync::Arc;

use crate::error::RenderError;
use crate::render::RenderContext;

use super::decode::{EncodedImage, ImageCrateDecoder, ImageDecoder};
use super::drawable::{Drawable, QuadDesc};

/// Sprites stored by key.
///
/// Loading requires a live GPU context; the image itself is decoded on the
/// sprite's first draw.
pub struct SpriteManager {
    ctx: RenderContext,
    decoder: Rc<dyn ImageDecoder>,
    sprites: HashMap<String, Drawable>,
}

impl SpriteManager {
    pub fn new(ctx: &RenderContext) -> Self {
        Self::with_decoder(ctx, Rc::new(ImageCrateDecoder))
    }

    pub fn with_decoder(ctx: &RenderContext, decoder: Rc<dyn ImageDecoder>) -> Self {
        Self {
            ctx: ctx.clone(),
            decoder,
            sprites: HashMap::new(),
        }
    }

    /// Registers a sprite under `key`.
    ///
    /// Fails with [`RenderError::ContextUnavailable`] before the GPU context
    /// exists and with [`RenderError::DuplicateKey`] if `key` is taken.
    pub fn load_sprite(
        &mut self,
        key: impl Into<String>,
        bytes: impl Into<Arc<[u8]>>,
        desc: QuadDesc,
    ) -> Result<&mut Drawable, RenderError> {
        if !self.ctx.is_ready() {
            return Err(RenderError::ContextUnavailable);
        }

        let key = key.into();
        if self.sprites.contains_key(&key) {
            return Err(RenderError::DuplicateKey(key));
        }

        let image = EncodedImage::with_decoder(key.clone(), bytes, Rc::clone(&self.decoder));
        log::debug!("sprite `{key}` registered ({} bytes)", image.bytes.len());

        let sprite = Drawable::sprite(&self.ctx, desc, image);
        Ok(self.sprites.entry(key).or_insert(sprite))
    }

    pub fn sprite(&self, key: &str) -> Result<&Drawable, RenderError> {
        self.sprites
            .get(key)
            .ok_or_else(|| RenderError::UnknownSprite(key.to_string()))
    }

    pub fn sprite_mut(&mut self, key: &str) -> Result<&mut Drawable, RenderError> {
        self.sprites
            .get_mut(key)
            .ok_or_else(|| RenderError::UnknownSprite(key.to_string()))
    }

    /// Removes and returns the sprite; dropping it releases its GPU handles.
    pub fn remove(&mut self, key: &str) -> Option<Drawable> {
        self.sprites.remove(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.sprites.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.sprites.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.sprites.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sprites.is_empty()
    }
}
