use crate::error::RenderError;
use crate::render::{GpuBackend, PixelFormat, TextureDesc, TextureHandle, TextureOptions};

use super::decode::EncodedImage;
use super::feed::PixelFeed;

/// Which texture, if any, a draw samples.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub(crate) enum TextureBinding {
    /// Tint only.
    None,
    Texture(TextureHandle),
    /// Nothing to show yet; the draw is skipped.
    Pending,
}

enum StaticState {
    Pending,
    Ready(TextureHandle),
    Failed,
}

/// Sprite pixels: decoded and uploaded once, on first draw.
pub(crate) struct StaticTexture {
    image: EncodedImage,
    state: StaticState,
}

impl StaticTexture {
    fn binding(
        &mut self,
        gpu: &mut dyn GpuBackend,
        options: TextureOptions,
    ) -> Result<TextureBinding, RenderError> {
        match self.state {
            StaticState::Ready(handle) => return Ok(TextureBinding::Texture(handle)),
            StaticState::Failed => {
                return Err(RenderError::Unusable {
                    key: self.image.key.clone(),
                });
            }
            StaticState::Pending => {}
        }

        let decoded = match self.image.decoder.decode(&self.image.bytes) {
            Ok(decoded) => decoded,
            Err(source) => {
                log::error!("sprite `{}` could not be decoded: {source}", self.image.key);
                self.state = StaticState::Failed;
                return Err(RenderError::Decode {
                    key: self.image.key.clone(),
                    source,
                });
            }
        };

        let handle = gpu.create_texture(&TextureDesc {
            width: decoded.width,
            height: decoded.height,
            format: PixelFormat::Rgba8,
            options,
        });
        if let Err(e) = gpu.upload_texture(handle, decoded.width, decoded.height, &decoded.rgba) {
            gpu.delete_texture(handle);
            self.state = StaticState::Failed;
            return Err(e);
        }

        log::debug!(
            "sprite `{}` uploaded ({}x{})",
            self.image.key,
            decoded.width,
            decoded.height
        );
        self.state = StaticState::Ready(handle);
        Ok(TextureBinding::Texture(handle))
    }
}

/// Externally fed pixels, re-uploaded whenever the producer pushed a frame.
#[derive(Default)]
pub(crate) struct DynamicTexture {
    feed: Option<PixelFeed>,
    texture: Option<TextureHandle>,
}

impl DynamicTexture {
    fn binding(
        &mut self,
        gpu: &mut dyn GpuBackend,
        options: TextureOptions,
    ) -> Result<TextureBinding, RenderError> {
        if let Some(feed) = &self.feed {
            let texture = &mut self.texture;
            feed.consume(|width, height, pixels| {
                let handle = *texture.get_or_insert_with(|| {
                    gpu.create_texture(&TextureDesc {
                        width,
                        height,
                        format: PixelFormat::Bgra8,
                        options,
                    })
                });
                gpu.upload_texture(handle, width, height, pixels)
            })
            .transpose()?;
        }

        Ok(match self.texture {
            Some(handle) => TextureBinding::Texture(handle),
            None => TextureBinding::Pending,
        })
    }
}

/// Tagged texture source of a drawable.
pub(crate) enum Content {
    Solid,
    Static(StaticTexture),
    Dynamic(DynamicTexture),
}

impl Content {
    pub(crate) fn sprite(image: EncodedImage) -> Self {
        Content::Static(StaticTexture {
            image,
            state: StaticState::Pending,
        })
    }

    pub(crate) fn dynamic() -> Self {
        Content::Dynamic(DynamicTexture::default())
    }

    /// Brings the texture up to date and returns what the draw should sample.
    pub(crate) fn binding(
        &mut self,
        gpu: &mut dyn GpuBackend,
        options: TextureOptions,
    ) -> Result<TextureBinding, RenderError> {
        match self {
            Content::Solid => Ok(TextureBinding::None),
            Content::Static(s) => s.binding(gpu, options),
            Content::Dynamic(d) => d.binding(gpu, options),
        }
    }

    pub(crate) fn sprite_key(&self) -> Option<&str> {
        match self {
            Content::Static(s) => Some(&s.image.key),
            _ => None,
        }
    }

    /// `true` once the sprite is uploaded or a dynamic frame has arrived.
    pub(crate) fn texture_ready(&self) -> bool {
        match self {
            Content::Solid => false,
            Content::Static(s) => matches!(s.state, StaticState::Ready(_)),
            Content::Dynamic(d) => d.texture.is_some(),
        }
    }

    /// Creates the producer handle of a dynamic texture. Only once.
    pub(crate) fn enable_feed(&mut self) -> Result<PixelFeed, RenderError> {
        match self {
            Content::Dynamic(d) if d.feed.is_some() => Err(RenderError::SourceAlreadyActive),
            Content::Dynamic(d) => Ok(d.feed.insert(PixelFeed::new()).clone()),
            _ => Err(RenderError::NotDynamic),
        }
    }

    /// Detaches the texture for deletion and closes any feed.
    pub(crate) fn release(&mut self) -> Option<TextureHandle> {
        match self {
            Content::Solid => None,
            Content::Static(s) => match std::mem::replace(&mut s.state, StaticState::Failed) {
                StaticState::Ready(handle) => Some(handle),
                _ => None,
            },
            Content::Dynamic(d) => {
                if let Some(feed) = &d.feed {
                    feed.close();
                }
                d.texture.take()
            }
        }
    }
}
