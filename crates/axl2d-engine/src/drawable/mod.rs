//! Drawable primitives.
//!
//! One [`Drawable`] type with three texture sources:
//! - solid: tint only
//! - static: a sprite decoded once, lazily, from encoded image bytes
//! - dynamic: BGRA8 frames pushed from any thread through a [`PixelFeed`]

mod content;
mod decode;
#[allow(clippy::module_inception)]
mod drawable;
mod feed;
mod sprites;

pub use decode::{DecodeError, DecodedImage, EncodedImage, ImageCrateDecoder, ImageDecoder};
pub use drawable::{Drawable, DrawableKind, QuadDesc};
pub use feed::PixelFeed;
pub use sprites::SpriteManager;
