use std::cell::RefCell;
use std::rc::Rc;

use crate::broadcast::Subscription;
use crate::coords::{Rect, Vec2};
use crate::error::RenderError;
use crate::paint::Color;
use crate::render::{GeometryHandle, GpuBackend, RenderContext, TextureOptions};
use crate::transform::{QuadVertex, Transform2D};

use super::content::{Content, TextureBinding};
use super::decode::EncodedImage;
use super::feed::PixelFeed;

/// Initial transform, tint and sampling of a drawable.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct QuadDesc {
    pub position: Vec2,
    pub size: Vec2,
    /// Radians.
    pub rotation: f32,
    pub tint: Color,
    pub options: TextureOptions,
}

impl QuadDesc {
    pub fn new(position: impl Into<Vec2>, size: impl Into<Vec2>) -> Self {
        Self {
            position: position.into(),
            size: size.into(),
            ..Default::default()
        }
    }

    pub fn with_rotation(mut self, rotation: f32) -> Self {
        self.rotation = rotation;
        self
    }

    pub fn with_tint(mut self, tint: Color) -> Self {
        self.tint = tint;
        self
    }

    pub fn with_options(mut self, options: TextureOptions) -> Self {
        self.options = options;
        self
    }
}

impl Default for QuadDesc {
    fn default() -> Self {
        Self {
            position: Vec2::zero(),
            size: Vec2::zero(),
            rotation: 0.0,
            tint: Color::WHITE,
            options: TextureOptions::default(),
        }
    }
}

/// Texture source of a drawable.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum DrawableKind {
    /// Flat tinted quad.
    Solid,
    /// Sprite decoded from encoded image bytes.
    Static,
    /// Pixels pushed through a [`PixelFeed`].
    Dynamic,
}

/// A quad on screen: transform, texture source and the GPU handles it owns.
///
/// GPU resources are created lazily on the first draw and released by
/// [`Drawable::dispose`], which also runs on drop. The transform follows
/// viewport changes for as long as the drawable is alive.
pub struct Drawable {
    ctx: RenderContext,
    transform: Rc<RefCell<Transform2D>>,
    subscription: Option<Subscription>,

    geometry: Option<GeometryHandle>,
    /// Recompute count of the geometry last uploaded.
    uploaded: Option<u64>,

    content: Content,
    tint: Color,
    options: TextureOptions,
    disposed: bool,
}

impl Drawable {
    /// Tinted quad without a texture.
    pub fn solid(ctx: &RenderContext, desc: QuadDesc) -> Self {
        Self::with_content(ctx, desc, Content::Solid)
    }

    /// Sprite from encoded image bytes. Decoding is deferred to the first draw.
    pub fn sprite(ctx: &RenderContext, desc: QuadDesc, image: EncodedImage) -> Self {
        Self::with_content(ctx, desc, Content::sprite(image))
    }

    /// Quad showing externally produced BGRA8 frames; see [`Drawable::enable_feed`].
    pub fn dynamic(ctx: &RenderContext, desc: QuadDesc) -> Self {
        Self::with_content(ctx, desc, Content::dynamic())
    }

    fn with_content(ctx: &RenderContext, desc: QuadDesc, content: Content) -> Self {
        let transform = Rc::new(RefCell::new(Transform2D::new(
            desc.position,
            desc.size,
            desc.rotation,
            ctx.viewport(),
        )));
        let subscription = ctx.tracker().subscribe(&transform);

        Self {
            ctx: ctx.clone(),
            transform,
            subscription: Some(subscription),
            geometry: None,
            uploaded: None,
            content,
            tint: desc.tint,
            options: desc.options,
            disposed: false,
        }
    }

    /// Draws with the current transform.
    ///
    /// Skipped while the viewport is zero-area. A sprite that fails to decode
    /// returns [`RenderError::Decode`] once and [`RenderError::Unusable`] on
    /// every later draw.
    pub fn draw(&mut self) -> Result<(), RenderError> {
        if self.disposed {
            return Err(RenderError::Disposed);
        }
        if !self.transform.borrow().viewport().is_valid() {
            return Ok(());
        }

        let ctx = self.ctx.clone();
        ctx.with_gpu(|gpu| self.draw_with(gpu))?
    }

    /// Moves to `position`, then draws.
    pub fn draw_at(&mut self, position: impl Into<Vec2>) -> Result<(), RenderError> {
        self.set_position(position);
        self.draw()
    }

    /// Moves and resizes to `bounds` (one recompute), then draws.
    pub fn draw_with_bounds(&mut self, bounds: Rect) -> Result<(), RenderError> {
        self.set_bounds(bounds);
        self.draw()
    }

    fn draw_with(&mut self, gpu: &mut dyn GpuBackend) -> Result<(), RenderError> {
        let geometry = *self.geometry.get_or_insert_with(|| gpu.create_geometry());

        {
            let transform = self.transform.borrow();
            let revision = transform.recompute_count();
            if self.uploaded != Some(revision) {
                gpu.upload_geometry(geometry, transform.vertices())?;
                self.uploaded = Some(revision);
            }
        }

        match self.content.binding(gpu, self.options)? {
            TextureBinding::None => gpu.draw_quad(geometry, None, self.tint),
            TextureBinding::Texture(texture) => gpu.draw_quad(geometry, Some(texture), self.tint),
            TextureBinding::Pending => Ok(()),
        }
    }

    /// Returns the producer handle of a dynamic drawable.
    ///
    /// Only one source may be active: a second call fails with
    /// [`RenderError::SourceAlreadyActive`].
    pub fn enable_feed(&mut self) -> Result<PixelFeed, RenderError> {
        if self.disposed {
            return Err(RenderError::Disposed);
        }
        self.content.enable_feed()
    }

    /// Releases GPU handles and the viewport subscription. Idempotent.
    pub fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        self.disposed = true;

        if let Some(mut subscription) = self.subscription.take() {
            subscription.cancel();
        }

        let geometry = self.geometry.take();
        let texture = self.content.release();
        if geometry.is_none() && texture.is_none() {
            return;
        }

        let released = self.ctx.with_gpu(|gpu| {
            if let Some(g) = geometry {
                gpu.delete_geometry(g);
            }
            if let Some(t) = texture {
                gpu.delete_texture(t);
            }
        });
        if let Err(e) = released {
            log::debug!("drawable disposed without releasing GPU handles: {e}");
        }
    }

    #[inline]
    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    #[inline]
    pub fn kind(&self) -> DrawableKind {
        match self.content {
            Content::Solid => DrawableKind::Solid,
            Content::Static(_) => DrawableKind::Static,
            Content::Dynamic(_) => DrawableKind::Dynamic,
        }
    }

    /// Sprite key of a static drawable.
    pub fn sprite_key(&self) -> Option<&str> {
        self.content.sprite_key()
    }

    /// Whether texture content has reached the GPU.
    pub fn texture_ready(&self) -> bool {
        self.content.texture_ready()
    }

    pub fn position(&self) -> Vec2 {
        self.transform.borrow().position()
    }

    pub fn set_position(&mut self, position: impl Into<Vec2>) {
        self.transform.borrow_mut().set_position(position.into());
    }

    pub fn size(&self) -> Vec2 {
        self.transform.borrow().size()
    }

    pub fn set_size(&mut self, size: impl Into<Vec2>) {
        self.transform.borrow_mut().set_size(size.into());
    }

    /// Radians.
    pub fn rotation(&self) -> f32 {
        self.transform.borrow().rotation()
    }

    pub fn set_rotation(&mut self, rotation: f32) {
        self.transform.borrow_mut().set_rotation(rotation);
    }

    pub fn rotate_by(&mut self, delta: f32) {
        self.transform.borrow_mut().rotate_by(delta);
    }

    pub fn bounds(&self) -> Rect {
        self.transform.borrow().bounds()
    }

    pub fn set_bounds(&mut self, bounds: Rect) {
        self.transform.borrow_mut().set_bounds(bounds);
    }

    pub fn tint(&self) -> Color {
        self.tint
    }

    pub fn set_tint(&mut self, tint: Color) {
        self.tint = tint;
    }

    pub fn texture_options(&self) -> TextureOptions {
        self.options
    }

    /// Current NDC geometry.
    pub fn vertices(&self) -> [QuadVertex; 4] {
        *self.transform.borrow().vertices()
    }

    /// Current geometry as `4 × {x, y, z, u, v}`.
    pub fn flattened(&self) -> [f32; 20] {
        self.transform.borrow().flattened()
    }

    pub fn recompute_count(&self) -> u64 {
        self.transform.borrow().recompute_count()
    }
}

impl Drop for Drawable {
    fn drop(&mut self) {
        self.dispose();
    }
}

impl std::fmt::Debug for Drawable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Drawable")
            .field("kind", &self.kind())
            .field("bounds", &self.bounds())
            .field("rotation", &self.rotation())
            .field("disposed", &self.disposed)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use std::f32::consts::FRAC_PI_2;

    use super::*;
    use crate::coords::Viewport;
    use crate::drawable::decode::{DecodeError, DecodedImage, ImageDecoder};
    use crate::render::recording::{CallLog, GpuCall, RecordingBackend};

    struct CountingDecoder {
        calls: Cell<usize>,
        fail: bool,
    }

    impl CountingDecoder {
        fn new(fail: bool) -> Rc<Self> {
            Rc::new(Self {
                calls: Cell::new(0),
                fail,
            })
        }
    }

    impl ImageDecoder for CountingDecoder {
        fn decode(&self, _bytes: &[u8]) -> Result<DecodedImage, DecodeError> {
            self.calls.set(self.calls.get() + 1);
            if self.fail {
                return Err(DecodeError::ZeroSize);
            }
            Ok(DecodedImage {
                width: 2,
                height: 2,
                rgba: vec![255; 16],
            })
        }
    }

    fn ready_ctx() -> (RenderContext, CallLog) {
        let ctx = RenderContext::new(Viewport::new(200.0, 200.0));
        let (backend, log) = RecordingBackend::new();
        ctx.install(Box::new(backend));
        ctx.with_gpu(|gpu| gpu.begin_frame()).unwrap().unwrap();
        (ctx, log)
    }

    fn desc() -> QuadDesc {
        QuadDesc::new((0.0, 0.0), (100.0, 100.0))
    }

    #[test]
    fn draw_before_context_fails() {
        let ctx = RenderContext::new(Viewport::new(200.0, 200.0));
        let mut quad = Drawable::solid(&ctx, desc());
        assert!(matches!(quad.draw(), Err(RenderError::ContextUnavailable)));
    }

    #[test]
    fn solid_draw_uploads_current_geometry() {
        let (ctx, log) = ready_ctx();
        let mut quad = Drawable::solid(&ctx, desc().with_tint(Color::RED));
        quad.draw().unwrap();

        let calls = log.calls();
        let Some(GpuCall::UploadGeometry(_, vertices)) = calls.get(2) else {
            panic!("unexpected calls: {calls:?}");
        };
        assert_eq!(*vertices, quad.vertices());
        assert!(matches!(
            calls.last(),
            Some(GpuCall::DrawQuad { texture: None, tint, .. }) if *tint == Color::RED
        ));
    }

    #[test]
    fn geometry_reuploaded_only_after_change() {
        let (ctx, log) = ready_ctx();
        let mut quad = Drawable::solid(&ctx, desc());
        quad.draw().unwrap();
        quad.draw().unwrap();
        assert_eq!(log.count(|c| matches!(c, GpuCall::UploadGeometry(..))), 1);

        quad.draw_at((50.0, 50.0)).unwrap();
        assert_eq!(log.count(|c| matches!(c, GpuCall::UploadGeometry(..))), 2);
        assert_eq!(quad.position(), Vec2::new(50.0, 50.0));
    }

    #[test]
    fn draw_with_bounds_recomputes_once() {
        let (ctx, _log) = ready_ctx();
        let mut quad = Drawable::solid(&ctx, desc());
        let before = quad.recompute_count();
        quad.draw_with_bounds(Rect::new(10.0, 10.0, 20.0, 20.0)).unwrap();
        assert_eq!(quad.recompute_count(), before + 1);
    }

    #[test]
    fn sprite_decodes_once_over_many_draws() {
        let (ctx, log) = ready_ctx();
        let decoder = CountingDecoder::new(false);
        let image = EncodedImage::with_decoder("hero", vec![1, 2, 3], decoder.clone());
        let mut sprite = Drawable::sprite(&ctx, desc(), image);
        assert!(!sprite.texture_ready());

        for _ in 0..1000 {
            sprite.draw().unwrap();
        }

        assert_eq!(decoder.calls.get(), 1);
        assert!(sprite.texture_ready());
        assert_eq!(log.count(|c| matches!(c, GpuCall::UploadTexture { .. })), 1);
        assert_eq!(log.count(|c| matches!(c, GpuCall::DrawQuad { texture: Some(_), .. })), 1000);
    }

    #[test]
    fn corrupt_sprite_fails_with_key_then_stays_unusable() {
        let (ctx, log) = ready_ctx();
        let decoder = CountingDecoder::new(true);
        let image = EncodedImage::with_decoder("broken", vec![0], decoder.clone());
        let mut sprite = Drawable::sprite(&ctx, desc(), image);

        match sprite.draw() {
            Err(RenderError::Decode { key, .. }) => assert_eq!(key, "broken"),
            other => panic!("unexpected result: {other:?}"),
        }
        assert!(matches!(sprite.draw(), Err(RenderError::Unusable { .. })));
        assert_eq!(decoder.calls.get(), 1);
        assert_eq!(log.count(|c| matches!(c, GpuCall::CreateTexture(..))), 0);
    }

    #[test]
    fn dynamic_uploads_only_when_dirty() {
        let (ctx, log) = ready_ctx();
        let mut view = Drawable::dynamic(&ctx, desc());
        let feed = view.enable_feed().unwrap();

        // Nothing pushed yet: no texture, no draw.
        view.draw().unwrap();
        assert_eq!(log.count(|c| matches!(c, GpuCall::DrawQuad { .. })), 0);

        feed.push(1, 1, &[1, 2, 3, 255]).unwrap();
        view.draw().unwrap();
        view.draw().unwrap();
        assert_eq!(log.count(|c| matches!(c, GpuCall::UploadTexture { .. })), 1);
        assert_eq!(log.count(|c| matches!(c, GpuCall::CreateTexture(..))), 1);

        feed.push(1, 1, &[4, 5, 6, 255]).unwrap();
        view.draw().unwrap();
        let uploads: Vec<_> = log
            .calls()
            .into_iter()
            .filter_map(|c| match c {
                GpuCall::UploadTexture { first_pixel, .. } => Some(first_pixel),
                _ => None,
            })
            .collect();
        assert_eq!(uploads, vec![[1, 2, 3, 255], [4, 5, 6, 255]]);
        assert_eq!(log.count(|c| matches!(c, GpuCall::DrawQuad { .. })), 3);
    }

    #[test]
    fn second_feed_is_rejected() {
        let (ctx, _log) = ready_ctx();
        let mut view = Drawable::dynamic(&ctx, desc());
        let _feed = view.enable_feed().unwrap();
        assert!(matches!(view.enable_feed(), Err(RenderError::SourceAlreadyActive)));

        let mut quad = Drawable::solid(&ctx, desc());
        assert!(matches!(quad.enable_feed(), Err(RenderError::NotDynamic)));
    }

    #[test]
    fn dispose_twice_releases_once() {
        let (ctx, log) = ready_ctx();
        let mut view = Drawable::dynamic(&ctx, desc());
        let feed = view.enable_feed().unwrap();
        feed.push(1, 1, &[0; 4]).unwrap();
        view.draw().unwrap();
        assert_eq!(ctx.tracker().listener_count(), 1);

        view.dispose();
        view.dispose();
        drop(view);

        assert_eq!(log.count(|c| matches!(c, GpuCall::DeleteGeometry(_))), 1);
        assert_eq!(log.count(|c| matches!(c, GpuCall::DeleteTexture(_))), 1);
        assert_eq!(ctx.tracker().listener_count(), 0);
        assert!(feed.is_closed());
    }

    #[test]
    fn draw_after_dispose_fails() {
        let (ctx, _log) = ready_ctx();
        let mut quad = Drawable::solid(&ctx, desc());
        quad.dispose();
        assert!(matches!(quad.draw(), Err(RenderError::Disposed)));
    }

    #[test]
    fn resize_broadcast_recomputes_geometry() {
        let (ctx, log) = ready_ctx();
        let mut quad = Drawable::solid(&ctx, desc());
        quad.draw().unwrap();

        assert_eq!(ctx.tracker().resize(Viewport::new(400.0, 400.0)), 1);
        assert_eq!(quad.vertices()[0].position, [-0.5, 0.5, 0.0]);

        quad.draw().unwrap();
        assert_eq!(log.count(|c| matches!(c, GpuCall::UploadGeometry(..))), 2);
    }

    #[test]
    fn zero_area_viewport_defers_drawing() {
        let ctx = RenderContext::new(Viewport::new(0.0, 0.0));
        let (backend, log) = RecordingBackend::new();
        ctx.install(Box::new(backend));
        ctx.with_gpu(|gpu| gpu.begin_frame()).unwrap().unwrap();

        let mut quad = Drawable::solid(&ctx, desc().with_rotation(FRAC_PI_2));
        quad.draw().unwrap();
        assert_eq!(log.count(|c| matches!(c, GpuCall::DrawQuad { .. })), 0);

        ctx.tracker().resize(Viewport::new(100.0, 100.0));
        quad.draw().unwrap();
        assert_eq!(log.count(|c| matches!(c, GpuCall::DrawQuad { .. })), 1);
    }
}
