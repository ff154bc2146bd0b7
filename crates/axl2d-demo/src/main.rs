use std::io::Cursor;
use std::thread::JoinHandle;
use std::time::Duration;

use anyhow::Context;
use axl2d_engine::logging::{init_logging, LoggingConfig};
use axl2d_engine::{
    Color, Drawable, Host, HostConfig, QuadDesc, RenderError, Scene, SceneCtx, SpriteManager,
    Viewport,
};

/// Seconds each scene stays up before handing over to the other one.
const SWITCH_AFTER: f64 = 5.0;

const FEED_SIZE: u32 = 128;

/// Spinning solid quads around a generated checkerboard sprite.
#[derive(Default)]
struct Spinner {
    quads: Vec<Drawable>,
    sprites: Option<SpriteManager>,
    elapsed: f64,
}

impl Scene for Spinner {
    fn load(&mut self, ctx: &mut SceneCtx) -> anyhow::Result<()> {
        ctx.set_title("axl2d demo: spinner");
        ctx.set_clear_color(Color::CYAN);

        let colors = [Color::RED, Color::GREEN, Color::BLUE, Color::ORANGE];
        for (i, color) in colors.into_iter().enumerate() {
            let x = 40.0 + i as f32 * 110.0;
            let desc = QuadDesc::new((x, 40.0), (80.0, 80.0))
                .with_rotation(i as f32 * 0.4)
                .with_tint(color.with_alpha(0.8));
            self.quads.push(Drawable::solid(ctx.render(), desc));
        }

        let mut sprites = SpriteManager::new(ctx.render());
        let center = centered(ctx.viewport(), 160.0);
        sprites.load_sprite(
            "checker",
            checker_png(8, 16)?,
            QuadDesc::new(center, (160.0, 160.0)),
        )?;
        self.sprites = Some(sprites);

        log::info!("spinner loaded {} quads", self.quads.len());
        Ok(())
    }

    fn update(&mut self, ctx: &mut SceneCtx, dt: f64) {
        for (i, quad) in self.quads.iter_mut().enumerate() {
            let dir = if i % 2 == 0 { 1.0 } else { -1.0 };
            quad.rotate_by(dir * dt as f32 * 1.5);
        }

        self.elapsed += dt;
        if self.elapsed >= SWITCH_AFTER {
            ctx.change_scene::<Plasma>();
        }
    }

    fn draw(&mut self, _ctx: &mut SceneCtx, _dt: f64, _fps: f64) -> Result<(), RenderError> {
        if let Some(sprites) = &mut self.sprites {
            sprites.sprite_mut("checker")?.draw()?;
        }
        for quad in &mut self.quads {
            quad.draw()?;
        }
        Ok(())
    }

    fn resize(&mut self, _ctx: &mut SceneCtx, viewport: Viewport) {
        if let Some(checker) = self.sprites.as_mut().and_then(|s| s.sprite_mut("checker").ok()) {
            checker.set_position(centered(viewport, 160.0));
        }
    }
}

/// Full-window view of a BGRA plasma rendered on a producer thread.
#[derive(Default)]
struct Plasma {
    view: Option<Drawable>,
    producer: Option<JoinHandle<()>>,
    elapsed: f64,
}

impl Scene for Plasma {
    fn load(&mut self, ctx: &mut SceneCtx) -> anyhow::Result<()> {
        ctx.set_title("axl2d demo: plasma");
        ctx.set_clear_color(Color::BLACK);

        let vp = ctx.viewport();
        let mut view = Drawable::dynamic(
            ctx.render(),
            QuadDesc::new((0.0, 0.0), (vp.width, vp.height)),
        );
        let feed = view.enable_feed()?;

        let producer = std::thread::Builder::new()
            .name("plasma".into())
            .spawn(move || {
                let mut frame = vec![0u8; (FEED_SIZE * FEED_SIZE * 4) as usize];
                let mut t = 0.0f32;
                loop {
                    fill_plasma(&mut frame, FEED_SIZE, t);
                    // Pushing fails once the drawable is disposed.
                    if feed.push(FEED_SIZE, FEED_SIZE, &frame).is_err() {
                        break;
                    }
                    t += 0.05;
                    std::thread::sleep(Duration::from_millis(16));
                }
                log::debug!("plasma producer finished");
            })
            .context("failed to spawn plasma producer")?;

        self.view = Some(view);
        self.producer = Some(producer);
        Ok(())
    }

    fn update(&mut self, ctx: &mut SceneCtx, dt: f64) {
        self.elapsed += dt;
        if self.elapsed >= SWITCH_AFTER {
            ctx.change_scene::<Spinner>();
        }
    }

    fn draw(&mut self, _ctx: &mut SceneCtx, _dt: f64, _fps: f64) -> Result<(), RenderError> {
        match &mut self.view {
            Some(view) => view.draw(),
            None => Ok(()),
        }
    }

    fn resize(&mut self, _ctx: &mut SceneCtx, viewport: Viewport) {
        if let Some(view) = &mut self.view {
            view.set_size((viewport.width, viewport.height));
        }
    }

    fn unload(&mut self, _ctx: &mut SceneCtx) -> anyhow::Result<()> {
        // Disposing closes the feed, which ends the producer loop.
        self.view = None;
        if let Some(producer) = self.producer.take() {
            producer
                .join()
                .map_err(|_| anyhow::anyhow!("plasma producer panicked"))?;
        }
        Ok(())
    }
}

fn centered(viewport: Viewport, side: f32) -> (f32, f32) {
    ((viewport.width - side) / 2.0, (viewport.height - side) / 2.0)
}

/// Encodes a two-tone checkerboard as PNG, the way a sprite would ship.
fn checker_png(cells: u32, cell_px: u32) -> anyhow::Result<Vec<u8>> {
    let side = cells * cell_px;
    let img = image::RgbaImage::from_fn(side, side, |x, y| {
        if (x / cell_px + y / cell_px) % 2 == 0 {
            image::Rgba([255, 255, 255, 255])
        } else {
            image::Rgba([40, 40, 60, 255])
        }
    });

    let mut png = Cursor::new(Vec::new());
    img.write_to(&mut png, image::ImageFormat::Png)
        .context("failed to encode checker sprite")?;
    Ok(png.into_inner())
}

fn fill_plasma(frame: &mut [u8], side: u32, t: f32) {
    for (i, px) in frame.chunks_exact_mut(4).enumerate() {
        let x = (i as u32 % side) as f32 / side as f32;
        let y = (i as u32 / side) as f32 / side as f32;
        let v = (x * 10.0 + t).sin() + (y * 8.0 - t).sin() + ((x + y) * 6.0 + t * 0.5).sin();
        let r = ((v * 1.1).sin() * 127.0 + 128.0) as u8;
        let g = ((v * 1.3 + 2.0).sin() * 127.0 + 128.0) as u8;
        let b = ((v * 1.7 + 4.0).sin() * 127.0 + 128.0) as u8;
        px.copy_from_slice(&[b, g, r, 255]);
    }
}

fn main() -> anyhow::Result<()> {
    init_logging(LoggingConfig::default());

    let mut host = Host::new(HostConfig {
        title: "axl2d demo".to_string(),
        ..Default::default()
    })?;
    host.register_default::<Spinner>()?.register::<Plasma>()?;

    host.run()
}
