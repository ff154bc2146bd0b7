use crate::coords::Viewport;
use crate::core::SceneCtx;
use crate::error::{LifecycleError, RenderError};

use super::{Scene, SceneId, SceneRegistry};

/// Where the lifecycle stands.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum SceneState {
    NoScene,
    Loading,
    Active,
    Unloading,
    Stopped,
}

struct ActiveScene {
    id: SceneId,
    scene: Box<dyn Scene>,
}

/// Keeps at most one scene active and routes frame hooks to it.
///
/// `NoScene → Loading → Active → Unloading → Loading → … → Stopped`.
/// Hooks of a scene are bound while it is held as current and unbound by
/// taking it out, before its `unload` runs.
pub struct SceneLifecycle {
    state: SceneState,
    current: Option<ActiveScene>,
}

impl SceneLifecycle {
    pub fn new() -> Self {
        Self {
            state: SceneState::NoScene,
            current: None,
        }
    }

    #[inline]
    pub fn state(&self) -> SceneState {
        self.state
    }

    /// Active scene, if any.
    pub fn current(&self) -> Option<SceneId> {
        self.current.as_ref().map(|c| c.id)
    }

    /// Replaces the current scene with a fresh instance of `target`.
    ///
    /// Legal from `Active` or `NoScene`. An unregistered target changes
    /// nothing. A failing `unload` stops the lifecycle; a failing `load`
    /// leaves it without a scene.
    pub fn change_scene(
        &mut self,
        registry: &SceneRegistry,
        target: SceneId,
        ctx: &mut SceneCtx,
    ) -> Result<(), LifecycleError> {
        match self.state {
            SceneState::Active | SceneState::NoScene => {}
            other => return Err(LifecycleError::IllegalTransition(other)),
        }

        let scene = registry.resolve(target)?;

        if let Some(mut old) = self.current.take() {
            self.state = SceneState::Unloading;
            log::info!("unloading scene `{}`", old.id);
            if let Err(e) = old.scene.unload(ctx) {
                self.state = SceneState::Stopped;
                return Err(LifecycleError::Unload {
                    scene: old.id.name(),
                    source: e.into(),
                });
            }
        }

        self.state = SceneState::Loading;
        log::info!("loading scene `{target}`");
        let mut next = ActiveScene { id: target, scene };
        if let Err(e) = next.scene.load(ctx) {
            self.state = SceneState::NoScene;
            return Err(LifecycleError::Load {
                scene: target.name(),
                source: e.into(),
            });
        }

        self.current = Some(next);
        self.state = SceneState::Active;
        Ok(())
    }

    /// Unbinds and unloads the current scene; the lifecycle ends `Stopped`.
    pub fn stop(&mut self, ctx: &mut SceneCtx) -> Result<(), LifecycleError> {
        if self.state == SceneState::Stopped {
            return Ok(());
        }

        let old = self.current.take();
        self.state = SceneState::Stopped;

        if let Some(mut old) = old {
            log::info!("unloading scene `{}` on stop", old.id);
            old.scene.unload(ctx).map_err(|e| LifecycleError::Unload {
                scene: old.id.name(),
                source: e.into(),
            })?;
        }
        Ok(())
    }

    fn active(&mut self) -> Option<&mut dyn Scene> {
        if self.state != SceneState::Active {
            return None;
        }
        self.current.as_mut().map(|c| c.scene.as_mut())
    }

    pub fn update(&mut self, ctx: &mut SceneCtx, dt: f64) {
        if let Some(scene) = self.active() {
            scene.update(ctx, dt);
        }
    }

    pub fn draw(&mut self, ctx: &mut SceneCtx, dt: f64, fps: f64) -> Result<(), RenderError> {
        match self.active() {
            Some(scene) => scene.draw(ctx, dt, fps),
            None => Ok(()),
        }
    }

    pub fn resize(&mut self, ctx: &mut SceneCtx, viewport: Viewport) {
        if let Some(scene) = self.active() {
            scene.resize(ctx, viewport);
        }
    }
}

impl Default for SceneLifecycle {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;
    use crate::render::RenderContext;

    type Events = Rc<RefCell<Vec<String>>>;

    struct Recorder<const N: u8> {
        events: Events,
        fail_load: bool,
        fail_unload: bool,
    }

    impl<const N: u8> Scene for Recorder<N> {
        fn load(&mut self, _ctx: &mut SceneCtx) -> anyhow::Result<()> {
            self.events.borrow_mut().push(format!("load {}", N));
            anyhow::ensure!(!self.fail_load, "load {} failed", N);
            Ok(())
        }

        fn update(&mut self, _ctx: &mut SceneCtx, _dt: f64) {
            self.events.borrow_mut().push(format!("update {}", N));
        }

        fn draw(&mut self, _ctx: &mut SceneCtx, _dt: f64, _fps: f64) -> Result<(), RenderError> {
            self.events.borrow_mut().push(format!("draw {}", N));
            Ok(())
        }

        fn resize(&mut self, _ctx: &mut SceneCtx, _viewport: Viewport) {
            self.events.borrow_mut().push(format!("resize {}", N));
        }

        fn unload(&mut self, _ctx: &mut SceneCtx) -> anyhow::Result<()> {
            self.events.borrow_mut().push(format!("unload {}", N));
            anyhow::ensure!(!self.fail_unload, "unload {} failed", N);
            Ok(())
        }
    }

    type A = Recorder<1>;
    type B = Recorder<2>;

    fn setup(fail_load: bool, fail_unload: bool) -> (SceneRegistry, Events, SceneCtx) {
        let events: Events = Rc::default();
        let mut registry = SceneRegistry::new();

        let e = events.clone();
        registry
            .register_default_with(move || A {
                events: e.clone(),
                fail_load: false,
                fail_unload,
            })
            .unwrap();
        let e = events.clone();
        registry
            .register_with(move || B {
                events: e.clone(),
                fail_load,
                fail_unload: false,
            })
            .unwrap();

        let ctx = SceneCtx::new(RenderContext::new(Viewport::new(100.0, 100.0)));
        (registry, events, ctx)
    }

    fn take(events: &Events) -> Vec<String> {
        std::mem::take(&mut *events.borrow_mut())
    }

    #[test]
    fn switch_unloads_before_loading_and_keeps_one_active() {
        let (registry, events, mut ctx) = setup(false, false);
        let mut lc = SceneLifecycle::new();

        lc.change_scene(&registry, SceneId::of::<A>(), &mut ctx).unwrap();
        lc.change_scene(&registry, SceneId::of::<B>(), &mut ctx).unwrap();
        assert_eq!(take(&events), vec!["load 1", "unload 1", "load 2"]);

        lc.update(&mut ctx, 0.016);
        assert_eq!(take(&events), vec!["update 2"]);
        assert_eq!(lc.current(), Some(SceneId::of::<B>()));
        assert_eq!(lc.state(), SceneState::Active);
    }

    #[test]
    fn hooks_follow_the_switch() {
        let (registry, events, mut ctx) = setup(false, false);
        let mut lc = SceneLifecycle::new();
        lc.change_scene(&registry, SceneId::of::<A>(), &mut ctx).unwrap();
        lc.change_scene(&registry, SceneId::of::<B>(), &mut ctx).unwrap();
        take(&events);

        lc.update(&mut ctx, 0.016);
        lc.draw(&mut ctx, 0.016, 60.0).unwrap();
        lc.resize(&mut ctx, Viewport::new(320.0, 240.0));
        assert_eq!(take(&events), vec!["update 2", "draw 2", "resize 2"]);
    }

    #[test]
    fn hooks_are_silent_without_an_active_scene() {
        let (registry, events, mut ctx) = setup(true, false);
        let mut lc = SceneLifecycle::new();
        lc.change_scene(&registry, SceneId::of::<A>(), &mut ctx).unwrap();
        lc.change_scene(&registry, SceneId::of::<B>(), &mut ctx).unwrap_err();
        take(&events);

        lc.update(&mut ctx, 0.016);
        lc.draw(&mut ctx, 0.016, 60.0).unwrap();
        lc.resize(&mut ctx, Viewport::new(320.0, 240.0));
        assert!(take(&events).is_empty());
    }

    #[test]
    fn unregistered_target_changes_nothing() {
        struct Unknown;
        impl Scene for Unknown {}

        let (registry, events, mut ctx) = setup(false, false);
        let mut lc = SceneLifecycle::new();
        lc.change_scene(&registry, SceneId::of::<A>(), &mut ctx).unwrap();
        take(&events);

        let err = lc
            .change_scene(&registry, SceneId::of::<Unknown>(), &mut ctx)
            .unwrap_err();
        assert!(matches!(err, LifecycleError::Config(_)));
        assert!(take(&events).is_empty());
        assert_eq!(lc.current(), Some(SceneId::of::<A>()));
        assert_eq!(lc.state(), SceneState::Active);
    }

    #[test]
    fn failed_unload_stops() {
        let (registry, events, mut ctx) = setup(false, true);
        let mut lc = SceneLifecycle::new();
        lc.change_scene(&registry, SceneId::of::<A>(), &mut ctx).unwrap();

        let err = lc.change_scene(&registry, SceneId::of::<B>(), &mut ctx).unwrap_err();
        assert!(matches!(err, LifecycleError::Unload { scene: "Recorder<1>", .. }));
        assert_eq!(lc.state(), SceneState::Stopped);
        assert_eq!(take(&events), vec!["load 1", "unload 1"]);

        let err = lc.change_scene(&registry, SceneId::of::<A>(), &mut ctx).unwrap_err();
        assert!(matches!(err, LifecycleError::IllegalTransition(SceneState::Stopped)));
    }

    #[test]
    fn failed_load_leaves_no_scene() {
        let (registry, events, mut ctx) = setup(true, false);
        let mut lc = SceneLifecycle::new();
        lc.change_scene(&registry, SceneId::of::<A>(), &mut ctx).unwrap();

        let err = lc.change_scene(&registry, SceneId::of::<B>(), &mut ctx).unwrap_err();
        assert!(matches!(err, LifecycleError::Load { .. }));
        assert_eq!(lc.state(), SceneState::NoScene);
        assert_eq!(lc.current(), None);

        lc.update(&mut ctx, 0.016);
        assert_eq!(take(&events), vec!["load 1", "unload 1", "load 2"]);

        // Recoverable: NoScene accepts a new target.
        lc.change_scene(&registry, SceneId::of::<A>(), &mut ctx).unwrap();
        assert_eq!(lc.state(), SceneState::Active);
    }

    #[test]
    fn stop_unloads_current() {
        let (registry, events, mut ctx) = setup(false, false);
        let mut lc = SceneLifecycle::new();
        lc.change_scene(&registry, SceneId::of::<A>(), &mut ctx).unwrap();

        lc.stop(&mut ctx).unwrap();
        lc.stop(&mut ctx).unwrap();
        lc.update(&mut ctx, 0.016);
        assert_eq!(take(&events), vec!["load 1", "unload 1"]);
        assert_eq!(lc.state(), SceneState::Stopped);
    }
}
