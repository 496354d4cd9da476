//! Frame loop
//!
//! One tick, in order: drain last frame's events to the renderer, scripts
//! and log; run the script `tick`; synchronize lifecycle; step physics;
//! advance animations; render. Between ticks a requested scene transition is
//! applied and the quit conditions are checked.

use crate::renderer::HeadlessRenderer;
use anyhow::{Context, Result};
use brisk_core::scene::Sprite;
use brisk_core::time::FixedTimestep;
use brisk_core::{EntityId, Event, World};
use brisk_script::{ScriptHost, SharedWorld};
use brisk_services::Services;
use std::cell::RefCell;
use std::rc::Rc;
use std::time::Instant;

pub struct Game {
    services: Services,
    world: SharedWorld,
    scripts: Option<ScriptHost>,
    renderer: HeadlessRenderer,
    timestep: FixedTimestep,
    ticks: u64,
}

impl Game {
    /// Load the entry scene and evaluate the entry script. Either failing is
    /// fatal.
    pub fn new(services: Services) -> Result<Self> {
        let settings = &services.settings;
        let world = Rc::new(RefCell::new(World::new(settings.world_config())));

        let entry = settings.entry_scene.clone();
        let definition = services
            .scenes
            .load(&entry)
            .with_context(|| format!("failed to load entry scene '{entry}'"))?;
        world.borrow_mut().load_scene(&entry, &definition)?;

        let scripts = match settings.entry_script_path() {
            Some(path) => {
                let host = ScriptHost::new(Rc::clone(&world))
                    .context("failed to start script host")?;
                host.execute_file(&path)
                    .with_context(|| format!("failed to run entry script {}", path.display()))?;
                Some(host)
            }
            None => {
                tracing::info!("no entry script configured");
                None
            }
        };

        Ok(Self {
            services,
            world,
            scripts,
            renderer: HeadlessRenderer::new(),
            timestep: FixedTimestep::new(),
            ticks: 0,
        })
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    #[cfg(test)]
    pub fn world(&self) -> &SharedWorld {
        &self.world
    }

    pub fn renderer(&self) -> &HeadlessRenderer {
        &self.renderer
    }

    /// Run fixed ticks against the wall clock until a quit condition holds.
    pub fn run(&mut self) {
        tracing::info!("Entering frame loop");
        let mut last = Instant::now();
        loop {
            let now = Instant::now();
            self.timestep.accumulate(now - last);
            last = now;

            while self.timestep.try_tick() {
                if !self.tick() {
                    return;
                }
            }
            std::thread::sleep(self.timestep.until_next_tick());
        }
    }

    /// Simulate one tick. Returns false once the game should stop.
    pub fn tick(&mut self) -> bool {
        let events = self.world.borrow_mut().begin_frame();
        for event in &events {
            self.dispatch(event);
        }

        if let Some(scripts) = &self.scripts {
            scripts.tick();
        }

        let report = self.world.borrow_mut().advance();
        tracing::trace!(?report, "tick advanced");

        self.renderer.begin_frame();
        self.world.borrow().render(&mut self.renderer);
        let stats = self.renderer.stats();
        tracing::trace!(
            draws = stats.draws,
            missing = stats.missing,
            textures = self.renderer.bound_len(),
            "frame rendered"
        );

        self.ticks += 1;
        self.apply_scene_request();
        self.keep_running()
    }

    fn dispatch(&mut self, event: &Event) {
        match event {
            Event::EntitySpawned { entity } => self.bind_texture(*entity),
            Event::EntityDestroyed { entity } => {
                self.renderer.unbind(*entity);
            }
            Event::SceneChanged { scene } => {
                tracing::info!(scene = %scene, "scene changed");
                self.bind_tileset();
            }
            Event::CollisionDetected { entity, other } => {
                tracing::trace!(%entity, %other, "collision");
            }
        }

        if let Some(scripts) = &self.scripts {
            scripts.dispatch(event);
        }
    }

    fn bind_texture(&mut self, entity: EntityId) {
        let texture = self
            .world
            .borrow()
            .scene()
            .get(entity)
            .and_then(|e| e.get::<Sprite>())
            .map(|sprite| sprite.texture.clone());
        let Some(texture) = texture else {
            return;
        };

        match self.services.textures.get_or_load(&texture) {
            Ok(handle) => self.renderer.bind(entity, handle),
            Err(err) => tracing::warn!(%entity, error = %err, "texture unavailable"),
        }
    }

    fn bind_tileset(&mut self) {
        let texture = self.world.borrow().scene().tilemap().texture.clone();
        if texture.is_empty() {
            return;
        }

        match self.services.textures.get_or_load(&texture) {
            Ok(handle) => self.renderer.bind_tileset(handle),
            Err(err) => tracing::warn!(texture = %texture, error = %err, "tileset unavailable"),
        }
    }

    /// Swap scenes if a script asked for it. A missing scene is logged and the
    /// current one keeps running.
    fn apply_scene_request(&mut self) {
        let Some(name) = self.world.borrow_mut().take_scene_request() else {
            return;
        };

        let definition = match self.services.scenes.load(&name) {
            Ok(definition) => definition,
            Err(err) => {
                tracing::error!(scene = %name, error = %err, "scene transition failed");
                return;
            }
        };
        let loaded = self.world.borrow_mut().load_scene(&name, &definition);
        if let Err(err) = loaded {
            tracing::error!(scene = %name, error = %err, "scene transition failed");
            return;
        }

        self.renderer.clear();
        let freed = self.services.textures.sweep_unreferenced();
        tracing::info!(scene = %name, textures_freed = freed, "scene transition");
    }

    fn keep_running(&self) -> bool {
        if self.world.borrow().quit_requested() {
            tracing::info!(ticks = self.ticks, "quit requested");
            return false;
        }
        if let Some(max) = self.services.settings.max_ticks {
            if self.ticks >= max {
                tracing::info!(ticks = self.ticks, "tick limit reached");
                return false;
            }
        }
        true
    }
}
