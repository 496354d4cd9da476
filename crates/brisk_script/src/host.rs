//! Script host
//!
//! Owns the QuickJS runtime, installs the native `__brisk` bindings over a
//! shared [`World`], evaluates the prelude and forwards engine events to the
//! script's callbacks.
//!
//! Every call into JavaScript is a boundary: exceptions are caught there,
//! logged, and never reach the frame loop. Natives borrow the world only for
//! the duration of one call, so the host must never be driven while the
//! caller holds a borrow of its own.

use crate::ScriptError;
use brisk_core::math::Vec2;
use brisk_core::scene::EntityDefinition;
use brisk_core::{Event, EntityId, World};
use rquickjs::{Context, Ctx, Function, Object, Runtime};
use std::cell::RefCell;
use std::path::Path;
use std::rc::Rc;

const PRELUDE: &str = include_str!("prelude.js");
const DISPATCH: &str = "__brisk_dispatch";

/// Shared handle to the simulation, as scripts see it.
pub type SharedWorld = Rc<RefCell<World>>;

pub struct ScriptHost {
    #[allow(dead_code)] // Kept alive for context lifetime
    runtime: Runtime,
    context: Context,
    world: SharedWorld,
}

impl ScriptHost {
    pub fn new(world: SharedWorld) -> Result<Self, ScriptError> {
        let runtime = Runtime::new()?;
        let context = Context::full(&runtime)?;

        context.with(|ctx| -> Result<(), ScriptError> {
            install_bindings(&ctx, &world)?;
            ctx.eval::<(), _>(PRELUDE)
                .map_err(|err| ScriptError::from_js(&ctx, err))
        })?;

        Ok(Self {
            runtime,
            context,
            world,
        })
    }

    pub fn world(&self) -> &SharedWorld {
        &self.world
    }

    pub fn execute(&self, source: &str) -> Result<(), ScriptError> {
        self.context.with(|ctx| {
            ctx.eval::<(), _>(source)
                .map_err(|err| ScriptError::from_js(&ctx, err))
        })
    }

    pub fn execute_file(&self, path: &Path) -> Result<(), ScriptError> {
        let source = std::fs::read_to_string(path).map_err(|source| ScriptError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        self.execute(&source)?;
        tracing::info!(path = %path.display(), "script loaded");
        Ok(())
    }

    /// Run the script's per-frame `tick`, if it defines one.
    pub fn tick(&self) {
        self.emit("tick", 0.0, 0.0, "");
    }

    /// Forward one engine event to the matching callback.
    pub fn dispatch(&self, event: &Event) {
        match event {
            Event::EntitySpawned { entity } => self.emit("spawned", handle(*entity), 0.0, ""),
            Event::EntityDestroyed { entity } => {
                self.emit("destroyed", handle(*entity), 0.0, "")
            }
            Event::SceneChanged { scene } => self.emit("scene_changed", 0.0, 0.0, scene),
            Event::CollisionDetected { entity, other } => {
                self.emit("collision", handle(*entity), handle(*other), "")
            }
        }
    }

    fn emit(&self, kind: &str, a: f64, b: f64, text: &str) {
        let result = self.context.with(|ctx| -> Result<(), ScriptError> {
            let dispatch: Function = ctx.globals().get(DISPATCH)?;
            dispatch
                .call::<_, ()>((kind, a, b, text))
                .map_err(|err| ScriptError::from_js(&ctx, err))
        });
        if let Err(err) = result {
            tracing::error!(callback = kind, error = %err, "script callback failed");
        }
    }
}

// Ids cross into JavaScript as numbers. Generations above 0x7fff push the
// packed value past i32, so they travel as f64.
fn handle(id: EntityId) -> f64 {
    id.to_bits() as f64
}

fn entity(handle: f64) -> EntityId {
    EntityId::from_bits(handle as u32)
}

/// Run `f` against the world, or give up with the default when a borrow is
/// already outstanding.
fn with_world<R: Default>(world: &SharedWorld, f: impl FnOnce(&mut World) -> R) -> R {
    match world.try_borrow_mut() {
        Ok(mut world) => f(&mut world),
        Err(_) => {
            tracing::error!("world is busy, script call ignored");
            R::default()
        }
    }
}

fn install_bindings(ctx: &Ctx<'_>, world: &SharedWorld) -> Result<(), ScriptError> {
    let api = Object::new(ctx.clone())?;

    let w = Rc::clone(world);
    api.set(
        "entity_name",
        Function::new(ctx.clone(), move |id: f64| -> Option<String> {
            with_world(&w, |world| world.entity_name(entity(id)).map(str::to_string))
        })?,
    )?;

    let w = Rc::clone(world);
    api.set(
        "entity_position",
        Function::new(ctx.clone(), move |id: f64| -> Option<Vec<f64>> {
            with_world(&w, |world| {
                world
                    .entity_position(entity(id))
                    .map(|p| vec![p.x as f64, p.y as f64])
            })
        })?,
    )?;

    let w = Rc::clone(world);
    api.set(
        "move_entity",
        Function::new(ctx.clone(), move |id: f64, dx: f64, dy: f64| -> bool {
            with_world(&w, |world| {
                world.move_entity(entity(id), Vec2::new(dx as f32, dy as f32))
            })
        })?,
    )?;

    let w = Rc::clone(world);
    api.set(
        "set_position",
        Function::new(ctx.clone(), move |id: f64, x: f64, y: f64| -> bool {
            with_world(&w, |world| {
                world.set_entity_position(entity(id), Vec2::new(x as f32, y as f32))
            })
        })?,
    )?;

    let w = Rc::clone(world);
    api.set(
        "flip_x",
        Function::new(ctx.clone(), move |id: f64| -> bool {
            with_world(&w, |world| world.flip_x(entity(id)))
        })?,
    )?;

    let w = Rc::clone(world);
    api.set(
        "flip_y",
        Function::new(ctx.clone(), move |id: f64| -> bool {
            with_world(&w, |world| world.flip_y(entity(id)))
        })?,
    )?;

    let w = Rc::clone(world);
    api.set(
        "set_animation",
        Function::new(ctx.clone(), move |id: f64, name: String| -> bool {
            with_world(&w, |world| world.set_animation(entity(id), &name))
        })?,
    )?;

    let w = Rc::clone(world);
    api.set(
        "destroy",
        Function::new(ctx.clone(), move |id: f64| -> bool {
            with_world(&w, |world| world.destroy(entity(id)))
        })?,
    )?;

    let w = Rc::clone(world);
    api.set(
        "spawn",
        Function::new(ctx.clone(), move |name: String, x: f64, y: f64| -> Option<f64> {
            with_world(&w, |world| {
                let definition = EntityDefinition {
                    position: Vec2::new(x as f32, y as f32),
                    ..EntityDefinition::new(name)
                };
                match world.spawn(&definition) {
                    Ok(id) => Some(handle(id)),
                    Err(err) => {
                        tracing::warn!(error = %err, "script spawn failed");
                        None
                    }
                }
            })
        })?,
    )?;

    let w = Rc::clone(world);
    api.set(
        "find_by_name",
        Function::new(ctx.clone(), move |name: String| -> Option<f64> {
            with_world(&w, |world| world.find_by_name(&name).map(handle))
        })?,
    )?;

    let w = Rc::clone(world);
    api.set(
        "scene_name",
        Function::new(ctx.clone(), move || -> String {
            with_world(&w, |world| world.scene_name().to_string())
        })?,
    )?;

    let w = Rc::clone(world);
    api.set(
        "camera_position",
        Function::new(ctx.clone(), move || -> Vec<f64> {
            with_world(&w, |world| {
                let p = world.camera().position;
                vec![p.x as f64, p.y as f64]
            })
        })?,
    )?;

    let w = Rc::clone(world);
    api.set(
        "set_camera",
        Function::new(ctx.clone(), move |x: f64, y: f64| {
            with_world(&w, |world| {
                world.set_camera_position(Vec2::new(x as f32, y as f32))
            })
        })?,
    )?;

    let w = Rc::clone(world);
    api.set(
        "scene_bounds",
        Function::new(ctx.clone(), move || -> Vec<f64> {
            with_world(&w, |world| {
                let bounds = world.bounds();
                let size = bounds.size();
                vec![
                    bounds.min.x as f64,
                    bounds.min.y as f64,
                    size.x as f64,
                    size.y as f64,
                ]
            })
        })?,
    )?;

    let w = Rc::clone(world);
    api.set(
        "request_scene",
        Function::new(ctx.clone(), move |name: String| {
            with_world(&w, |world| world.request_scene(name))
        })?,
    )?;

    let w = Rc::clone(world);
    api.set(
        "request_quit",
        Function::new(ctx.clone(), move || with_world(&w, World::request_quit))?,
    )?;

    let globals = ctx.globals();
    globals.set("__brisk", api)?;
    globals.set(
        "print",
        Function::new(ctx.clone(), |msg: String| {
            tracing::info!(target: "script", "{}", msg);
        })?,
    )?;
    Ok(())
}
