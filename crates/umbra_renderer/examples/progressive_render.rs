//! Progressive render example.
//!
//! Renders one of the built-in scenes for a fixed wall-clock time, logging
//! progress as it goes, then writes a PNG and the raw accumulator. If an
//! accumulator for the scene already exists the render continues from it.
//!
//! ```text
//! cargo run --release --example progressive_render -- [scene] [seconds]
//! ```

use anyhow::{bail, Context, Result};
use std::fs::File;
use std::io::{self, BufReader, BufWriter};
use std::thread;
use std::time::{Duration, Instant};
use umbra_renderer::{
    Accumulator, AlignedBox, AlignedSquare, CameraConfig, Color, Dimensions, Disc, Material,
    Object, Pipe, RenderConfig, RenderInstance, Scene, SceneRegistry, Sphere, Triangle, Vector,
};

const WIDTH: usize = 320;
const HEIGHT: usize = 240;

fn main() -> Result<()> {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();

    let mut args = std::env::args().skip(1);
    let scene_name = args.next().unwrap_or_else(|| "cornell".to_string());
    let seconds: u64 = match args.next() {
        Some(s) => s.parse().context("seconds must be a whole number")?,
        None => 10,
    };

    let registry = build_registry();
    log::info!("Available scenes: {:?}", registry.names());
    let scene = registry.build(&scene_name)?;

    let dims = Dimensions::new(WIDTH, HEIGHT)?;
    let config = RenderConfig::default().with_trace_rate_period(Duration::from_secs(1));
    let acc = format!("{scene_name}.acc");
    let instance = match File::open(&acc) {
        Ok(file) => {
            let (saved_name, accumulator) = Accumulator::read_from(BufReader::new(file))
                .with_context(|| format!("failed to read {acc}"))?;
            if saved_name != scene_name {
                bail!("{acc} holds scene '{saved_name}', not '{scene_name}'");
            }
            log::info!("Resuming {acc} at {} passes", accumulator.passes());
            RenderInstance::resume(dims, scene.objects, &scene.camera, config, accumulator)?
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            RenderInstance::from_scene(dims, scene, config)?
        }
        Err(e) => return Err(e).with_context(|| format!("failed to open {acc}")),
    };
    log::info!("Grid: {:?}", instance.grid_stats());

    let workers = thread::available_parallelism().map_or(4, |n| n.get());
    instance.set_workers(workers);

    let start = Instant::now();
    let deadline = Duration::from_secs(seconds);
    while start.elapsed() < deadline {
        thread::sleep(Duration::from_secs(1));
        let stats = instance.get_stats();
        log::info!(
            "{:>4}s: {} passes, {} samples/s, {} workers",
            start.elapsed().as_secs(),
            stats.passes,
            stats.trace_rate_hz,
            stats.workers
        );
    }
    // Let the pass in flight finish so it is included in the output.
    instance.set_workers(0);
    while instance.get_stats().workers != 0 {
        thread::sleep(Duration::from_millis(10));
    }

    let png = format!("{scene_name}.png");
    instance
        .snapshot_image(1.0)
        .to_rgba_image()
        .save(&png)
        .with_context(|| format!("failed to write {png}"))?;
    log::info!("Saved {png}");

    let file = File::create(&acc).with_context(|| format!("failed to create {acc}"))?;
    instance.save_accumulator(BufWriter::new(file), &scene_name)?;
    log::info!("Saved {acc}");

    Ok(())
}

fn build_registry() -> SceneRegistry {
    let mut registry = SceneRegistry::new();
    registry
        .register("cornell", cornell_box)
        .register("sphere_light", sphere_light);
    registry
}

/// Camera looking into the open side of a unit box from `distance` away,
/// with the field of view chosen so the box just fills the frame.
fn cornell_camera(distance: f64) -> CameraConfig {
    let fov = 2.0 * (0.5 / (0.25 + distance * distance).sqrt()).asin();
    CameraConfig::default()
        .with_position(
            Vector::new(0.5, 0.5, distance),
            Vector::new(0.5, 0.5, -0.5),
            Vector::Y,
        )
        .with_field_of_view(fov.to_degrees())
}

/// Open-fronted unit box occupying x, y in [0, 1] and z in [-1, 0].
fn cornell_walls() -> Vec<Object> {
    let white = Material::diffuse(Color::ONE);
    vec![
        Object::new(AlignedSquare::y(0.0, (0.0, 1.0), (-1.0, 0.0)), white),
        Object::new(AlignedSquare::y(1.0, (0.0, 1.0), (-1.0, 0.0)), white),
        Object::new(AlignedSquare::z(-1.0, (0.0, 1.0), (0.0, 1.0)), white),
        Object::new(
            AlignedSquare::x(0.0, (0.0, 1.0), (-1.0, 0.0)),
            Material::diffuse(Color::new(1.0, 0.0, 0.0)),
        ),
        Object::new(
            AlignedSquare::x(1.0, (0.0, 1.0), (-1.0, 0.0)),
            Material::diffuse(Color::new(0.0, 1.0, 0.0)),
        ),
    ]
}

fn cornell_box() -> Scene {
    let white = Material::diffuse(Color::ONE);
    let mut scene = Scene::new(cornell_camera(1.3));
    scene.extend(cornell_walls());
    scene
        .add(Object::new(
            AlignedSquare::y(0.999, (0.35, 0.65), (-0.65, -0.35)),
            Material::emitter(Color::ONE, 5.0),
        ))
        .add(Object::new(
            AlignedBox::new(Vector::new(0.55, 0.0, -0.75), Vector::new(0.85, 0.3, -0.45)),
            white,
        ))
        .add(Object::new(
            Sphere::new(Vector::new(0.3, 0.15, -0.35), 0.15),
            Material::mirror(),
        ))
        .add(Object::new(
            Pipe::new(Vector::new(0.2, 0.0, -0.8), Vector::new(0.2, 0.5, -0.8), 0.08),
            white,
        ));

    // Tilted triangle leaning back against the rear wall.
    let mut tri = Triangle::new(
        Vector::new(-0.15, 0.0, 0.0),
        Vector::new(0.15, 0.0, 0.0),
        Vector::new(0.0, 0.3, 0.0),
    );
    tri.rotate(Vector::X, -0.3);
    tri.translate(Vector::new(0.6, 0.3, -0.9));
    scene.add(Object::new(tri, Material::diffuse(Color::new(0.2, 0.4, 0.9))));
    scene
}

fn sphere_light() -> Scene {
    let mut scene = Scene::new(cornell_camera(1.3));
    scene.extend(cornell_walls());
    scene
        .add(Object::new(
            Disc::new(Vector::new(0.5, 0.999, -0.5), 0.2, -Vector::Y),
            Material::emitter(Color::new(1.0, 0.9, 0.8), 4.0),
        ))
        .add(Object::new(
            Sphere::new(Vector::new(0.5, 0.25, -0.5), 0.25),
            Material::diffuse(Color::splat(0.8)),
        ));
    scene
}
