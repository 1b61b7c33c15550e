use std::process::ExitCode;

use orrery::{
    AppConfig, Camera, Error, Material, Mesh, Orbit, Planet, Result, Scene, SetupContext, Spin,
    Vec3, Vec4,
};

const SPHERE_RESOLUTION: u32 = 32;

fn colored_sphere(color: Vec4) -> Result<Mesh> {
    let mut mesh = Mesh::unit_sphere(SPHERE_RESOLUTION, 1.0, Vec3::ZERO)?;
    mesh.set_uniform_color(color);
    Ok(mesh)
}

fn solar_system(ctx: &mut SetupContext) -> Result<Scene> {
    let shader = ctx.load_default_shader()?;

    let camera = Camera::new()
        .at(0.0, 15.0, 40.0)
        .looking_at(0.0, 0.0, 0.0)
        .with_clip(0.1, 200.0)
        .with_ratio(ctx.aspect());
    let mut scene = Scene::new(camera);

    let sphere = scene.shared_sphere();
    let earth_mesh = scene.add_mesh(colored_sphere(Vec4::new(0.2, 0.4, 1.0, 1.0))?);
    let mars_mesh = scene.add_mesh(colored_sphere(Vec4::new(0.9, 0.3, 0.1, 1.0))?);

    let glow = scene.add_material(Material::new(Vec3::new(1.0, 0.85, 0.3), 0.0, 0.0, 1.0));
    let rock = scene.add_material(Material::new(Vec3::splat(0.05), 0.9, 0.3, 16.0));
    let dust = scene.add_material(Material::new(Vec3::splat(0.03), 0.8, 0.1, 4.0));

    let sun = scene
        .add_sun(
            sphere,
            glow,
            shader,
            Planet::root(2.0, Spin::new(0.1, Vec3::Y), Vec3::ZERO),
            Vec3::new(1.0, 0.95, 0.85),
        )
        .ok_or(Error::Rejected("sun"))?;

    // Sizes and radii are relative to the body being orbited.
    let earth = Planet::orbiting(
        0.5,
        Spin::new(1.0, Vec3::new(0.2, 1.0, 0.0)),
        Orbit::new(0.3, Vec3::Y, 6.0),
        &scene.orbit_center(sun)?,
    );
    let earth = scene
        .add_planet(earth_mesh, rock, shader, earth)
        .ok_or(Error::Rejected("earth"))?;

    let moon = Planet::orbiting(
        0.3,
        Spin::none(),
        Orbit::new(1.5, Vec3::Y, 2.5),
        &scene.orbit_center(earth)?,
    );
    scene
        .add_planet(sphere, dust, shader, moon)
        .ok_or(Error::Rejected("moon"))?;

    let mars = Planet::orbiting(
        0.35,
        Spin::new(0.8, Vec3::Y),
        Orbit::new(0.15, Vec3::new(0.0, 1.0, 0.1), 10.0),
        &scene.orbit_center(sun)?,
    );
    scene
        .add_planet(mars_mesh, rock, shader, mars)
        .ok_or(Error::Rejected("mars"))?;

    Ok(scene)
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    match orrery::run(AppConfig::default(), solar_system) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("orrery failed: {e}");
            ExitCode::FAILURE
        }
    }
}
