use ascent_core::guidance::GuidanceConfig;
use ascent_core::mission::GuidanceCore;
use ascent_core::runtime;
use ascent_core::simulator::Simulator;
use ascent_core::target::Target;
use ascent_core::telemetry::write_history_csv;
use ascent_core::vehicle::{StageBuilder, StageMode, Vehicle};
use std::error::Error;
use std::fs::{self, File};
use std::path::Path;

/// A two-stage ascent to a 200x200 km, 28.5 deg orbit from Kennedy Space
/// Center latitude, built programmatically (mission-file parsing is an
/// external collaborator's job, out of this crate's scope).
fn main() -> Result<(), Box<dyn Error>> {
    let launch_lat = 28.5_f64.to_radians();
    let launch_lon = 0.0_f64;

    let vehicle = Vehicle::new(vec![
        StageBuilder::new(1)
            .mode(StageMode::ConstantThrust)
            .wet_mass(500_000.0)
            .dry_mass(100_000.0)
            .thrust(7_500_000.0)
            .isp(300.0)
            .build()?,
        StageBuilder::new(2)
            .mode(StageMode::ConstantAccel)
            .accel_limit(4.0)
            .wet_mass(100_000.0)
            .dry_mass(20_000.0)
            .thrust(1_000_000.0)
            .isp(420.0)
            .build()?,
    ])?;

    let dt_sim = 1.0;
    let simulator = Simulator::new_ground(launch_lat, launch_lon, vehicle.stages()[0].wet_mass, dt_sim)?;

    let target = Target::from_spec(200.0, 200.0, 28.5, None, launch_lat, launch_lon)?;

    let mut core = GuidanceCore::new(vehicle, simulator, GuidanceConfig::default(), target);

    let dt_guidance = 1.0;
    let guidance_ratio = (dt_guidance / dt_sim).round().max(1.0) as u32;
    let physics_ticks = 600; // 10 minutes of ascent

    runtime::tick_once(&mut core, physics_ticks, guidance_ratio)?;

    let output_dir = Path::new("output");
    fs::create_dir_all(output_dir)?;
    let file = File::create(output_dir.join("ascent_telemetry.csv"))?;
    write_history_csv(&core, file)?;

    println!("Ascent telemetry written to output/ascent_telemetry.csv");
    println!("Final mode: {:?}", core.active_mode());
    Ok(())
}
