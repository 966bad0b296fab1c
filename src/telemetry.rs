//! Telemetry CSV export (SPEC_FULL.md section 4), grounded on the
//! teacher's `main.rs` CSV-writing loop: same `csv::Writer` usage, same
//! "header once, one row per retained sample" shape, generalized from
//! attitude/energy-error columns to ascent trajectory + guidance columns.

use std::io::Write;

use crate::mission::GuidanceCore;
use csv::Writer;

/// Write the full retained history plus the live state as one final row,
/// alongside the guidance columns active at the moment of export.
pub fn write_history_csv<W: Write>(core: &GuidanceCore, writer: W) -> Result<(), csv::Error> {
    let mut w = Writer::from_writer(writer);
    w.write_record([
        "t",
        "r_x",
        "r_y",
        "r_z",
        "v_x",
        "v_y",
        "v_z",
        "mass",
        "longitude_deg",
        "latitude_deg",
        "altitude_m",
        "mode",
        "steering_x",
        "steering_y",
        "steering_z",
        "tb",
        "tgo",
        "vgo_mag",
        "rgo_mag",
        "rgrav_mag",
        "rbias_mag",
    ])?;

    let (steering, mode) = core.get_guidance_info();
    let upfg = core.get_upfg_display();
    let steering = steering.unwrap_or_default();

    let mut rows = core.get_history();
    let (r, v, t, mass) = core.get_state();
    rows.push(crate::simulator::SimState::new(r, v, t, mass));

    for s in &rows {
        w.write_record(&[
            format!("{:.3}", s.t),
            format!("{:.6}", s.r.x),
            format!("{:.6}", s.r.y),
            format!("{:.6}", s.r.z),
            format!("{:.6}", s.v.x),
            format!("{:.6}", s.v.y),
            format!("{:.6}", s.v.z),
            format!("{:.6}", s.mass),
            format!("{:.6}", s.longitude.to_degrees()),
            format!("{:.6}", s.latitude.to_degrees()),
            format!("{:.3}", s.altitude),
            format!("{:?}", mode),
            format!("{:.6}", steering.x),
            format!("{:.6}", steering.y),
            format!("{:.6}", steering.z),
            format!("{:.3}", upfg.tb),
            format!("{:.3}", upfg.tgo),
            format!("{:.3}", upfg.vgo_mag),
            format!("{:.3}", upfg.rgo_mag),
            format!("{:.3}", upfg.rgrav_mag),
            format!("{:.3}", upfg.rbias_mag),
        ])?;
    }

    w.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::guidance::GuidanceConfig;
    use crate::simulator::Simulator;
    use crate::target::Target;
    use crate::vehicle::{StageBuilder, Vehicle};

    #[test]
    fn export_writes_one_row_per_history_entry_plus_live_state() {
        let vehicle = Vehicle::new(vec![StageBuilder::new(1)
            .wet_mass(500_000.0)
            .dry_mass(50_000.0)
            .thrust(6_000_000.0)
            .isp(350.0)
            .build()
            .unwrap()])
        .unwrap();
        let simulator = Simulator::new_ground(28.5_f64.to_radians(), 0.0, 500_000.0, 1.0).unwrap();
        let target = Target::from_spec(200.0, 200.0, 28.5, Some(0.0), 28.5_f64.to_radians(), 0.0).unwrap();
        let mut core = GuidanceCore::new(vehicle, simulator, GuidanceConfig::default(), target);
        core.advance_physics().unwrap();
        core.advance_physics().unwrap();

        let mut buf = Vec::new();
        write_history_csv(&core, &mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let lines: Vec<_> = text.lines().collect();
        // header + 2 history rows + 1 live-state row
        assert_eq!(lines.len(), 4);
    }
}
