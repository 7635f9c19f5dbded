use anyhow::{Context, Result};
use gcv_gfm::{calculator, export_envelope, time_axis, GfmParams, GfmTest};
use std::path::Path;
use tracing::{info, warn};

pub struct EnvelopeArgs<'a> {
    pub test: &'a str,
    pub params: Option<&'a Path>,
    pub damping: f64,
    pub inertia: f64,
    pub xeff: f64,
    pub t_end: f64,
    pub dt: f64,
    pub event_time: f64,
    pub out: &'a Path,
    pub plot: bool,
}

pub fn handle(args: &EnvelopeArgs<'_>) -> Result<()> {
    let test: GfmTest = args.test.parse()?;
    let params = match args.params {
        Some(path) => GfmParams::load_from(path)
            .with_context(|| format!("loading parameters '{}'", path.display()))?,
        None => GfmParams::default(),
    };
    let time = time_axis(args.t_end, args.dt)?;
    let envelope = calculator(test).calculate_envelopes(
        &params,
        args.damping,
        args.inertia,
        args.xeff,
        &time,
        args.event_time,
    )?;

    let plot = args.plot && cfg!(feature = "plot");
    if args.plot && !plot {
        warn!("built without plot support, skipping PNG output");
    }
    let files = export_envelope(&envelope, args.out, test.as_str(), plot)
        .with_context(|| format!("exporting envelope to '{}'", args.out.display()))?;
    info!(
        "{} envelope ({}) written to {}",
        test,
        envelope.regime,
        files.csv.display()
    );
    println!("{}", files.csv.display());
    if let Some(png) = files.png {
        println!("{}", png.display());
    }
    Ok(())
}
