//! Envelope export: `;`-separated CSV and an optional PNG plot.

use std::fs;
use std::path::{Path, PathBuf};

use gcv_core::{GcvError, GcvResult};
use tracing::info;

use crate::envelope::Envelope;

/// Two-decimal scientific notation with a signed, two-digit exponent
/// (`1.23e+00`, `-4.50e-03`).
pub fn format_sci(value: f64) -> String {
    if value.is_nan() {
        return "nan".to_string();
    }
    if value.is_infinite() {
        return if value > 0.0 { "inf" } else { "-inf" }.to_string();
    }
    let raw = format!("{:.2e}", value);
    match raw.split_once('e') {
        Some((mantissa, exponent)) => {
            let (sign, digits) = match exponent.strip_prefix('-') {
                Some(digits) => ('-', digits),
                None => ('+', exponent),
            };
            format!("{}e{}{:0>2}", mantissa, sign, digits)
        }
        None => raw,
    }
}

/// Column headers for an envelope file.
pub fn headers(envelope: &Envelope) -> [String; 4] {
    let label = envelope.magnitude.label();
    [
        "Time (s)".to_string(),
        format!("{} PCC (pu)", label),
        format!("{} down (pu)", label),
        format!("{} up (pu)", label),
    ]
}

/// Write time, center, lower and upper columns.
pub fn write_envelope_csv(envelope: &Envelope, path: &Path) -> GcvResult<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let mut writer = csv::WriterBuilder::new()
        .delimiter(b';')
        .from_path(path)?;
    writer.write_record(headers(envelope))?;
    for i in 0..envelope.len() {
        writer.write_record([
            format_sci(envelope.time[i]),
            format_sci(envelope.center[i]),
            format_sci(envelope.lower[i]),
            format_sci(envelope.upper[i]),
        ])?;
    }
    writer.flush()?;
    Ok(())
}

/// Files written by [`export_envelope`].
#[derive(Debug, Clone, Default)]
pub struct ExportedFiles {
    pub csv: PathBuf,
    pub png: Option<PathBuf>,
}

/// Write `<stem>.csv` into `dir`, plus `<stem>.png` when `plot` is set and
/// the crate was built with plotting.
pub fn export_envelope(
    envelope: &Envelope,
    dir: &Path,
    stem: &str,
    plot: bool,
) -> GcvResult<ExportedFiles> {
    fs::create_dir_all(dir)?;
    let csv = dir.join(format!("{}.csv", stem));
    write_envelope_csv(envelope, &csv)?;
    info!(path = %csv.display(), rows = envelope.len(), "envelope written");

    let png = if plot {
        let path = dir.join(format!("{}.png", stem));
        plot_to(envelope, stem, &path)?;
        Some(path)
    } else {
        None
    };
    Ok(ExportedFiles { csv, png })
}

#[cfg(feature = "plot")]
fn plot_to(envelope: &Envelope, title: &str, path: &Path) -> GcvResult<()> {
    plot_envelope(envelope, title, path)
}

#[cfg(not(feature = "plot"))]
fn plot_to(_envelope: &Envelope, _title: &str, _path: &Path) -> GcvResult<()> {
    Err(GcvError::Config(
        "plot output requires the `plot` feature".to_string(),
    ))
}

/// Render center and bounds to a PNG.
#[cfg(feature = "plot")]
pub fn plot_envelope(envelope: &Envelope, title: &str, path: &Path) -> GcvResult<()> {
    use plotters::prelude::*;

    fn plot_err(err: impl std::fmt::Display) -> GcvError {
        GcvError::Other(format!("plot failed: {}", err))
    }

    if envelope.is_empty() {
        return Err(GcvError::Validation(
            "cannot plot an empty envelope".to_string(),
        ));
    }

    let root = BitMapBackend::new(path, (1280, 720)).into_drawing_area();
    root.fill(&WHITE).map_err(plot_err)?;

    let t_min = envelope.time[0];
    let t_max = envelope.time[envelope.len() - 1].max(t_min + 1e-6);
    let (y_min, y_max) = envelope
        .lower
        .iter()
        .chain(&envelope.upper)
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
            (lo.min(*v), hi.max(*v))
        });
    let pad = ((y_max - y_min) * 0.05).max(1e-3);

    let label = envelope.magnitude.label();
    let mut chart = ChartBuilder::on(&root)
        .caption(
            format!("{} ({})", title, envelope.regime),
            ("sans-serif", 30).into_font(),
        )
        .margin(20)
        .x_label_area_size(50)
        .y_label_area_size(70)
        .build_cartesian_2d(t_min..t_max, (y_min - pad)..(y_max + pad))
        .map_err(plot_err)?;

    chart
        .configure_mesh()
        .x_desc("Time [s]")
        .y_desc(format!("{} [pu]", label))
        .draw()
        .map_err(plot_err)?;

    let series = [
        (&envelope.center, BLUE, format!("{} PCC", label)),
        (&envelope.upper, RED, format!("{} up", label)),
        (&envelope.lower, GREEN, format!("{} down", label)),
    ];
    for (values, color, name) in series {
        chart
            .draw_series(LineSeries::new(
                envelope.time.iter().copied().zip(values.iter().copied()),
                &color,
            ))
            .map_err(plot_err)?
            .label(name)
            .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 25, y)], color.stroke_width(3)));
    }

    chart
        .configure_series_labels()
        .position(SeriesLabelPosition::UpperRight)
        .border_style(BLACK)
        .background_style(WHITE.mix(0.7))
        .draw()
        .map_err(plot_err)?;

    root.present().map_err(plot_err)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dynamics::Regime;
    use crate::envelope::Magnitude;

    #[test]
    fn scientific_format_has_two_digit_signed_exponent() {
        assert_eq!(format_sci(1.234), "1.23e+00");
        assert_eq!(format_sci(-0.0045), "-4.50e-03");
        assert_eq!(format_sci(0.0), "0.00e+00");
        assert_eq!(format_sci(12345.0), "1.23e+04");
        assert_eq!(format_sci(1e-120), "1.00e-120");
        assert_eq!(format_sci(f64::NAN), "nan");
        assert_eq!(format_sci(f64::NEG_INFINITY), "-inf");
    }

    #[test]
    fn csv_uses_semicolons_and_magnitude_headers() {
        let envelope = Envelope {
            regime: Regime::Underdamped,
            magnitude: Magnitude::ReactivePower,
            time: vec![0.0, 0.5],
            center: vec![0.0, -0.4],
            upper: vec![0.02, -0.3],
            lower: vec![-0.02, -0.5],
        };
        let dir = tempfile::tempdir().unwrap();
        let files = export_envelope(&envelope, dir.path(), "amplitude-step", false).unwrap();
        assert!(files.png.is_none());

        let text = std::fs::read_to_string(&files.csv).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(
            lines[0],
            "Time (s);ΔQ PCC (pu);ΔQ down (pu);ΔQ up (pu)"
        );
        assert_eq!(lines[2], "5.00e-01;-4.00e-01;-5.00e-01;-3.00e-01");
        assert_eq!(lines.len(), 3);
    }
}
