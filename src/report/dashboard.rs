//! Text dashboard for an analysis bundle
//!
//! Output is plain ASCII; colors are ANSI escapes from `owo-colors` and can
//! be switched off for pipes and tests.

use std::fmt::{self, Write};

use chrono::NaiveDateTime;
use owo_colors::OwoColorize;

use crate::analysis::heatmap::{DAYS_PER_WEEK, DAY_NAMES, HOURS_PER_DAY};
use crate::analysis::{AnalysisBundle, HeatmapGrid, PeakWindow, StatsSummary};
use crate::core::sample::{
    CPU_USAGE_PERCENT, GPU_FREQ_MHZ, GPU_USAGE_PERCENT, MEMORY_SWAP_TOTAL, MEMORY_SWAP_USED,
    MEMORY_TOTAL, MEMORY_USED, POWER_CPU, POWER_GPU, POWER_TOTAL, RAM_PERCENT,
    SWAP_PRESSURE_PERCENT,
};

const SEP: &str = "============================================================================";
const THIN_SEP: &str = "----------------------------------------------------------------------------";

/// Heatmap shades from lowest to highest; an absent bucket is a blank
const SHADES: &[u8] = b".:-=+*#%@";

const NOT_AVAILABLE: &str = "N/A";

/// Render with colors
pub fn render_dashboard(bundle: &AnalysisBundle) -> String {
    Dashboard { color: true }.render(bundle)
}

/// Render without escape codes
pub fn render_plain(bundle: &AnalysisBundle) -> String {
    Dashboard { color: false }.render(bundle)
}

/// Label for a p95 - p75 gap in percentage points
pub fn sufficiency_label(gap: f64) -> &'static str {
    if gap < 5.0 {
        "Sustained load"
    } else if gap < 10.0 {
        "Mostly steady"
    } else if gap < 20.0 {
        "Bursty"
    } else {
        "Mostly idle"
    }
}

/// Human-readable name of a metric column
pub fn display_name(metric: &str) -> &str {
    match metric {
        CPU_USAGE_PERCENT => "CPU Usage",
        GPU_USAGE_PERCENT => "GPU Usage",
        GPU_FREQ_MHZ => "GPU Frequency (MHz)",
        RAM_PERCENT => "RAM Usage",
        SWAP_PRESSURE_PERCENT => "Swap Pressure",
        MEMORY_TOTAL => "Memory Total (GB)",
        MEMORY_USED => "Memory Used (GB)",
        MEMORY_SWAP_TOTAL => "Swap Total (GB)",
        MEMORY_SWAP_USED => "Swap Used (GB)",
        POWER_CPU => "CPU Power (W)",
        POWER_GPU => "GPU Power (W)",
        POWER_TOTAL => "Total Power (W)",
        other => other,
    }
}

fn is_percent(metric: &str) -> bool {
    metric.ends_with("_percent")
}

fn format_value(metric: &str, value: f64) -> String {
    if is_percent(metric) {
        format!("{:.1}%", value)
    } else {
        format!("{:.2}", value)
    }
}

/// Shade for `value` on the grid's own scale
fn shade(value: f64, lo: f64, hi: f64) -> char {
    let top = SHADES.len() - 1;
    let level = if hi - lo > f64::EPSILON {
        (((value - lo) / (hi - lo)) * top as f64).round() as usize
    } else if value > 0.0 {
        top
    } else {
        0
    };
    SHADES[level.min(top)] as char
}

struct Dashboard {
    color: bool,
}

impl Dashboard {
    fn title(&self, text: &str) -> String {
        if self.color {
            text.bold().to_string()
        } else {
            text.to_string()
        }
    }

    fn section(&self, text: &str) -> String {
        if self.color {
            text.cyan().to_string()
        } else {
            text.to_string()
        }
    }

    fn missing(&self, text: &str) -> String {
        if self.color {
            text.dimmed().to_string()
        } else {
            text.to_string()
        }
    }

    fn graded(&self, text: &str, gap: f64) -> String {
        if !self.color {
            return text.to_string();
        }
        if gap < 5.0 {
            text.green().to_string()
        } else if gap < 10.0 {
            text.cyan().to_string()
        } else if gap < 20.0 {
            text.yellow().to_string()
        } else {
            text.red().to_string()
        }
    }

    fn render(&self, bundle: &AnalysisBundle) -> String {
        let mut out = String::new();
        // Writing into a String cannot fail
        let _ = self.write_dashboard(&mut out, bundle);
        out
    }

    fn write_dashboard(&self, out: &mut String, bundle: &AnalysisBundle) -> fmt::Result {
        writeln!(out)?;
        writeln!(out, "{}", SEP)?;
        writeln!(out, "{}", self.title("  mactop Usage Report"))?;
        writeln!(out, "  Period:   {}", bundle.covered_range)?;
        writeln!(out, "  Records:  {}", bundle.total_records)?;
        writeln!(out, "{}", SEP)?;

        self.write_statistics(out, bundle)?;
        self.write_sufficiency(out, bundle)?;
        self.write_peaks(out, bundle)?;
        for metric in &bundle.metrics {
            self.write_heatmap(out, metric, bundle.heatmap(metric))?;
        }

        if !bundle.unavailable.is_empty() {
            writeln!(out)?;
            writeln!(
                out,
                "  {} {}",
                self.missing("Some metrics unavailable:"),
                bundle.unavailable.join(", ")
            )?;
        }
        writeln!(out, "{}", SEP)
    }

    /// `N/A` right-aligned to `width`, padded before any escape codes are added
    fn not_available(&self, width: usize) -> String {
        self.missing(&format!("{:>width$}", NOT_AVAILABLE, width = width))
    }

    /// Primary metrics first, then the derived-metric inputs
    fn ordered_metrics<'a>(&self, bundle: &'a AnalysisBundle) -> Vec<&'a str> {
        let mut names: Vec<&str> = bundle.metrics.iter().map(String::as_str).collect();
        for name in bundle.statistics.keys() {
            if !names.contains(&name.as_str()) {
                names.push(name);
            }
        }
        names
    }

    fn write_statistics(&self, out: &mut String, bundle: &AnalysisBundle) -> fmt::Result {
        writeln!(out)?;
        writeln!(out, "{}", self.section("[STATISTICS]"))?;
        writeln!(
            out,
            "  {:<22}{:>9}{:>9}{:>9}{:>9}{:>9}{:>9}{:>9}",
            "Metric", "Min", "Mean", "Median", "P75", "P95", "Max", "StdDev"
        )?;
        writeln!(out, "{}", THIN_SEP)?;

        for metric in self.ordered_metrics(bundle) {
            let row = match bundle.summary(metric) {
                Some(summary) => stats_row(metric, summary),
                None => self.not_available(9),
            };
            writeln!(out, "  {:<22}{}", display_name(metric), row)?;
        }
        Ok(())
    }

    fn write_sufficiency(&self, out: &mut String, bundle: &AnalysisBundle) -> fmt::Result {
        writeln!(out)?;
        writeln!(out, "{}", self.section("[SUFFICIENCY]  p95 - p75 gap"))?;
        for metric in &bundle.metrics {
            let row = match bundle.score(metric) {
                Some(gap) => format!(
                    "{:>8.1}  {}",
                    gap,
                    self.graded(sufficiency_label(gap), gap)
                ),
                None => self.not_available(8),
            };
            writeln!(out, "  {:<22}{}", display_name(metric), row)?;
        }
        Ok(())
    }

    fn write_peaks(&self, out: &mut String, bundle: &AnalysisBundle) -> fmt::Result {
        let multi_day = bundle.covered_range.start != bundle.covered_range.end;
        writeln!(out)?;
        writeln!(out, "{}", self.section("[PEAK WINDOWS]"))?;
        for metric in &bundle.metrics {
            let row = match bundle.peak(metric) {
                Some(peak) => peak_line(metric, peak, multi_day),
                None => self.missing(NOT_AVAILABLE),
            };
            writeln!(out, "  {:<22}{}", display_name(metric), row)?;
        }
        Ok(())
    }

    fn write_heatmap(&self, out: &mut String, metric: &str, grid: Option<&HeatmapGrid>) -> fmt::Result {
        writeln!(out)?;
        writeln!(
            out,
            "{}",
            self.section(&format!("[HEATMAP] {}", display_name(metric)))
        )?;
        let Some(grid) = grid else {
            return writeln!(out, "  {}", self.missing("No data"));
        };
        out.push_str(&heatmap_rows(grid));
        if let Some((lo, hi)) = grid.value_range() {
            writeln!(
                out,
                "       '{}' = {}   '{}' = {}   blank = no data",
                SHADES[0] as char,
                format_value(metric, lo),
                SHADES[SHADES.len() - 1] as char,
                format_value(metric, hi)
            )?;
        }
        Ok(())
    }
}

fn stats_row(metric: &str, summary: &StatsSummary) -> String {
    [
        summary.min,
        summary.mean,
        summary.median,
        summary.p75,
        summary.p95,
        summary.max,
        summary.std_dev,
    ]
    .iter()
    .map(|v| format!("{:>9}", format_value(metric, *v)))
    .collect()
}

fn peak_line(metric: &str, peak: &PeakWindow, with_date: bool) -> String {
    let time = |ts: &NaiveDateTime| {
        if with_date {
            ts.format("%Y-%m-%d %H:%M").to_string()
        } else {
            ts.format("%H:%M").to_string()
        }
    };
    format!(
        "{} - {} (avg {}, max {})",
        time(&peak.start),
        peak.end.format("%H:%M"),
        format_value(metric, peak.average),
        format_value(metric, peak.max)
    )
}

/// Hour header plus one row per weekday
fn heatmap_rows(grid: &HeatmapGrid) -> String {
    let mut out = String::from("       ");
    for hour in 0..HOURS_PER_DAY {
        out.push_str(&format!("{:02} ", hour));
    }
    out.push('\n');

    let (lo, hi) = grid.value_range().unwrap_or((0.0, 0.0));
    for day in 0..DAYS_PER_WEEK {
        out.push_str("  ");
        out.push_str(DAY_NAMES[day as usize]);
        out.push_str("  ");
        for hour in 0..HOURS_PER_DAY {
            let cell = grid.get(day, hour).map_or(' ', |v| shade(v, lo, hi));
            out.push(' ');
            out.push(cell);
            out.push(' ');
        }
        out.push('\n');
    }
    out
}
