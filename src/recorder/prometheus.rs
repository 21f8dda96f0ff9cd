//! Prometheus text parsing for the mactop endpoint

use std::collections::BTreeMap;

use crate::core::sample::{
    CPU_USAGE_PERCENT, GPU_FREQ_MHZ, GPU_USAGE_PERCENT, MEMORY_SWAP_TOTAL, MEMORY_SWAP_USED,
    MEMORY_TOTAL, MEMORY_USED, POWER_CPU, POWER_GPU, POWER_TOTAL,
};

/// Parse exposition text into raw field values.
///
/// mactop's metric names are mapped onto the CSV column names; other
/// unlabeled metrics keep their own name. Lines that do not parse are skipped.
pub fn parse_metrics(text: &str) -> BTreeMap<String, f64> {
    let mut results = BTreeMap::new();

    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let Some((name, labels, value)) = split_line(line) else {
            continue;
        };

        match labels {
            None => {
                let field = match name {
                    "mactop_cpu_usage_percent" => CPU_USAGE_PERCENT,
                    "mactop_gpu_usage_percent" => GPU_USAGE_PERCENT,
                    "mactop_gpu_freq_mhz" => GPU_FREQ_MHZ,
                    other => other,
                };
                results.insert(field.to_string(), value);
            }
            Some(labels) => {
                for (key, label) in parse_labels(labels) {
                    let field = match (name, key, label) {
                        ("mactop_memory_gb", "type", "total") => MEMORY_TOTAL,
                        ("mactop_memory_gb", "type", "used") => MEMORY_USED,
                        ("mactop_memory_gb", "type", "swap_total") => MEMORY_SWAP_TOTAL,
                        ("mactop_memory_gb", "type", "swap_used") => MEMORY_SWAP_USED,
                        ("mactop_power_watts", "component", "cpu") => POWER_CPU,
                        ("mactop_power_watts", "component", "gpu") => POWER_GPU,
                        ("mactop_power_watts", "component", "total") => POWER_TOTAL,
                        _ => continue,
                    };
                    results.insert(field.to_string(), value);
                }
            }
        }
    }

    results
}

/// `name{labels} value [timestamp]` or `name value [timestamp]`
fn split_line(line: &str) -> Option<(&str, Option<&str>, f64)> {
    let (name, labels, rest) = match line.find('{') {
        Some(open) => {
            let close = open + line[open..].find('}')?;
            (&line[..open], Some(&line[open + 1..close]), &line[close + 1..])
        }
        None => {
            let split = line.find(char::is_whitespace)?;
            (&line[..split], None, &line[split..])
        }
    };

    let name = name.trim();
    if name.is_empty() || !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == ':')
    {
        return None;
    }
    let value: f64 = rest.split_whitespace().next()?.parse().ok()?;
    if !value.is_finite() {
        return None;
    }
    Some((name, labels, value))
}

fn parse_labels(labels: &str) -> impl Iterator<Item = (&str, &str)> {
    labels.split(',').filter_map(|part| {
        let (key, value) = part.split_once('=')?;
        Some((key.trim(), value.trim().trim_matches('"')))
    })
}
