//! Terminal rendering of analysis results

pub mod dashboard;

pub use dashboard::{display_name, render_dashboard, render_plain, sufficiency_label};
