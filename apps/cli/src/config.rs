// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Analysis configuration loaded from environment variables.
//!
//! Command-line options override these values.

use ifc_lite_ventilation::{AnalysisSettings, NamingConvention, VentilationCategory};

/// CLI configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Ventilation category (I-IV).
    pub category: VentilationCategory,
    /// System-name marker of supply systems.
    pub supply_marker: String,
    /// System-name marker of return systems.
    pub return_marker: String,
    /// Padding added to the top of every space when placing terminals (m).
    pub vertical_tolerance: f64,
    /// Directory receiving the analysed snapshots and the report.
    pub output_dir: String,
    /// Write results back onto the model snapshots.
    pub write_back: bool,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        Self {
            category: VentilationCategory::parse_or_default(
                &std::env::var("VENTILATION_CATEGORY").unwrap_or_else(|_| "II".into()),
            ),
            supply_marker: std::env::var("SUPPLY_MARKER").unwrap_or_else(|_| "VI".into()),
            return_marker: std::env::var("RETURN_MARKER").unwrap_or_else(|_| "VU".into()),
            vertical_tolerance: std::env::var("SPACE_VERTICAL_TOLERANCE")
                .unwrap_or_else(|_| "0.5".into())
                .parse()
                .unwrap_or(0.5),
            output_dir: std::env::var("OUTPUT_DIR")
                .unwrap_or_else(|_| "./ventilation-output".into()),
            write_back: std::env::var("WRITE_BACK")
                .map(|v| parse_flag(&v).unwrap_or(true))
                .unwrap_or(true),
        }
    }

    /// Analysis settings for this configuration
    pub fn settings(&self) -> AnalysisSettings {
        let mut settings = AnalysisSettings::default().with_category(self.category);
        settings.naming =
            NamingConvention::new(self.supply_marker.as_str(), self.return_marker.as_str());
        settings.clash.vertical_tolerance = self.vertical_tolerance;
        settings
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env()
    }
}

/// Parse a boolean environment flag
fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
