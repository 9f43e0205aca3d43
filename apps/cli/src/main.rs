// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! IFC-Lite Ventilation - ventilation analysis of model snapshots.
//!
//! Reads an MEP snapshot (and optionally a separate architectural snapshot),
//! prints the analysis tables, writes the analysed snapshots with their new
//! property sets and a `report.json` into the output directory.
//!
//! Usage:
//!   ifc-lite-ventilation <mep.json> [arch.json] [options]

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use ifc_lite_hvac_model::ModelSnapshot;
use ifc_lite_ventilation::report::{
    air_flow_table, pairing_table, space_terminal_table, system_rows, system_table,
};
use ifc_lite_ventilation::{TreeProperty, VentilationAnalyzer, VentilationCategory};

mod config;

use config::Config;

/// Parsed command line
#[derive(Debug)]
struct Args {
    mep: PathBuf,
    arch: Option<PathBuf>,
    show_tree: Option<TreeProperty>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()))
        .init();

    let mut config = Config::from_env();
    let Some(args) = parse_args(env::args().skip(1).collect(), &mut config)? else {
        print_usage();
        return Ok(());
    };

    tracing::info!(
        mep = %args.mep.display(),
        arch = ?args.arch.as_ref().map(|p| p.display().to_string()),
        category = %config.category,
        output_dir = %config.output_dir,
        write_back = config.write_back,
        "Starting ventilation analysis"
    );

    let mut mep = load(&args.mep)?;
    let mut arch = args.arch.as_deref().map(load).transpose()?;

    let analyzer = VentilationAnalyzer::new(config.settings());
    let report = analyzer.run(&mep, arch.as_ref().unwrap_or(&mep));

    println!("{}", system_table(&system_rows(&report.classification)));
    println!("{}", pairing_table(&report.classification.pairings));
    println!("{}", space_terminal_table(&report.terminals));
    println!("{}", air_flow_table(&report.space_flows));

    if let Some(property) = args.show_tree {
        println!("{}", report.tree.render(property));
    }

    for (system, error) in &report.tree_failures {
        tracing::warn!(system = %system, error = %error, "no tree built");
    }
    for issue in &report.issues {
        tracing::warn!(
            category = %issue.category,
            elements = issue.elements.len(),
            "{}",
            issue.message
        );
    }

    let output_dir = Path::new(&config.output_dir);
    fs::create_dir_all(output_dir)
        .with_context(|| format!("creating output directory {}", output_dir.display()))?;

    let report_path = output_dir.join("report.json");
    fs::write(&report_path, report.to_json()?)
        .with_context(|| format!("writing {}", report_path.display()))?;

    if config.write_back {
        let spaces = match arch.as_mut() {
            Some(arch) => report.commit_space_properties(arch)?,
            None => report.commit_space_properties(&mut mep)?,
        };
        let terminals = report.commit_terminal_properties(&mut mep)?;

        save(&mep, &args.mep, output_dir)?;
        if let (Some(arch), Some(path)) = (arch.as_ref(), args.arch.as_deref()) {
            save(arch, path, output_dir)?;
        }
        tracing::info!(spaces, terminals, "Results written back");
    }

    tracing::info!(
        report = %report_path.display(),
        issues = report.issues.len(),
        "Analysis finished"
    );
    Ok(())
}

/// Parse arguments, applying options onto `config`.
///
/// Returns `None` when usage was requested.
fn parse_args(args: Vec<String>, config: &mut Config) -> Result<Option<Args>> {
    if args.is_empty() || args[0] == "--help" || args[0] == "-h" {
        return Ok(None);
    }

    let mut inputs: Vec<PathBuf> = Vec::new();
    let mut show_tree = None;

    let mut iter = args.into_iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--category" => {
                let value = iter.next().context("--category needs a value")?;
                config.category = VentilationCategory::parse_or_default(&value);
            }
            "--output" => {
                config.output_dir = iter.next().context("--output needs a directory")?;
            }
            "--no-write-back" => {
                config.write_back = false;
            }
            "--show-tree" => {
                let value = iter.next().context("--show-tree needs a property")?;
                show_tree = Some(value.parse::<TreeProperty>().map_err(anyhow::Error::msg)?);
            }
            "--help" | "-h" => return Ok(None),
            other if other.starts_with("--") => bail!("unknown option: {}", other),
            path => inputs.push(PathBuf::from(path)),
        }
    }

    let mut inputs = inputs.into_iter();
    let Some(mep) = inputs.next() else {
        bail!("missing MEP snapshot path");
    };
    let arch = inputs.next();
    if let Some(extra) = inputs.next() {
        bail!("unexpected argument: {}", extra.display());
    }

    Ok(Some(Args { mep, arch, show_tree }))
}

fn load(path: &Path) -> Result<ModelSnapshot> {
    let snapshot = ModelSnapshot::from_path(path)
        .with_context(|| format!("loading snapshot {}", path.display()))?;
    tracing::info!(path = %path.display(), elements = snapshot.element_count(), "Loaded snapshot");
    Ok(snapshot)
}

/// Write `snapshot` as `<stem>_analysed.json` into `dir`
fn save(snapshot: &ModelSnapshot, source: &Path, dir: &Path) -> Result<PathBuf> {
    let stem = source
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("model");
    let path = dir.join(format!("{}_analysed.json", stem));
    snapshot
        .write_to_path(&path)
        .with_context(|| format!("writing {}", path.display()))?;
    Ok(path)
}

fn print_usage() {
    println!("IFC-Lite Ventilation Analysis");
    println!();
    println!("Usage: ifc-lite-ventilation <mep.json> [arch.json] [options]");
    println!();
    println!("Spaces are read from arch.json, or from mep.json when it is omitted.");
    println!();
    println!("Options:");
    println!("  --category <I|II|III|IV>  Ventilation category (default: II)");
    println!("  --output <dir>            Output directory (default: ./ventilation-output)");
    println!("  --no-write-back           Do not write results onto the snapshots");
    println!("  --show-tree <property>    Print the system tree with air_flow,");
    println!("                            element_pressure_loss or path_pressure_loss");
    println!();
    println!("Environment:");
    println!("  VENTILATION_CATEGORY, SUPPLY_MARKER, RETURN_MARKER,");
    println!("  SPACE_VERTICAL_TOLERANCE, OUTPUT_DIR, WRITE_BACK, RUST_LOG");
}
