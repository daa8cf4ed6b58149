//! `robot-desc`: inspect SDF robot descriptions and convert them to URDF.
//!
//! # Usage
//!
//! - `robot-desc -f arm.sdf` - Print links, joints and frames with world poses
//! - `robot-desc -f arm.sdf -o arm.urdf` - Convert to URDF
//! - `robot-desc -f arm.urdf -o arm.sdf` - Import URDF and write SDF
//!
//! The input is validated before anything else happens. Validation errors are
//! printed with their element paths and the process exits with status 1.
//!
//! Logging goes to stderr and is controlled by `ROBOT_DESC_LOG` (standard
//! `EnvFilter` syntax, default `warn`, or `debug` with `--verbose`).

mod show;

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result, bail};
use clap::Parser;
use robot_sdf::{Document, load_sdf_file, save_sdf_file, validate};
use robot_urdf::{ExportOptions, export_model, load_urdf_file, save_urdf_file, select_model, urdf_to_sdf};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

/// Environment variable holding the log filter.
const LOG_ENV: &str = "ROBOT_DESC_LOG";

/// Inspect SDF robot descriptions and convert them to URDF
#[derive(Parser, Debug)]
#[command(name = "robot-desc")]
#[command(about = "Inspect SDF robot descriptions and convert them to URDF", long_about = None)]
#[command(version)]
struct Cli {
    /// Input file (`.urdf` is imported, anything else is read as SDF)
    #[arg(short = 'f', long = "file", value_name = "FILE")]
    file: PathBuf,

    /// Print the resolved model (default when no output is given)
    #[arg(long)]
    show: bool,

    /// Output file; `.urdf` exports, `.sdf` re-encodes the document
    #[arg(short, long, value_name = "OUT")]
    output: Option<PathBuf>,

    /// Model to export (defaults to the first model)
    #[arg(long, value_name = "NAME")]
    model: Option<String>,

    /// Keep every fixed joint instead of lumping
    #[arg(long)]
    preserve_fixed_joints: bool,

    /// Keep this fixed joint (repeatable)
    #[arg(long = "keep-fixed", value_name = "JOINT")]
    keep_fixed: Vec<String>,

    /// Root the URDF tree at this link
    #[arg(long, value_name = "LINK")]
    root: Option<String>,

    /// Round output poses to N decimal places
    #[arg(long, value_name = "N")]
    precision: Option<u32>,

    /// Do not emit explicit frames as links
    #[arg(long)]
    no_frames: bool,

    /// Debug logging
    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    fn export_options(&self) -> ExportOptions {
        let mut options = ExportOptions::default()
            .with_preserve_fixed_joints(self.preserve_fixed_joints)
            .with_frames_as_links(!self.no_frames);
        for joint in &self.keep_fixed {
            options = options.with_preserved_joint(joint.as_str());
        }
        if let Some(root) = &self.root {
            options = options.with_root_hint(root.as_str());
        }
        if let Some(digits) = self.precision {
            options = options.with_pose_precision(digits);
        }
        options
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run(cli: &Cli) -> Result<()> {
    let doc = load(&cli.file)?;

    let report = validate(&doc);
    for (path, violations) in report.warnings() {
        for violation in violations {
            eprintln!("warning: {path}: {violation}");
        }
    }
    if !report.is_valid() {
        for (path, violations) in report.errors() {
            for violation in violations {
                eprintln!("{path}: {violation}");
            }
        }
        bail!(
            "{} failed validation with {} error(s)",
            cli.file.display(),
            report.error_count()
        );
    }
    debug!(file = %cli.file.display(), "validated");

    if cli.show || cli.output.is_none() {
        print!("{}", show::render(&doc)?);
    }
    if let Some(output) = &cli.output {
        write_output(cli, &doc, output)?;
    }
    Ok(())
}

fn has_extension(path: &Path, ext: &str) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case(ext))
}

fn load(path: &Path) -> Result<Document> {
    if has_extension(path, "urdf") {
        let robot = load_urdf_file(path)
            .with_context(|| format!("failed to read URDF {}", path.display()))?;
        info!(robot = %robot.name, "importing URDF");
        urdf_to_sdf(&robot).with_context(|| format!("failed to import {}", path.display()))
    } else {
        load_sdf_file(path).with_context(|| format!("failed to read SDF {}", path.display()))
    }
}

fn write_output(cli: &Cli, doc: &Document, output: &Path) -> Result<()> {
    if has_extension(output, "urdf") {
        let model = select_model(doc, cli.model.as_deref())?;
        let robot = export_model(doc, model, &cli.export_options())
            .with_context(|| format!("failed to export model {}", model.name))?;
        save_urdf_file(&robot, output)
            .with_context(|| format!("failed to write {}", output.display()))?;
        info!(robot = %robot.name, links = robot.links.len(), out = %output.display(), "wrote URDF");
    } else if has_extension(output, "sdf") {
        save_sdf_file(doc, output).with_context(|| format!("failed to write {}", output.display()))?;
    } else {
        bail!(
            "cannot tell the output format of {}; use .urdf or .sdf",
            output.display()
        );
    }
    Ok(())
}
