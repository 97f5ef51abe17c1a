//! QLC Cue CLI Tool
//!
//! Command-line interface for turning cue sheets into QLC+ workspace XML.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use qlccue_compiler::{
    compile_cue_list, compile_show, CompilerConfig, Error, Fragment, LoftyProbe, SheetFormat,
};
use qlccue_core::{FadeLabel, RunContext};
use std::fs::File;
use std::io::{self, BufReader, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "qlccue")]
#[command(about = "Compile cue sheets into QLC+ show and cue-list XML")]
#[command(version)]
struct Cli {
    /// Log compiled rows to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build a timed show from a cue sheet
    Show {
        /// QLC+ workspace (.qxw) file
        #[arg(long)]
        qlc_file: PathBuf,

        /// Cue sheet (.csv, or .tsv/.txt for descriptions)
        #[arg(long)]
        cue_file: PathBuf,

        /// Directory the workspace's audio paths are relative to
        #[arg(long)]
        audio_root: PathBuf,

        /// Show name (defaults to the cue file name without extension)
        #[arg(long)]
        show_name: Option<String>,

        /// Cue sheet layout (defaults to guessing from the extension)
        #[arg(long, value_enum)]
        format: Option<FormatArg>,

        /// Also print the fragment on a single line
        #[arg(long)]
        compact: bool,
    },

    /// Build a master cue-list chaser from a cue sheet
    CueList {
        /// QLC+ workspace (.qxw) file
        #[arg(long)]
        qlc_file: PathBuf,

        /// Cue sheet (.csv)
        #[arg(long)]
        cue_file: PathBuf,

        /// Fade out of the last cue
        #[arg(long, default_value = "SLOW")]
        final_fade: FadeLabel,

        /// Also print the fragment on a single line
        #[arg(long)]
        compact: bool,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum FormatArg {
    /// timecode, fadeIn, fadeOut, functionType, functionName, duration
    Structured,
    /// description, start, duration (tab separated)
    Description,
}

impl From<FormatArg> for SheetFormat {
    fn from(format: FormatArg) -> Self {
        match format {
            FormatArg::Structured => SheetFormat::Structured,
            FormatArg::Description => SheetFormat::Description,
        }
    }
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    run(cli, &mut io::stdout().lock(), &mut io::stderr().lock())
}

fn init_tracing(verbose: bool) {
    let default_filter = if verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_filter)),
        )
        .with_writer(std::io::stderr)
        .init();
}

/// Runs one command. The fragment goes to `out`; row errors go to `err`,
/// one per line, and nothing is written to `out` when any row failed.
fn run<W: Write, E: Write>(cli: Cli, out: &mut W, err: &mut E) -> Result<ExitCode> {
    let result = match cli.command {
        Commands::Show {
            qlc_file,
            cue_file,
            audio_root,
            show_name,
            format,
            compact,
        } => {
            let config = CompilerConfig {
                audio_root,
                ..Default::default()
            };
            let format = format.map_or_else(|| SheetFormat::from_path(&cue_file), Into::into);
            build_show(&qlc_file, &cue_file, show_name, &config, format)
                .map(|fragment| (fragment, compact))
        }

        Commands::CueList {
            qlc_file,
            cue_file,
            final_fade,
            compact,
        } => {
            let config = CompilerConfig {
                final_fade,
                ..Default::default()
            };
            build_cue_list(&qlc_file, &cue_file, &config).map(|fragment| (fragment, compact))
        }
    };

    match result {
        Ok((fragment, compact)) => {
            write_fragment(out, &fragment, compact)?;
            Ok(ExitCode::SUCCESS)
        }
        Err(error) => match error.downcast::<Error>() {
            Ok(Error::Rows(errors)) => {
                for error in &errors {
                    writeln!(err, "ERROR: {}", error)?;
                }
                writeln!(err, "{} row(s) failed, no XML generated", errors.len())?;
                Ok(ExitCode::FAILURE)
            }
            Ok(other) => Err(other.into()),
            Err(error) => Err(error),
        },
    }
}

fn build_show(
    qlc_file: &Path,
    cue_file: &Path,
    show_name: Option<String>,
    config: &CompilerConfig,
    format: SheetFormat,
) -> Result<Fragment> {
    let mut context = open_workspace(qlc_file)?;

    let show_name = match show_name {
        Some(name) => name,
        None => cue_file
            .file_stem()
            .and_then(|stem| stem.to_str())
            .context("Cue file name is not valid UTF-8")?
            .to_string(),
    };

    tracing::info!(show = %show_name, cue_file = %cue_file.display(), "Compiling show");

    let cues = open_cue_file(cue_file)?;
    let fragment = compile_show(&mut context, config, &show_name, cues, format, &LoftyProbe)?;
    Ok(fragment)
}

fn build_cue_list(qlc_file: &Path, cue_file: &Path, config: &CompilerConfig) -> Result<Fragment> {
    let mut context = open_workspace(qlc_file)?;

    tracing::info!(cue_file = %cue_file.display(), "Compiling cue list");

    let cues = open_cue_file(cue_file)?;
    let fragment = compile_cue_list(&mut context, config, cues)?;
    Ok(fragment)
}

fn open_workspace(path: &Path) -> Result<RunContext> {
    RunContext::open(path)
        .with_context(|| format!("Failed to read QLC+ workspace {}", path.display()))
}

fn open_cue_file(path: &Path) -> Result<BufReader<File>> {
    let file = File::open(path)
        .with_context(|| format!("Unable to open cue file {}", path.display()))?;
    Ok(BufReader::new(file))
}

fn write_fragment<W: Write>(out: &mut W, fragment: &Fragment, compact: bool) -> Result<()> {
    writeln!(out, "{}", fragment.to_pretty().context("Failed to render XML")?)?;

    if compact {
        writeln!(out)?;
        writeln!(out, "{}", fragment.to_compact().context("Failed to render XML")?)?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const WORKSPACE: &str = r#"<Workspace><Engine>
        <Function ID="1" Type="Scene" Name="Blue Wash"/>
        <Function ID="2" Type="Chaser" Name="Sparkle"><RunOrder>Loop</RunOrder></Function>
        <Function ID="3" Type="Audio" Name="finale"><Source>finale.mp3</Source></Function>
    </Engine></Workspace>"#;

    fn write_files(sheet_name: &str, sheet: &str) -> (TempDir, PathBuf, PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let qlc_file = dir.path().join("show.qxw");
        let cue_file = dir.path().join(sheet_name);
        std::fs::write(&qlc_file, WORKSPACE).unwrap();
        std::fs::write(&cue_file, sheet).unwrap();
        (dir, qlc_file, cue_file)
    }

    fn run_args(args: &[&str]) -> (ExitCode, String, String) {
        let cli = Cli::try_parse_from(args.iter().copied()).unwrap();
        let mut out = Vec::new();
        let mut err = Vec::new();
        let code = run(cli, &mut out, &mut err).unwrap();
        (
            code,
            String::from_utf8(out).unwrap(),
            String::from_utf8(err).unwrap(),
        )
    }

    #[test]
    fn test_row_errors_fail_without_output() {
        let (dir, qlc_file, cue_file) = write_files(
            "finale.csv",
            "Timecode,Fade In,Fade Out,Type,Name,Duration\n\
             00:00.000,FAST,NONE,Scene,Blue Wash,00:05.000\n\
             00:02.000,NONE,NONE,Scene,Blue Wash,\n",
        );

        let (code, out, err) = run_args(&[
            "qlccue",
            "show",
            "--qlc-file",
            qlc_file.to_str().unwrap(),
            "--cue-file",
            cue_file.to_str().unwrap(),
            "--audio-root",
            dir.path().to_str().unwrap(),
        ]);

        assert_eq!(code, ExitCode::FAILURE);
        assert!(out.is_empty(), "{out}");
        let lines: Vec<&str> = err.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("ERROR: line 2: Fade 'FAST'"), "{}", lines[0]);
        assert!(lines[1].starts_with("ERROR: line 3: Function 'Blue Wash'"), "{}", lines[1]);
        assert_eq!(lines[2], "2 row(s) failed, no XML generated");
    }

    #[test]
    fn test_cue_list_prints_fragment() {
        let (_dir, qlc_file, cue_file) = write_files(
            "cues.csv",
            "Cue,Fade,Type 1,Name 1,Type 2,Name 2\n\
             Open,QUICK,Scene,Blue Wash,Chaser,Sparkle\n",
        );

        let (code, out, err) = run_args(&[
            "qlccue",
            "cue-list",
            "--qlc-file",
            qlc_file.to_str().unwrap(),
            "--cue-file",
            cue_file.to_str().unwrap(),
            "--final-fade",
            "long",
            "--compact",
        ]);

        assert_eq!(code, ExitCode::SUCCESS);
        assert!(err.is_empty(), "{err}");
        assert!(out.contains("Blue Wash / Sparkle (Auto Generated)"));
        assert!(out.contains("FadeOut=\"5000\""));
        // Pretty rendering, a blank line, then the compact rendering
        assert_eq!(out.matches("Master Cue List (Auto Generated)").count(), 2);
    }

    #[test]
    fn test_missing_workspace_is_an_error() {
        let (dir, _qlc_file, cue_file) = write_files("cues.csv", "Cue,Fade,Type 1,Name 1\n");
        let cli = Cli::try_parse_from([
            "qlccue",
            "cue-list",
            "--qlc-file",
            dir.path().join("missing.qxw").to_str().unwrap(),
            "--cue-file",
            cue_file.to_str().unwrap(),
        ])
        .unwrap();

        let mut out = Vec::new();
        let mut err = Vec::new();
        let error = run(cli, &mut out, &mut err).unwrap_err();
        assert!(error.to_string().contains("Failed to read QLC+ workspace"));
        assert!(out.is_empty());
    }
}
