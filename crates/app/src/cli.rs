use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use bathy_core::{BatchPolicy, FilterConfig, FilterRun, ProgressEvent, ProgressSink, Survey};
use serde::Deserialize;

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub(crate) struct RunConfig {
    pub filter: FilterConfig,
    pub batch: BatchPolicy,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct CliArgs {
    pub survey_path: PathBuf,
    pub output_path: Option<PathBuf>,
    pub config_path: Option<PathBuf>,
    pub sigma: Option<f64>,
    pub deep: bool,
    pub page_size: Option<usize>,
    pub max_gap: Option<f64>,
    pub verbose: bool,
    pub quiet: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Command {
    Run(CliArgs),
    Help,
}

pub(crate) fn usage() -> &'static str {
    "USAGE: bathyfilter [--std STD] [--deep] [--config PATH] [--page-size N] [--max-gap M]\n\
     \x20                  [--output PATH] [--verbose | --quiet] SURVEY_FILE\n\n\
     Where:\n\
     \tSURVEY_FILE = Path to the survey (JSON).\n\
     \tSTD = Number of standard deviations to filter, 1.0 to 10.0 (default = 2.0)\n\
     \t--deep, -d = Filter only in the downward (deep) direction\n\
     \t--config = JSON file with optional \"filter\" and \"batch\" sections\n\
     \t--page-size = Pings per batch (default = 1000)\n\
     \t--max-gap = Track gap in meters that closes a batch (default = 1000)\n\
     \t--output = Write the edited survey here instead of over SURVEY_FILE\n"
}

fn next_value<'a, I>(iter: &mut I, flag: &str) -> Result<&'a String, String>
where
    I: Iterator<Item = &'a String>,
{
    iter.next().ok_or_else(|| format!("{flag} requires a value"))
}

/// Parses the arguments after the program name.
pub(crate) fn parse_args(args: &[String]) -> Result<Command, String> {
    let mut parsed = CliArgs::default();
    let mut survey_path = None;
    let mut iter = args.iter();

    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--std" => {
                let value = next_value(&mut iter, "--std")?;
                // Unparseable values fall back to the default like out-of-range ones.
                parsed.sigma = Some(value.parse().unwrap_or(f64::NAN));
            }
            "--deep" | "-d" => parsed.deep = true,
            "--config" => {
                parsed.config_path = Some(PathBuf::from(next_value(&mut iter, "--config")?));
            }
            "--output" | "-o" => {
                parsed.output_path = Some(PathBuf::from(next_value(&mut iter, "--output")?));
            }
            "--page-size" => {
                let value = next_value(&mut iter, "--page-size")?;
                let size: usize = value
                    .parse()
                    .map_err(|_| format!("invalid page size {value}"))?;
                if size == 0 {
                    return Err("page size must be at least 1".to_string());
                }
                parsed.page_size = Some(size);
            }
            "--max-gap" => {
                let value = next_value(&mut iter, "--max-gap")?;
                let gap: f64 = value
                    .parse()
                    .map_err(|_| format!("invalid max gap {value}"))?;
                parsed.max_gap = Some(gap);
            }
            "--verbose" | "-v" => parsed.verbose = true,
            "--quiet" | "-q" => parsed.quiet = true,
            "--help" | "-h" => return Ok(Command::Help),
            other if other.starts_with('-') => return Err(format!("unknown option {other}")),
            other => {
                if survey_path.is_some() {
                    return Err(format!("unexpected argument {other}"));
                }
                survey_path = Some(PathBuf::from(other));
            }
        }
    }

    parsed.survey_path = survey_path.ok_or_else(|| "missing SURVEY_FILE".to_string())?;
    Ok(Command::Run(parsed))
}

pub(crate) fn load_config(path: &Path) -> Result<RunConfig, String> {
    let data = std::fs::read(path).map_err(|err| format!("{}: {err}", path.display()))?;
    serde_json::from_slice(&data).map_err(|err| format!("{}: {err}", path.display()))
}

/// Command-line values override the config file.
pub(crate) fn resolve_config(args: &CliArgs, base: RunConfig) -> RunConfig {
    let mut config = base;
    if let Some(sigma) = args.sigma {
        config.filter.sigma_mult = sigma;
    }
    if args.deep {
        config.filter.deep_only = true;
    }
    if let Some(page_size) = args.page_size {
        config.batch.page_size = page_size;
    }
    if let Some(max_gap) = args.max_gap {
        config.batch.max_gap_m = max_gap;
    }
    config.filter = config.filter.normalized();
    config
}

fn percent_printer() -> ProgressSink {
    let last = Arc::new(std::sync::atomic::AtomicI32::new(-1));
    Arc::new(move |event| {
        let percent = match event {
            ProgressEvent::Start { .. } => return,
            ProgressEvent::Advance { fraction } => (fraction * 100.0).round() as i32,
            ProgressEvent::Finish => {
                println!();
                return;
            }
        };
        if last.swap(percent, std::sync::atomic::Ordering::Relaxed) != percent {
            print!("{percent:3}% processed    \r");
            let _ = std::io::stdout().flush();
        }
    })
}

pub(crate) fn run(args: &CliArgs) -> Result<(), String> {
    let base = match &args.config_path {
        Some(path) => load_config(path)?,
        None => RunConfig::default(),
    };
    let config = resolve_config(args, base);

    let mut survey = Survey::load(&args.survey_path)
        .map_err(|err| format!("{}: {err}", args.survey_path.display()))?;
    tracing::info!(
        "file {} ({} pings), std {:.1}, deep only {}",
        args.survey_path.display(),
        survey.pings.len(),
        config.filter.sigma_mult,
        config.filter.deep_only
    );

    let mut filter_run = FilterRun::new(config.filter, config.batch).with_history(
        env!("CARGO_PKG_NAME"),
        &args.survey_path.display().to_string(),
    );
    if !args.quiet {
        filter_run = filter_run.with_progress(percent_printer());
    }
    let report = filter_run.run(&mut survey);

    let output = args.output_path.as_ref().unwrap_or(&args.survey_path);
    survey
        .save(output)
        .map_err(|err| format!("{}: {err}", output.display()))?;
    tracing::info!(
        "wrote {} ({} soundings flagged, {} batches skipped)",
        output.display(),
        report.soundings_flagged,
        report.batches_skipped
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use bathy_core::{Beam, BeamFlags, Ping, Survey, DEFAULT_SIGMA_MULT};

    use super::{parse_args, resolve_config, run, CliArgs, Command, RunConfig};

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|arg| arg.to_string()).collect()
    }

    fn parsed(list: &[&str]) -> CliArgs {
        match parse_args(&args(list)).unwrap() {
            Command::Run(parsed) => parsed,
            Command::Help => panic!("unexpected help"),
        }
    }

    #[test]
    fn parses_filter_options() {
        let cli = parsed(&["--std", "3.5", "-d", "--page-size", "200", "line.json"]);
        assert_eq!(cli.survey_path, PathBuf::from("line.json"));
        assert_eq!(cli.sigma, Some(3.5));
        assert!(cli.deep);
        assert_eq!(cli.page_size, Some(200));
        assert!(cli.output_path.is_none());
    }

    #[test]
    fn rejects_bad_arguments() {
        assert!(parse_args(&args(&[])).is_err());
        assert!(parse_args(&args(&["--bogus", "a.json"])).is_err());
        assert!(parse_args(&args(&["a.json", "b.json"])).is_err());
        assert!(parse_args(&args(&["--std"])).is_err());
        assert!(parse_args(&args(&["--page-size", "0", "a.json"])).is_err());
        assert_eq!(parse_args(&args(&["-h"])), Ok(Command::Help));
    }

    #[test]
    fn out_of_range_sigma_falls_back_to_default() {
        for value in ["0.5", "11", "abc"] {
            let cli = parsed(&["--std", value, "a.json"]);
            let config = resolve_config(&cli, RunConfig::default());
            assert_eq!(config.filter.sigma_mult, DEFAULT_SIGMA_MULT, "{value}");
        }
    }

    #[test]
    fn command_line_overrides_config_file() {
        let base: RunConfig = serde_json::from_str(
            r#"{"filter": {"sigma_mult": 4.0}, "batch": {"page_size": 50, "max_gap_m": 250.0}}"#,
        )
        .unwrap();
        let cli = parsed(&["--max-gap", "75", "--deep", "a.json"]);
        let config = resolve_config(&cli, base);
        assert_eq!(config.filter.sigma_mult, 4.0);
        assert!(config.filter.deep_only);
        assert_eq!(config.batch.page_size, 50);
        assert_eq!(config.batch.max_gap_m, 75.0);
    }

    #[test]
    fn run_edits_survey_file() {
        let dir = std::env::temp_dir().join(format!("bathyfilter-cli-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let input = dir.join("line.json");
        let output = dir.join("line_filtered.json");

        // Roughly 2 m between pings and beams, so each 7 m cell holds several
        // soundings with a few centimeters of noise.
        let pings = (0..8)
            .map(|row| Ping {
                latitude: 41.0 + row as f64 * 0.00002,
                longitude: -70.0,
                heading: 0.0,
                ignore: false,
                beams: (0..12)
                    .map(|i| Beam {
                        depth: if row == 4 && i == 6 {
                            160.0
                        } else {
                            100.0 + (((i * 7 + row * 3) % 5) as f64 - 2.0) * 0.1
                        },
                        across_track: i as f64 * 1.9,
                        ..Beam::default()
                    })
                    .collect(),
            })
            .collect();
        Survey::new(pings).save(&input).unwrap();

        let cli = CliArgs {
            survey_path: input.clone(),
            output_path: Some(output.clone()),
            quiet: true,
            ..CliArgs::default()
        };
        run(&cli).unwrap();

        let edited = Survey::load(&output).unwrap();
        assert_eq!(edited.history.len(), 1);
        assert!(edited.history[0].command_line.ends_with("line.json"));
        assert!(edited.pings[4].beams[6]
            .flags
            .contains(BeamFlags::FILTER_EDITED));
        assert_eq!(edited.filter_edited_count(), 1);
        // The input is untouched when an output path is given.
        assert_eq!(Survey::load(&input).unwrap().filter_edited_count(), 0);

        let _ = std::fs::remove_dir_all(&dir);
    }
}
