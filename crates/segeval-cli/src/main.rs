// SPDX-License-Identifier: Apache-2.0
// Copyright © 2025 Au-Zone Technologies. All Rights Reserved.

use clap::{Parser, Subcommand, ValueEnum};
use rayon::prelude::*;
use segeval::{
    CorpusEvaluation, Error, EvalConfig, Evaluator, Progress, RegionReader, RegionSet,
    ReportWriter, Role, RuleName, SweepCurve, parse_sweep,
};
use std::{
    collections::{BTreeMap, BTreeSet},
    path::{Path, PathBuf},
    sync::mpsc,
};
use walkdir::WalkDir;

#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Configuration file providing default settings.  Any format supported
    /// by the config crate (TOML, JSON, YAML, ...) is accepted; SEGEVAL_*
    /// environment variables override the file.
    #[clap(long, short, global = true)]
    config: Option<PathBuf>,

    /// Enable debug logging.
    #[clap(long, short, global = true)]
    debug: bool,

    /// Evaluation Command
    #[command(subcommand)]
    cmd: Command,
}

#[derive(clap::Args, Debug, Clone, PartialEq)]
struct EvalOptions {
    /// Significance threshold in (0, 1].  Repeat to evaluate several
    /// thresholds from a single overlap computation.
    #[clap(long = "threshold", short = 't')]
    thresholds: Vec<f64>,

    /// Threshold sweep given as START:END:STEP, both ends included.
    #[clap(long, conflicts_with = "thresholds")]
    sweep: Option<String>,

    /// Only evaluate regions with this label.  Repeat for several labels.
    #[clap(long = "label", short = 'l')]
    labels: Vec<String>,

    /// Denominator of the overlap ratio.
    #[clap(long, value_enum)]
    rule: Option<RuleArg>,

    /// Share of a region's total overlap a link must hold under the coverage
    /// rule.
    #[clap(long)]
    relative: Option<f64>,

    /// Write a tab-separated report to this file.
    #[clap(long, short)]
    output: Option<PathBuf>,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq)]
enum RuleArg {
    /// Overlap divided by the reference region area.
    Reference,
    /// Overlap divided by the smaller of the two areas.
    Smaller,
    /// Overlap divided by the union area.
    Union,
    /// Margin-relative coverage of either region.
    Coverage,
}

impl From<RuleArg> for RuleName {
    fn from(rule: RuleArg) -> Self {
        match rule {
            RuleArg::Reference => RuleName::Reference,
            RuleArg::Smaller => RuleName::Smaller,
            RuleArg::Union => RuleName::Union,
            RuleArg::Coverage => RuleName::Coverage,
        }
    }
}

#[derive(Subcommand, PartialEq, Clone, Debug)]
enum Command {
    /// Evaluate a test region file against a reference region file.  Both
    /// files may be LabelMe-style shape files, .lif label files, cat_info.xml
    /// box files or COCO instance files; COCO documents are paired by image
    /// name.
    Evaluate {
        /// Reference (ground-truth) region file.
        reference: PathBuf,

        /// Test region file produced by the segmentation under evaluation.
        test: PathBuf,

        #[command(flatten)]
        options: EvalOptions,
    },
    /// Evaluate every document of a test directory against the reference
    /// document of the same name and print the corpus score.  Reference
    /// documents without a test counterpart are scored as entirely missed.
    Batch {
        /// Directory of reference region files.
        reference_dir: PathBuf,

        /// Directory of test region files.
        test_dir: PathBuf,

        #[command(flatten)]
        options: EvalOptions,
    },
}

/// Merge command line options over the configuration file and environment.
fn resolve_settings(
    config: Option<&Path>,
    options: &EvalOptions,
) -> Result<(EvalConfig, Vec<f64>), Error> {
    let mut settings = EvalConfig::load(config)?;
    if !options.labels.is_empty() {
        settings.labels = options.labels.clone();
    }
    if let Some(rule) = options.rule {
        settings.rule = rule.into();
    }
    if let Some(relative) = options.relative {
        settings.relative = relative;
    }

    let thresholds = match &options.sweep {
        Some(range) => parse_sweep(range)?,
        None if !options.thresholds.is_empty() => options.thresholds.clone(),
        None => settings.thresholds.clone(),
    };
    Ok((settings, thresholds))
}

fn is_region_file(path: &Path) -> bool {
    path.extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .is_some_and(|e| matches!(e.as_str(), "json" | "lif" | "xml"))
}

fn region_files(dir: &Path) -> Result<Vec<PathBuf>, Error> {
    let mut files = Vec::new();
    for entry in WalkDir::new(dir).follow_links(true) {
        let entry = entry.map_err(|e| Error::IoError(e.into()))?;
        if entry.file_type().is_file() && is_region_file(entry.path()) {
            files.push(entry.into_path());
        }
    }
    files.sort();
    Ok(files)
}

fn read_all(reader: &RegionReader, files: &[PathBuf], role: Role) -> Result<Vec<RegionSet>, Error> {
    let sets = files
        .par_iter()
        .map(|path| reader.read(path, role))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(sets.into_iter().flatten().collect())
}

/// Fail when two documents of one side share a name.
fn check_unique_names(sets: &[RegionSet], role: Role) -> Result<(), Error> {
    let mut seen = BTreeSet::new();
    let duplicates: BTreeSet<&str> = sets
        .iter()
        .map(RegionSet::document)
        .filter(|name| !seen.insert(*name))
        .collect();
    if duplicates.is_empty() {
        return Ok(());
    }
    Err(Error::InvalidParameters(format!(
        "duplicate {} document names: {}",
        role,
        duplicates.into_iter().collect::<Vec<_>>().join(", ")
    )))
}

/// Pair reference and test documents by name.
///
/// Two single-document inputs are paired whatever their names. Otherwise
/// document names must be unique on each side. A reference document without
/// a test counterpart is paired with an empty test set; a test document
/// without a reference is skipped with a warning.
fn pair_documents(
    references: Vec<RegionSet>,
    tests: Vec<RegionSet>,
) -> Result<Vec<(RegionSet, RegionSet)>, Error> {
    if references.len() == 1 && tests.len() == 1 {
        return Ok(references.into_iter().zip(tests).collect());
    }
    check_unique_names(&references, Role::Reference)?;
    check_unique_names(&tests, Role::Test)?;

    let mut tests: BTreeMap<String, RegionSet> = tests
        .into_iter()
        .map(|set| (set.document().to_string(), set))
        .collect();
    let pairs: Vec<(RegionSet, RegionSet)> = references
        .into_iter()
        .map(|reference| {
            let test = tests.remove(reference.document()).unwrap_or_else(|| {
                log::warn!("{}: no test document, scoring as missed", reference.document());
                RegionSet::new(reference.document(), Role::Test, Vec::new())
            });
            (reference, test)
        })
        .collect();
    for document in tests.keys() {
        log::warn!("{}: no reference document, skipped", document);
    }
    Ok(pairs)
}

#[cfg_attr(feature = "profiling", tracing::instrument(skip_all))]
fn run_evaluation(
    evaluator: &Evaluator,
    pairs: &[(RegionSet, RegionSet)],
    thresholds: &[f64],
    show_progress: bool,
) -> Result<CorpusEvaluation, Error> {
    use indicatif::{ProgressBar, ProgressStyle};

    if !show_progress {
        return evaluator.evaluate_corpus(pairs, thresholds, None);
    }

    let bar = ProgressBar::new(pairs.len() as u64);
    bar.set_style(
        ProgressStyle::with_template(
            "[{elapsed_precise} ETA: {eta}] {msg}: {wide_bar:.yellow} {human_pos}/{human_len}",
        )
        .map_err(|e| Error::InvalidParameters(e.to_string()))?
        .progress_chars("█▇▆▅▄▃▂▁  "),
    );
    bar.set_message("Evaluating");

    let (tx, rx) = mpsc::channel::<Progress>();
    let updater = {
        let bar = bar.clone();
        std::thread::spawn(move || {
            for progress in rx {
                if progress.total > 0 {
                    bar.set_length(progress.total as u64);
                    bar.set_position(progress.current as u64);
                }
            }
        })
    };

    let result = evaluator.evaluate_corpus(pairs, thresholds, Some(tx));
    let _ = updater.join();
    bar.finish_and_clear();
    result
}

fn print_curve(curve: &SweepCurve) {
    println!("threshold\tregion_accuracy\tfalse_detection_rate");
    for point in &curve.points {
        println!(
            "{}\t{:.4}\t{:.4}",
            point.threshold, point.region_accuracy, point.false_detection_rate
        );
    }
}

fn report(
    result: &CorpusEvaluation,
    single_document: bool,
    output: Option<&Path>,
) -> Result<(), Error> {
    for sweep in &result.documents {
        if let Some(score) = sweep.values().next() {
            for warning in &score.warnings {
                log::warn!("{}: {}", score.document, warning);
            }
        }
    }

    if single_document {
        for score in result.documents.iter().flat_map(|sweep| sweep.values()) {
            print!("{}", score);
        }
    } else {
        for score in result.documents.iter().flat_map(|sweep| sweep.values()) {
            log::debug!(
                "{} @ {}: region accuracy {:.4}, false detection rate {:.4}",
                score.document,
                score.threshold,
                score.tally.region_accuracy(),
                score.tally.false_detection_rate()
            );
        }
        for score in result.corpus.values() {
            print!("{}", score);
        }
    }

    if result.corpus.len() > 1 {
        print_curve(&SweepCurve::from_corpus(&result.corpus));
    }

    if let Some(path) = output {
        let mut writer = ReportWriter::create(path)?;
        for score in result.documents.iter().flat_map(|sweep| sweep.values()) {
            writer.write_document(score)?;
        }
        for score in result.corpus.values() {
            writer.write_corpus(score)?;
        }
        writer.flush()?;
        log::info!("report written to {}", path.display());
    }
    Ok(())
}

fn handle_evaluate(
    config: Option<&Path>,
    reference: PathBuf,
    test: PathBuf,
    options: EvalOptions,
) -> Result<(), Error> {
    let (settings, thresholds) = resolve_settings(config, &options)?;
    let evaluator = settings.evaluator()?;
    let reader = RegionReader::with_options(settings.read_options());

    let references = reader.read(&reference, Role::Reference)?;
    let tests = reader.read(&test, Role::Test)?;
    let pairs = pair_documents(references, tests)?;
    if pairs.is_empty() {
        return Err(Error::InvalidParameters(format!(
            "no documents found in {}",
            reference.display()
        )));
    }

    let result = run_evaluation(&evaluator, &pairs, &thresholds, false)?;
    report(&result, pairs.len() == 1, options.output.as_deref())
}

fn handle_batch(
    config: Option<&Path>,
    reference_dir: PathBuf,
    test_dir: PathBuf,
    options: EvalOptions,
) -> Result<(), Error> {
    let (settings, thresholds) = resolve_settings(config, &options)?;
    let evaluator = settings.evaluator()?;
    let reader = RegionReader::with_options(settings.read_options());

    let references = read_all(&reader, &region_files(&reference_dir)?, Role::Reference)?;
    let tests = read_all(&reader, &region_files(&test_dir)?, Role::Test)?;
    log::info!(
        "read {} reference and {} test documents",
        references.len(),
        tests.len()
    );

    let mut pairs = pair_documents(references, tests)?;
    if pairs.is_empty() {
        return Err(Error::InvalidParameters(format!(
            "no reference documents found in {}",
            reference_dir.display()
        )));
    }
    pairs.sort_by(|a, b| a.0.document().cmp(b.0.document()));

    let result = run_evaluation(&evaluator, &pairs, &thresholds, true)?;
    report(&result, false, options.output.as_deref())
}

fn init_logging(debug: bool) {
    let level = if debug { "debug" } else { "info" };

    #[cfg(feature = "profiling")]
    {
        use tracing_subscriber::{EnvFilter, fmt::format::FmtSpan};
        tracing_subscriber::fmt()
            .with_env_filter(
                EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)),
            )
            .with_span_events(FmtSpan::CLOSE)
            .with_writer(std::io::stderr)
            .init();
    }

    #[cfg(not(feature = "profiling"))]
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();
}

fn main() -> Result<(), Error> {
    let args = Args::parse();
    init_logging(args.debug);

    let config = args.config.as_deref();
    match args.cmd {
        Command::Evaluate {
            reference,
            test,
            options,
        } => handle_evaluate(config, reference, test, options),
        Command::Batch {
            reference_dir,
            test_dir,
            options,
        } => handle_batch(config, reference_dir, test_dir, options),
    }
}
