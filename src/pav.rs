use log::{debug, info, warn};

use approval_voting::*;
use snafu::{prelude::*, Snafu};

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::json;
use serde_json::Value as JSValue;
use text_diff::print_diff;

use crate::args::Args;
use crate::pav::config_reader::*;

pub mod io_common;
pub mod io_csv;
pub mod io_xlsx;

#[derive(Debug, Snafu)]
pub enum PavError {
    #[snafu(display("Error opening file {path}"))]
    OpeningExcel {
        source: calamine::XlsxError,
        path: String,
    },
    #[snafu(display("No usable worksheet in {path}"))]
    EmptyExcel { path: String },
    #[snafu(display("Cell without usable text at line {lineno}: {content}"))]
    ExcelWrongCellType { lineno: u64, content: String },
    #[snafu(display(""))]
    OpeningJson { source: std::io::Error },
    #[snafu(display(""))]
    ParsingJson { source: serde_json::Error },
    #[snafu(display("Error writing the summary to {path}"))]
    WritingSummary {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display(""))]
    CsvOpen { source: csv::Error },
    #[snafu(display(""))]
    CsvLineParse { source: csv::Error },
    #[snafu(display("The input table has no header row"))]
    MissingHeader {},
    #[snafu(display("No ballot file provided, pass --input or a --config with cvrFileSources"))]
    MissingInput {},
    #[snafu(display(""))]
    MissingParentDir {},

    #[snafu(whatever, display("{message}"))]
    Whatever {
        message: String,
        #[snafu(source(from(Box<dyn std::error::Error>, Some)))]
        source: Option<Box<dyn std::error::Error>>,
    },
}

pub type PavResult<T> = Result<T, PavError>;

pub mod config_reader {
    use crate::pav::*;

    #[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
    pub struct OutputSettings {
        #[serde(rename = "contestName")]
        pub contest_name: String,
        #[serde(rename = "outputDirectory")]
        pub output_directory: Option<String>,
        #[serde(rename = "contestDate")]
        pub contest_date: Option<String>,
        #[serde(rename = "contestJurisdiction")]
        pub contest_jurisdiction: Option<String>,
        #[serde(rename = "contestOffice")]
        pub contest_office: Option<String>,
    }

    impl OutputSettings {
        pub fn unnamed() -> OutputSettings {
            OutputSettings {
                contest_name: "election".to_string(),
                output_directory: None,
                contest_date: None,
                contest_jurisdiction: None,
                contest_office: None,
            }
        }
    }

    /// The header of the JSON summary.
    #[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
    pub struct OutputConfig {
        pub contest: String,
        pub date: Option<String>,
        pub jurisdiction: Option<String>,
        pub office: Option<String>,
        pub winners: Option<String>,
    }

    #[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
    pub struct FileSource {
        pub provider: String,
        #[serde(rename = "filePath")]
        pub file_path: String,
        #[serde(rename = "approvedLabel")]
        pub approved_label: Option<String>,
        #[serde(rename = "notApprovedLabel")]
        pub not_approved_label: Option<String>,
        #[serde(rename = "excelWorksheetName")]
        pub excel_worksheet_name: Option<String>,
    }

    impl FileSource {
        /// A source built from the --input flag alone. The provider is
        /// taken from --input-type, or from the file extension.
        pub fn for_input(path: &str, input_type: Option<&str>) -> PavResult<FileSource> {
            let provider = match input_type {
                Some(x) => x.to_string(),
                None => match Path::new(path).extension().and_then(|e| e.to_str()) {
                    Some("csv") => "csv".to_string(),
                    Some("xlsx") => "xlsx".to_string(),
                    _ => {
                        whatever!(
                            "Cannot infer the input type of {:?}, pass --input-type",
                            path
                        )
                    }
                },
            };
            Ok(FileSource {
                provider,
                file_path: path.to_string(),
                approved_label: None,
                not_approved_label: None,
                excel_worksheet_name: None,
            })
        }

        pub fn approved_label(&self) -> String {
            self.approved_label.clone().unwrap_or_else(|| "1".to_string())
        }

        pub fn not_approved_label(&self) -> String {
            self.not_approved_label
                .clone()
                .unwrap_or_else(|| "0".to_string())
        }
    }

    #[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
    pub struct PavRules {
        #[serde(rename = "numberOfWinners")]
        pub number_of_winners: u32,
        #[serde(rename = "numRanked")]
        pub num_ranked: Option<usize>,
        #[serde(rename = "computePlurality")]
        pub compute_plurality: Option<bool>,
    }

    #[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
    pub struct PavConfig {
        #[serde(rename = "outputSettings")]
        pub output_settings: OutputSettings,
        #[serde(rename = "cvrFileSources")]
        pub cvr_file_sources: Vec<FileSource>,
        pub rules: PavRules,
    }

    pub fn read_summary(path: &str) -> PavResult<JSValue> {
        let contents = fs::read_to_string(path).context(OpeningJsonSnafu {})?;
        let js: JSValue = serde_json::from_str(contents.as_str()).context(ParsingJsonSnafu {})?;
        Ok(js)
    }
}

/// A ballot as parsed by the readers: one raw cell per candidate column,
/// before applying the labels for approvals and missing values.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct ParsedBallot {
    pub id: Option<String>,
    pub count: Option<u64>,
    pub marks: Vec<String>,
}

/// Maps the raw cells to approval marks. A cell that carries neither the
/// approved nor the not-approved label has no determinate value; the core
/// drops and counts such rows.
fn validate_ballots(parsed: &[ParsedBallot], source: &FileSource) -> Vec<Vote> {
    let approved = source.approved_label();
    let not_approved = source.not_approved_label();

    let mut res: Vec<Vote> = Vec::new();
    for pb in parsed.iter() {
        let marks: Vec<ApprovalMark> = pb
            .marks
            .iter()
            .map(|cell| {
                let trimmed = cell.trim();
                if trimmed == approved.as_str() {
                    ApprovalMark::Approved
                } else if trimmed == not_approved.as_str() {
                    ApprovalMark::NotApproved
                } else {
                    ApprovalMark::Missing
                }
            })
            .collect();

        debug!("validate_ballots: ballot {:?}: {:?}", pb.id, marks);

        // Default of 1 if not specified
        let count = pb.count.unwrap_or(1);
        if count > 0 {
            res.push(Vote { marks, count });
        }
    }
    res
}

fn result_stats_to_json(result: &TallyResult) -> JSValue {
    let mut rankings: Vec<JSValue> = Vec::new();
    for (idx, entry) in result.rankings.iter().enumerate() {
        rankings.push(json!({
            "rank": idx + 1,
            "score": entry.score,
            "candidates": entry.candidates,
        }));
    }

    let plurality: Option<Vec<JSValue>> = result.plurality.as_ref().map(|counts| {
        counts
            .iter()
            .map(|(name, count)| json!({"name": name, "approvals": count.to_string()}))
            .collect()
    });

    json!({
        "totalBallots": result.total_ballots.to_string(),
        "distinctBallots": result.distinct_ballots.to_string(),
        "droppedBallots": result.dropped_ballots.to_string(),
        "plurality": plurality,
        "rankings": rankings,
        "winner": {
            "score": result.winner.score,
            "candidates": result.winner.candidates,
        },
    })
}

fn build_summary_js(output: &OutputSettings, rules: &TallyRules, result: &TallyResult) -> JSValue {
    let c = OutputConfig {
        contest: output.contest_name.clone(),
        date: output.contest_date.clone(),
        jurisdiction: output.contest_jurisdiction.clone(),
        office: output.contest_office.clone(),
        winners: Some(rules.num_winners.to_string()),
    };
    json!({
        "config": c,
        "results": result_stats_to_json(result) })
}

pub fn run_election(args: &Args) -> PavResult<()> {
    // Assemble the election from the configuration file and the flags.
    let (output_settings, mut sources, mut rules) = match &args.config {
        Some(config_path) => {
            let config_str = fs::read_to_string(config_path).context(OpeningJsonSnafu {})?;
            let config: PavConfig =
                serde_json::from_str(&config_str).context(ParsingJsonSnafu {})?;
            info!("config: {:?}", config);
            let rules = TallyRules {
                num_winners: config.rules.number_of_winners,
                num_ranked: config
                    .rules
                    .num_ranked
                    .unwrap_or(TallyRules::DEFAULT_RULES.num_ranked),
                plurality_baseline: config.rules.compute_plurality.unwrap_or(true),
            };
            // Ballot files are located relative to the configuration file.
            let root_p = Path::new(config_path)
                .parent()
                .context(MissingParentDirSnafu {})?;
            let sources: Vec<FileSource> = config
                .cvr_file_sources
                .iter()
                .map(|cfs| FileSource {
                    file_path: root_p.join(&cfs.file_path).display().to_string(),
                    ..cfs.clone()
                })
                .collect();
            (config.output_settings, sources, rules)
        }
        None => (OutputSettings::unnamed(), Vec::new(), TallyRules::DEFAULT_RULES),
    };

    if let Some(input) = &args.input {
        sources = vec![FileSource::for_input(input, args.input_type.as_deref())?];
    }
    if let Some(winners) = args.winners {
        rules.num_winners = winners;
    }
    if let Some(ranked) = args.ranked {
        rules.num_ranked = ranked;
    }
    if args.no_plurality {
        rules.plurality_baseline = false;
    }

    if sources.is_empty() {
        return MissingInputSnafu {}.fail();
    }

    // Read and concatenate the ballot tables. All the sources must agree
    // on the candidate columns.
    let mut candidates: Option<Vec<String>> = None;
    let mut data: Vec<Vote> = Vec::new();
    for cfs in sources.iter() {
        info!("Attempting to read ballot file {:?}", cfs.file_path);
        let (header, parsed) = match cfs.provider.as_str() {
            "csv" => io_csv::read_csv_approvals(&cfs.file_path, cfs)?,
            "xlsx" => io_xlsx::read_excel_approvals(&cfs.file_path, cfs)?,
            x => {
                whatever!("Provider not implemented {:?}", x)
            }
        };
        if let Some(existing) = &candidates {
            if *existing != header {
                whatever!(
                    "Candidate columns {:?} of {:?} do not match the previous sources {:?}",
                    header,
                    cfs.file_path,
                    existing
                )
            }
        } else {
            candidates = Some(header);
        }
        data.extend(validate_ballots(&parsed, cfs));
    }
    let candidates = candidates.context(MissingHeaderSnafu {})?;

    debug!("run_election: {:?} parsed ballots", data.len());

    let result = match run_approval_tally(&data, &rules, &candidates) {
        Ok(x) => x,
        Err(x) => {
            whatever!("Voting error: {}", x)
        }
    };

    // Assemble the final json
    let summary_js = build_summary_js(&output_settings, &rules, &result);
    let pretty_js = serde_json::to_string_pretty(&summary_js).context(ParsingJsonSnafu {})?;
    println!("{}", pretty_js);

    if let Some(out) = &args.out {
        if out != "stdout" {
            fs::write(out, &pretty_js).context(WritingSummarySnafu { path: out.clone() })?;
            info!("Summary written to {:?}", out);
        }
    }

    // The reference summary, if provided for comparison
    if let Some(summary_p) = &args.reference {
        let summary_ref = read_summary(summary_p)?;
        let pretty_ref = serde_json::to_string_pretty(&summary_ref).context(ParsingJsonSnafu {})?;
        if pretty_ref != pretty_js {
            warn!("Found differences with the reference summary");
            print_diff(pretty_ref.as_str(), pretty_js.as_ref(), "\n");
            whatever!("Difference detected between calculated summary and reference summary")
        }
    }

    Ok(())
}
