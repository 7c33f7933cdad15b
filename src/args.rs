use clap::Parser;

/// This is a proportional approval voting tabulation program.
#[derive(Parser, Debug, Clone)]
#[clap(author, version, about, long_about = None)]
pub struct Args {
    /// (file path, optional) The file describing the election. (Only JSON election descriptions
    /// are currently supported.) It carries the tally rules, the ballot files and the output
    /// settings. For more information about the file format, read the documentation.
    #[clap(short, long, value_parser)]
    pub config: Option<String>,

    /// (file path) A reference file containing the summary of an election in JSON format. If
    /// provided, pavtally will check that the tabulated output matches the reference.
    #[clap(short, long, value_parser)]
    pub reference: Option<String>,

    /// (file path, 'stdout' or empty) If specified, the summary of the election will be written
    /// in JSON format to the given location. Setting this option overrides the path that may be
    /// specified with the --config option.
    #[clap(short, long, value_parser)]
    pub out: Option<String>,

    /// (file path or empty) The table of ballots: one column per candidate (the first row holds
    /// the candidate names) and one row per ballot. Setting this option overrides what may be
    /// specified with the --config option.
    #[clap(short, long, value_parser)]
    pub input: Option<String>,

    /// (default inferred from the file extension) The type of the input: 'csv' or 'xlsx'.
    #[clap(long, value_parser)]
    pub input_type: Option<String>,

    /// (default 1) The number of seats to fill.
    #[clap(short, long, value_parser)]
    pub winners: Option<u32>,

    /// (default 10) The number of top-scoring candidate sets to keep in the summary.
    #[clap(long, value_parser)]
    pub ranked: Option<usize>,

    /// If passed as an argument, skips the plurality (approval count) baseline in the summary.
    #[clap(long, takes_value = false)]
    pub no_plurality: bool,

    // Other arguments
    /// If passed as an argument, will turn on verbose logging to the standard output.
    #[clap(long, takes_value = false)]
    pub verbose: bool,
}
