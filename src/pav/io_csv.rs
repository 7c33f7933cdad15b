// Primitives for reading CSV approval tables.

use log::debug;
use snafu::prelude::*;

use crate::pav::config_reader::FileSource;
use crate::pav::io_common::make_default_id_lineno;
use crate::pav::{CsvLineParseSnafu, CsvOpenSnafu, MissingHeaderSnafu, ParsedBallot, PavResult};

/// Reads a table with one column per candidate and one row per ballot.
/// Returns the candidate names from the header row and the raw ballots.
pub fn read_csv_approvals(
    path: &str,
    _cfs: &FileSource,
) -> PavResult<(Vec<String>, Vec<ParsedBallot>)> {
    let default_id = make_default_id_lineno(path);

    let rdr = csv::ReaderBuilder::new()
        .has_headers(false)
        // Short rows become ballots with missing marks, which the tally
        // drops and accounts for; they must not abort the whole read.
        .flexible(true)
        .from_path(path)
        .context(CsvOpenSnafu {})?;
    let mut records = rdr.into_records();

    let header = match records.next() {
        Some(line_r) => line_r.context(CsvLineParseSnafu {})?,
        None => return MissingHeaderSnafu {}.fail(),
    };
    let candidates: Vec<String> = header.iter().map(|s| s.trim().to_string()).collect();

    let mut res: Vec<ParsedBallot> = Vec::new();
    for (idx, line_r) in records.enumerate() {
        // The header is line 1.
        let lineno = idx + 2;
        let line = line_r.context(CsvLineParseSnafu {})?;
        let marks: Vec<String> = line.iter().map(|s| s.to_string()).collect();
        debug!("read_csv_approvals: lineno: {:?} row: {:?}", lineno, &marks);

        res.push(ParsedBallot {
            id: Some(default_id(lineno)),
            count: Some(1),
            marks,
        });
    }
    Ok((candidates, res))
}
