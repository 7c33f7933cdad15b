// Primitives for reading approval tables from Excel workbooks.

use calamine::{open_workbook, DataType, Reader, Xlsx};
use log::debug;
use snafu::prelude::*;

use crate::pav::config_reader::FileSource;
use crate::pav::io_common::make_default_id_lineno;
use crate::pav::{
    EmptyExcelSnafu, ExcelWrongCellTypeSnafu, MissingHeaderSnafu, OpeningExcelSnafu, ParsedBallot,
    PavResult,
};

/// Reads the same table shape as the CSV reader from an Excel worksheet:
/// candidate names in the first row, one row per ballot below.
pub fn read_excel_approvals(
    path: &str,
    cfs: &FileSource,
) -> PavResult<(Vec<String>, Vec<ParsedBallot>)> {
    let default_id = make_default_id_lineno(path);
    let wrange = get_range(path, cfs)?;

    let mut rows = wrange.rows();
    let header = match rows.next() {
        Some(row) => row,
        None => return MissingHeaderSnafu {}.fail(),
    };
    let candidates: Vec<String> = header
        .iter()
        .map(read_header_cell)
        .collect::<PavResult<Vec<String>>>()?;

    let mut res: Vec<ParsedBallot> = Vec::new();
    for (idx, row) in rows.enumerate() {
        let lineno = idx + 2;
        let marks: Vec<String> = row.iter().map(read_mark_cell).collect();
        debug!("read_excel_approvals: lineno: {:?} row: {:?}", lineno, &marks);

        res.push(ParsedBallot {
            id: Some(default_id(lineno)),
            count: Some(1),
            marks,
        });
    }
    Ok((candidates, res))
}

/// Renders one cell as the text of an approval mark. Spreadsheet exports
/// commonly hold the 0/1 marks as numbers; integral numbers are rendered
/// without a fractional part so they match the configured labels.
fn read_mark_cell(cell: &DataType) -> String {
    match cell {
        DataType::String(s) => s.clone(),
        DataType::Int(i) => i.to_string(),
        DataType::Float(f) if f.fract() == 0.0 => format!("{}", *f as i64),
        DataType::Float(f) => f.to_string(),
        DataType::Bool(true) => "1".to_string(),
        DataType::Bool(false) => "0".to_string(),
        _ => String::new(),
    }
}

fn read_header_cell(cell: &DataType) -> PavResult<String> {
    match cell {
        DataType::String(s) => Ok(s.trim().to_string()),
        x => ExcelWrongCellTypeSnafu {
            lineno: 1u64,
            content: format!("{:?}", x),
        }
        .fail(),
    }
}

fn get_range(path: &str, cfs: &FileSource) -> PavResult<calamine::Range<DataType>> {
    let worksheet_name_o = cfs.excel_worksheet_name.clone();
    debug!(
        "read_excel_approvals: path: {:?} worksheet: {:?}",
        &path, &worksheet_name_o
    );
    let mut workbook: Xlsx<_> = open_workbook(path).context(OpeningExcelSnafu { path })?;

    // A worksheet name was provided, use it.
    if let Some(worksheet_name) = worksheet_name_o {
        workbook
            .worksheet_range(&worksheet_name)
            .context(EmptyExcelSnafu { path })?
            .context(OpeningExcelSnafu { path })
    } else {
        let all_worksheets = workbook.worksheets();
        match all_worksheets.as_slice() {
            [] => EmptyExcelSnafu { path }.fail(),
            [(worksheet_name, wrange)] => {
                debug!(
                    "read_excel_approvals: path: {:?} worksheet: {:?}",
                    &path, &worksheet_name
                );
                Ok(wrange.clone())
            }
            _ => {
                whatever!(
                    "Too many worksheets in {:?}, the worksheet name must be provided",
                    path
                )
            }
        }
    }
}
