//! Self-validation of generated workbooks
//!
//! The renderer re-opens every document it produces with an independent
//! reader before handing it out. A workbook that cannot be read back, or that
//! lost its report sheet or header captions, is rejected.

use std::io::Cursor;

use calamine::{open_workbook_from_rs, Data, Reader, Xlsx};
use turnover_core::ReportError;

/// Re-read `bytes` and check the sheet layout and header captions
pub fn verify_workbook(
    bytes: &[u8],
    sheet_name: &str,
    header_row: u32,
    captions: &[&str],
) -> Result<(), ReportError> {
    let mut workbook: Xlsx<_> = open_workbook_from_rs(Cursor::new(bytes)).map_err(corrupt)?;

    let sheets = workbook.sheet_names();
    if sheets.len() != 1 || sheets[0] != sheet_name {
        return Err(corrupt(format!(
            "expected a single '{sheet_name}' sheet, found {sheets:?}"
        )));
    }

    let range = workbook.worksheet_range(sheet_name).map_err(corrupt)?;
    for (col, caption) in captions.iter().enumerate() {
        let cell = range.get_value((header_row, col as u32));
        if !header_matches(cell, caption) {
            return Err(corrupt(format!(
                "header cell {} reads {:?}, expected {:?}",
                col + 1,
                cell,
                caption
            )));
        }
    }

    Ok(())
}

/// Compare a read-back header cell with its caption.
///
/// Strings come back with their OOXML `_xHHHH_` escapes intact, so the cell
/// is decoded first. Readers also differ on whether a stored carriage return
/// survives, so both sides are compared without them.
fn header_matches(cell: Option<&Data>, caption: &str) -> bool {
    match cell {
        Some(Data::String(text)) => strip_cr(&decode_escapes(text)) == strip_cr(caption),
        None | Some(Data::Empty) => caption.is_empty(),
        Some(_) => false,
    }
}

fn strip_cr(text: &str) -> String {
    text.replace('\r', "")
}

/// Decode `_xHHHH_` character escapes, left to right.
///
/// A literal `_xHHHH_` in the original text is stored with its underscore
/// escaped (`_x005F_xHHHH_`), so a single pass restores it.
pub fn decode_escapes(text: &str) -> String {
    let mut decoded = String::with_capacity(text.len());
    let mut rest = text;

    while let Some(start) = rest.find("_x") {
        decoded.push_str(&rest[..start]);
        let candidate = &rest[start..];
        match escaped_char(candidate) {
            Some(c) => {
                decoded.push(c);
                rest = &candidate[7..];
            }
            None => {
                decoded.push_str("_x");
                rest = &candidate[2..];
            }
        }
    }

    decoded.push_str(rest);
    decoded
}

/// The character behind a leading `_xHHHH_`, if `text` starts with one
fn escaped_char(text: &str) -> Option<char> {
    let bytes = text.as_bytes();
    if bytes.len() < 7 || bytes[6] != b'_' || !bytes[2..6].iter().all(u8::is_ascii_hexdigit) {
        return None;
    }
    u32::from_str_radix(&text[2..6], 16)
        .ok()
        .and_then(char::from_u32)
}

fn corrupt(error: impl std::fmt::Display) -> ReportError {
    ReportError::validation(format!("Generated workbook failed validation: {error}"))
}
