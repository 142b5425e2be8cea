use bonusbot_core::sheets::{SheetFetchError, SheetRef, SheetTable};

const BYTE_ORDER_MARK: char = '\u{feff}';

/// Decodes a CSV export into raw rows. No header handling: the lookup layer
/// decides which row is the header.
pub fn parse_csv(sheet: &SheetRef, body: &str) -> Result<SheetTable, SheetFetchError> {
    let body = body.strip_prefix(BYTE_ORDER_MARK).unwrap_or(body);
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(body.as_bytes());

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|error| SheetFetchError::Decode {
            sheet: sheet.to_string(),
            message: error.to_string(),
        })?;
        rows.push(record.iter().map(str::to_owned).collect());
    }
    Ok(SheetTable::new(rows))
}
