//! Stitches result pages into a single [`QueryResult`].

use crate::error::{AthenaError, Result};
use crate::service::ResultPage;

use super::result::QueryResult;

/// Builds a result from a job's result pages, in fetch order.
///
/// Column names come from the first page's metadata, which must be present.
/// The first row of the first page repeats the header and is dropped; rows
/// without cell data are skipped.
pub fn assemble(pages: Vec<ResultPage>) -> Result<QueryResult> {
    let columns: Vec<String> = pages
        .first()
        .and_then(|page| page.column_info.as_ref())
        .ok_or(AthenaError::MissingColumnMetadata)?
        .iter()
        .map(|column| column.name.clone().unwrap_or_default())
        .collect();

    let rows = pages
        .into_iter()
        .enumerate()
        .flat_map(|(index, page)| {
            let header_rows = usize::from(index == 0);
            page.rows.unwrap_or_default().into_iter().skip(header_rows)
        })
        .filter_map(|row| row.data)
        .collect();

    Ok(QueryResult::new(columns, rows))
}
