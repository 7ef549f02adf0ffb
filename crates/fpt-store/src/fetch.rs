//! Paginated full-table reads.

use fpt_core::row::Row;

use crate::error::StoreError;
use crate::RemoteStore;

/// Read every row of `table` in pages of `page_size`.
///
/// Stops at the first page shorter than `page_size`, including an empty one.
/// Rows are returned in the store's default order; no deduplication is done,
/// so concurrent writers during the read can cause skips or repeats.
///
/// # Errors
///
/// Returns the first [`StoreError`] raised by a page request. Rows from
/// earlier pages are discarded.
pub async fn fetch_all(
    store: &dyn RemoteStore,
    table: &str,
    page_size: usize,
) -> Result<Vec<Row>, StoreError> {
    let page_size = page_size.max(1);
    let mut rows = Vec::new();
    let mut offset = 0;

    loop {
        let page = store.fetch_page(table, offset, page_size).await?;
        let fetched = page.len();
        rows.extend(page);
        tracing::debug!(table, offset, fetched, "fetched page");

        if fetched < page_size {
            break;
        }
        offset += page_size;
    }

    Ok(rows)
}
