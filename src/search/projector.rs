use crate::db::repository::DocumentStore;
use crate::error::AppError;
use crate::models::search::{QuerySpec, ResultPage};
use crate::search::mapper::to_record;
use crate::search::query::compose;

/// Execute a search and return one page of records.
///
/// The store is asked for `offset + page_size` rows and the first `offset`
/// are skipped here, so later pages are filled as long as the store has
/// rows. A cursor that runs out early yields a short (possibly empty) page.
pub async fn project(store: &dyn DocumentStore, spec: &QuerySpec) -> Result<ResultPage, AppError> {
    let page_size = spec.page_size();
    let offset = spec.offset();
    let query = compose(spec);

    tracing::debug!(
        query = query.text(),
        parameters = query.parameters().len(),
        page_size,
        offset,
        "Executing search"
    );

    let mut cursor = store
        .execute(&query, offset.saturating_add(page_size))
        .await?;

    for _ in 0..offset {
        match cursor.next() {
            Some(entry) => {
                entry?;
            }
            None => return Ok(Vec::new()),
        }
    }

    let mut page = ResultPage::with_capacity(page_size.min(64));
    for entry in cursor.take(page_size) {
        let record = to_record(&entry?)?;
        let record = match spec.properties_to_include() {
            Some(include) => record.retain_properties(include),
            None => record,
        };
        page.push(record);
    }

    tracing::debug!(records = page.len(), "Search completed");
    Ok(page)
}
