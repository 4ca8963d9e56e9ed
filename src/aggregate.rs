use anyhow::Context as _;

use crate::batch::Batch;
use crate::llm::Completer;

/// Completes each batch in order and concatenates the outputs verbatim.
///
/// The first failing call aborts the aggregation; earlier completions are
/// discarded.
pub async fn aggregate(
    completer: &dyn Completer,
    api_key: &str,
    role: &str,
    batches: &[Batch],
) -> anyhow::Result<String> {
    let mut out = String::new();
    for (idx, batch) in batches.iter().enumerate() {
        tracing::debug!(batch = idx, articles = batch.article_count(), "complete batch");
        let text = completer
            .complete(api_key, role, &batch.text)
            .await
            .with_context(|| format!("complete batch {idx} of {}", batches.len()))?;
        out.push_str(&text);
    }
    Ok(out)
}
