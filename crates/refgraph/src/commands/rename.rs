use anyhow::Context;
use refgraph_core::rename::{ReferrerOutcome, RenameResult};
use refgraph_core::PageRepository;
use serde_json::{json, Value};

/// Execute `rename`: move a page and rewrite the links that point at it.
pub fn execute(
    repo: &PageRepository,
    from: &str,
    to: &str,
    author: Option<&str>,
    keep_referrers: bool,
    json: bool,
) -> anyhow::Result<String> {
    let change_referrers = if keep_referrers { Some(false) } else { None };
    let result = repo
        .rename_page(from, to, author, change_referrers)
        .with_context(|| format!("could not rename {} to {}", from, to))?;

    if json {
        return Ok(format!("{}\n", serde_json::to_string_pretty(&to_json(&result))?));
    }

    let mut output = format!(
        "Renamed {} -> {} ({} referrer(s) rewritten, {} attachment(s) moved)\n",
        result.old_name,
        result.new_name,
        result.rewritten_count(),
        result.attachments_moved,
    );
    let failures: Vec<_> = result.failures().collect();
    if !failures.is_empty() {
        output.push_str("\nCould not update:\n");
        for failure in failures {
            output.push_str(&format!("- {}: {}\n", failure.page, failure.source));
        }
    }
    Ok(output)
}

fn to_json(result: &RenameResult) -> Value {
    let referrers: Vec<Value> = result
        .referrers
        .iter()
        .map(|update| match &update.outcome {
            Ok(ReferrerOutcome::Rewritten) => json!({"page": update.page, "status": "rewritten"}),
            Ok(ReferrerOutcome::Unchanged) => json!({"page": update.page, "status": "unchanged"}),
            Err(e) => json!({
                "page": update.page,
                "status": "failed",
                "error": e.source.to_string(),
            }),
        })
        .collect();

    json!({
        "old_name": result.old_name,
        "new_name": result.new_name,
        "rewritten": result.rewritten_count(),
        "attachments_moved": result.attachments_moved,
        "referrers": referrers,
    })
}
