use super::bullet_list;
use refgraph_core::PageRepository;
use serde_json::json;

/// Execute `links`: referrers of a page and the names it refers to.
pub fn execute(repo: &PageRepository, page: &str, json: bool) -> anyhow::Result<String> {
    let graph = repo.graph();
    if !graph.contains_page(page) && graph.find_referrers(page).is_none() {
        anyhow::bail!("Page not found: {}", page);
    }

    let referrers = graph.find_referrers(page).unwrap_or_default();
    let referenced = graph.find_referenced_by(page);
    let uncreated = graph.find_uncreated();

    if json {
        let value = json!({
            "page": page,
            "exists": graph.contains_page(page),
            "referred_by": referrers,
            "refers_to": referenced,
        });
        return Ok(format!("{}\n", serde_json::to_string_pretty(&value)?));
    }

    let mut output = bullet_list("Referred by (pages linking to this):", &referrers);
    output.push('\n');
    let marked: Vec<String> = referenced
        .iter()
        .map(|name| {
            if uncreated.contains(name) {
                format!("{} (uncreated)", name)
            } else {
                name.clone()
            }
        })
        .collect();
    output.push_str(&bullet_list("Refers to (pages this links to):", &marked));
    Ok(output)
}
