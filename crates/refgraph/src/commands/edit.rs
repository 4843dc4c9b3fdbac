use anyhow::Context;
use refgraph_core::PageRepository;
use serde_json::json;

pub fn save(
    repo: &PageRepository,
    page: &str,
    text: &str,
    author: Option<&str>,
    json: bool,
) -> anyhow::Result<String> {
    let author = author.unwrap_or(repo.rename_config().default_author.as_str());
    let name = repo
        .save_page(page, text, author)
        .with_context(|| format!("could not save {}", page))?;
    let links = repo.graph().find_referenced_by(&name);

    if json {
        let value = json!({"page": name, "refers_to": links});
        return Ok(format!("{}\n", serde_json::to_string(&value)?));
    }
    Ok(format!("Saved {} ({} link(s))\n", name, links.len()))
}

pub fn delete(repo: &PageRepository, page: &str, json: bool) -> anyhow::Result<String> {
    let page = repo
        .delete_page(page)
        .with_context(|| format!("could not delete {}", page))?;
    let referrers = repo.graph().find_referrers(&page).unwrap_or_default();

    if json {
        let value = json!({"page": page, "dangling_referrers": referrers});
        return Ok(format!("{}\n", serde_json::to_string(&value)?));
    }
    let mut output = format!("Deleted {}\n", page);
    if !referrers.is_empty() {
        output.push_str(&format!(
            "Still linked from: {}\n",
            referrers.into_iter().collect::<Vec<_>>().join(", ")
        ));
    }
    Ok(output)
}
