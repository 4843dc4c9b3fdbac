use super::bullet_list;
use refgraph_core::PageRepository;
use std::collections::BTreeSet;

pub fn unreferenced(repo: &PageRepository, json: bool) -> anyhow::Result<String> {
    render(
        "Unreferenced pages:",
        repo.graph().find_unreferenced(),
        json,
    )
}

pub fn uncreated(repo: &PageRepository, json: bool) -> anyhow::Result<String> {
    render(
        "Uncreated pages (linked to but missing):",
        repo.graph().find_uncreated(),
        json,
    )
}

fn render(heading: &str, names: BTreeSet<String>, json: bool) -> anyhow::Result<String> {
    if json {
        return Ok(format!("{}\n", serde_json::to_string(&names)?));
    }
    Ok(bullet_list(heading, &names))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn repo() -> PageRepository {
        let repo = PageRepository::in_memory();
        repo.save_page("Home", "[Notes] [Todo]", "a").unwrap();
        repo.save_page("Notes", "", "a").unwrap();
        repo.save_page("Orphan", "[Todo]", "a").unwrap();
        repo
    }

    #[test]
    fn lists_unreferenced() {
        assert_eq!(
            unreferenced(&repo(), false).unwrap(),
            "Unreferenced pages:\n- Home\n- Orphan\n"
        );
    }

    #[test]
    fn lists_uncreated_as_json() {
        assert_eq!(uncreated(&repo(), true).unwrap(), "[\"Todo\"]\n");
    }

    #[test]
    fn empty_report() {
        let repo = PageRepository::in_memory();
        assert_eq!(
            uncreated(&repo, false).unwrap(),
            "Uncreated pages (linked to but missing):\n- (none)\n"
        );
    }
}
