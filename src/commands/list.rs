use anyhow::Result;
use std::collections::HashSet;
use std::path::Path;
use walkdir::WalkDir;

use super::SearchArgs;

/// Logical fragment names below `dir`, sorted
fn fragment_names(dir: &Path) -> Result<Vec<String>> {
    let mut names = Vec::new();
    if !dir.is_dir() {
        return Ok(names);
    }

    for entry in WalkDir::new(dir).sort_by_file_name() {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        if let Ok(relative) = entry.path().strip_prefix(dir) {
            let name = relative
                .components()
                .map(|c| c.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/");
            names.push(name);
        }
    }

    Ok(names)
}

pub fn list_command(search: &SearchArgs) -> Result<()> {
    let loaded = search.load_config()?;
    let locator = search.locator(loaded.as_ref())?;
    let dirs = locator.search_dirs();

    if dirs.is_empty() {
        println!("No search directories configured");
        return Ok(());
    }

    // A name found in an earlier directory hides the same name further down
    let mut seen = HashSet::new();
    for dir in dirs {
        println!("{}:", dir.display());

        let names = fragment_names(&dir)?;
        if names.is_empty() {
            println!("  (none)");
        }
        for name in names {
            if seen.insert(name.clone()) {
                println!("  - {name}");
            } else {
                println!("  - {name} (shadowed)");
            }
        }
    }

    Ok(())
}
