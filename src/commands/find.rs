use anyhow::Result;
use tessera::ResourceLocator;

use super::SearchArgs;

pub fn find_command(search: &SearchArgs, target: &str, real_path: bool) -> Result<()> {
    let loaded = search.load_config()?;
    let locator = search.locator(loaded.as_ref())?;

    match locator.find(target, real_path) {
        Some(path) => {
            println!("{}", path.display());
            Ok(())
        }
        None => anyhow::bail!("Fragment not found: {}", target),
    }
}
