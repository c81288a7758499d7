use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

const POLISHED_FILE: &str = "storm_gen_article_polished.md";
const UNPOLISHED_FILE: &str = "storm_gen_article.md";

/// Turn raw pipeline output for `topic` into the finished article layout.
///
/// Returns the article folder.
pub fn finalize_article(output_dir: &Path, topic: &str) -> Result<PathBuf> {
    let article_dir = output_dir.join(topic);
    let underscored = output_dir.join(format!("{}_", topic));
    if underscored.is_dir() && !article_dir.exists() {
        fs::rename(&underscored, &article_dir)
            .with_context(|| format!("failed to rename {}", underscored.display()))?;
    }

    convert_txt_to_md(&article_dir)?;

    let polished = article_dir.join(POLISHED_FILE);
    if polished.exists() {
        let content = fs::read_to_string(&polished)
            .with_context(|| format!("failed to read {}", polished.display()))?;
        let stamp = chrono::Local::now().format("Last Modified: %Y-%m-%d %H:%M:%S");
        let final_path = article_dir.join(format!("{}.md", topic));
        fs::write(&final_path, format!("{}\n\n{}", stamp, content))
            .with_context(|| format!("failed to write {}", final_path.display()))?;
        fs::remove_file(&polished)?;
    }

    let unpolished = article_dir.join(UNPOLISHED_FILE);
    if unpolished.exists() {
        fs::remove_file(&unpolished)
            .with_context(|| format!("failed to remove {}", unpolished.display()))?;
    }

    tracing::info!(dir = %article_dir.display(), "article finalized");
    Ok(article_dir)
}

/// Rename generated `*storm_gen_article*.txt` files under `root` to `.md`.
pub fn convert_txt_to_md(root: &Path) -> Result<usize> {
    if !root.is_dir() {
        return Ok(0);
    }
    let mut converted = 0;
    for entry in fs::read_dir(root)? {
        let path = entry?.path();
        if path.is_dir() {
            converted += convert_txt_to_md(&path)?;
            continue;
        }
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else { continue };
        if name.contains("storm_gen_article") && name.ends_with(".txt") {
            let target = path.with_extension("md");
            fs::rename(&path, &target)
                .with_context(|| format!("failed to rename {}", path.display()))?;
            converted += 1;
        }
    }
    Ok(converted)
}
