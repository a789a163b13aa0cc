//! `orus init` — write a starter configuration file.

use orus_config::AppConfig;
use std::path::Path;

pub async fn run(config: Option<&Path>, force: bool) -> Result<(), Box<dyn std::error::Error>> {
    let path = AppConfig::resolve_path(config);

    if write_config(&path, force)? {
        println!("✅ Created config at: {}", path.display());
        println!("\n📝 Next steps:");
        println!("   1. Uncomment the [providers.*] and [sinks.*] sections you use");
        println!("   2. Set api keys there or via ORUS_<KIND>_API_KEY");
        println!("   3. Run `orus status` to check connectivity");
    } else {
        println!("⚠️  Config already exists at: {}", path.display());
        println!("   Edit it manually or re-run with --force.");
    }

    Ok(())
}

/// Returns `false` when the file exists and `force` is not set.
fn write_config(path: &Path, force: bool) -> std::io::Result<bool> {
    if path.exists() && !force {
        return Ok(false);
    }
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir)?;
    }
    std::fs::write(path, AppConfig::default_toml())?;
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writes_loadable_config_once() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        assert!(write_config(&path, false).unwrap());
        let loaded = AppConfig::load_from(&path).unwrap();
        assert!(loaded.providers.is_empty());

        std::fs::write(&path, "# edited\n").unwrap();
        assert!(!write_config(&path, false).unwrap());
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "# edited\n");

        assert!(write_config(&path, true).unwrap());
        assert_ne!(std::fs::read_to_string(&path).unwrap(), "# edited\n");
    }
}
