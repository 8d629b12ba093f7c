use agentline_runtime_config::{ConsoleConfig, default_config_path, load_config, save_config};
use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub action: ConfigAction,
}

#[derive(Debug, Clone, Subcommand)]
pub enum ConfigAction {
    /// Write the effective config (defaults plus any existing values) to disk.
    Init {
        /// Rewrite an existing file with every key filled in.
        #[arg(long)]
        force: bool,
    },
    /// Print the effective config as TOML.
    Show,
}

pub fn run(args: ConfigArgs, explicit: Option<&Path>) -> Result<()> {
    let path = resolve_config_path(explicit)?;
    match args.action {
        ConfigAction::Init { force } => run_init(&path, force),
        ConfigAction::Show => run_show(&path),
    }
}

/// `--config` if given, else `~/.config/agentline/agentline.toml`.
pub fn resolve_config_path(explicit: Option<&Path>) -> Result<PathBuf> {
    match explicit {
        Some(path) => Ok(path.to_path_buf()),
        None => default_config_path().context("Could not determine home directory"),
    }
}

/// Effective config for the run. Without `--config` and without a home
/// directory the defaults are used.
pub fn load_effective(explicit: Option<&Path>) -> Result<ConsoleConfig> {
    let path = match explicit {
        Some(path) => path.to_path_buf(),
        None => match default_config_path() {
            Some(path) => path,
            None => return Ok(ConsoleConfig::default()),
        },
    };
    load_config(&path).with_context(|| format!("Failed to load config at {}", path.display()))
}

fn run_init(path: &Path, force: bool) -> Result<()> {
    if path.exists() && !force {
        println!("config: {} (unchanged)", path.display());
        return Ok(());
    }
    // load_config applies compatibility fallbacks.
    let cfg =
        load_config(path).with_context(|| format!("Failed to load config at {}", path.display()))?;
    save_config(path, &cfg).with_context(|| format!("Failed to write {}", path.display()))?;
    println!("config: {}", path.display());
    Ok(())
}

fn run_show(path: &Path) -> Result<()> {
    let cfg =
        load_config(path).with_context(|| format!("Failed to load config at {}", path.display()))?;
    let body = toml::to_string_pretty(&cfg).context("serialize config")?;
    println!("# {}", path.display());
    print!("{body}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_path_wins() {
        let path = Path::new("/tmp/custom.toml");
        assert_eq!(resolve_config_path(Some(path)).unwrap(), path);
    }

    #[test]
    fn init_writes_defaults_once() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("agentline.toml");
        run_init(&path, false).unwrap();
        let written = std::fs::read_to_string(&path).unwrap();
        assert!(written.contains("delegation_tool = \"subagent\""));

        std::fs::write(&path, "[timeline]\nmax_delta_chars = 64\n").unwrap();
        run_init(&path, false).unwrap();
        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            "[timeline]\nmax_delta_chars = 64\n"
        );

        run_init(&path, true).unwrap();
        let cfg = load_effective(Some(&path)).unwrap();
        assert_eq!(cfg.timeline.max_delta_chars, 64);
        assert!(std::fs::read_to_string(&path).unwrap().contains("[viewport]"));
    }
}
