//! global-options CLI - manage the global options record from a terminal
//!
//! Usage:
//!   global-options show --format json
//!   global-options set phone="+1 555 0100" banner_enabled=1
//!   global-options export -o backups/
//!   global-options import global-options-2024-03-09-140507.json
//!   global-options render page.html

use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use global_options_core::pipeline::{Hook, RenderContext, TransformerRegistry};
use global_options_core::{
    fields, tags, AdminActions, Caller, JsonFileOptionStore, SettingsStore, Upload, Value,
};
use indexmap::IndexMap;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

/// global-options - Site-wide settings and {global_*} tag rendering
#[derive(Parser)]
#[command(name = "global-options")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Option store file
    #[arg(
        short,
        long,
        global = true,
        env = "GLOBAL_OPTIONS_STORE",
        default_value = "global-options.json"
    )]
    store: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the current settings
    Show {
        /// Output format: text, json, yaml
        #[arg(short, long, default_value = "text")]
        format: String,

        /// Fill in display defaults for empty fields
        #[arg(short, long)]
        defaults: bool,
    },

    /// Submit the settings form with KEY=VALUE overrides
    Set {
        /// Field assignments (e.g., email=info@example.com)
        #[arg(required = true)]
        assignments: Vec<String>,

        /// Start from an empty form instead of the current values
        #[arg(long)]
        replace: bool,
    },

    /// Export the settings as a snapshot file
    Export {
        /// Write to this file or directory instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Replace the settings with an exported snapshot
    Import {
        /// Snapshot file to import
        file: PathBuf,
    },

    /// Resolve {global_*} tags in a file or stdin
    Render {
        /// Input file (reads stdin when omitted)
        file: Option<PathBuf>,

        /// Treat the input as JSON element settings
        #[arg(long)]
        json: bool,
    },

    /// List the available tags
    Tags {
        /// Output format: text, json
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Choose whether uninstall erases the stored settings
    Cleanup {
        #[arg(value_enum)]
        state: Toggle,
    },

    /// Remove stored settings if cleanup is enabled
    Uninstall,
}

#[derive(Clone, Copy, ValueEnum)]
enum Toggle {
    On,
    Off,
}

/// Run the CLI with the given arguments
pub fn run() -> ExitCode {
    let cli = Cli::parse();
    let store = cli.store;

    match cli.command {
        Commands::Show { format, defaults } => cmd_show(&store, &format, defaults),
        Commands::Set {
            assignments,
            replace,
        } => cmd_set(&store, &assignments, replace),
        Commands::Export { output } => cmd_export(&store, output),
        Commands::Import { file } => cmd_import(&store, &file),
        Commands::Render { file, json } => cmd_render(&store, file, json),
        Commands::Tags { format } => cmd_tags(&format),
        Commands::Cleanup { state } => cmd_cleanup(&store, matches!(state, Toggle::On)),
        Commands::Uninstall => cmd_uninstall(&store),
    }
}

fn open_admin(path: &Path) -> Result<AdminActions<JsonFileOptionStore>, String> {
    let store = JsonFileOptionStore::open(path)
        .map_err(|e| format!("Failed to open store {}: {}", path.display(), e))?;
    Ok(AdminActions::new(SettingsStore::new(store)))
}

/// Split `key=value`; the value may itself contain '='
fn parse_assignment(assignment: &str) -> Result<(String, String), String> {
    match assignment.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => {
            Ok((key.trim().to_string(), value.to_string()))
        }
        _ => Err(format!("Expected KEY=VALUE, got '{}'", assignment)),
    }
}

fn read_input(file: Option<&Path>) -> Result<String, String> {
    match file {
        Some(path) => std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read {}: {}", path.display(), e)),
        None => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .map_err(|e| format!("Failed to read stdin: {}", e))?;
            Ok(buf)
        }
    }
}

fn cmd_show(store: &Path, format: &str, defaults: bool) -> ExitCode {
    let admin = match open_admin(store) {
        Ok(a) => a,
        Err(e) => {
            eprintln!("{}", e.red());
            return ExitCode::from(2);
        }
    };

    let record = match admin.settings().load() {
        Ok(r) if defaults => r.with_defaults(),
        Ok(r) => r,
        Err(e) => {
            eprintln!("{}: {}", "Error".red(), e);
            return ExitCode::from(1);
        }
    };

    match format {
        "json" => match serde_json::to_string_pretty(&record) {
            Ok(s) => println!("{}", s),
            Err(e) => {
                eprintln!("{}: {}", "Error".red(), e);
                return ExitCode::from(1);
            }
        },
        "yaml" => match serde_yaml::to_string(&record) {
            Ok(s) => print!("{}", s),
            Err(e) => {
                eprintln!("{}: {}", "Error".red(), e);
                return ExitCode::from(1);
            }
        },
        _ => {
            if record.is_empty() {
                eprintln!("No settings saved in {}", store.display());
            }
            for (key, value) in record.iter() {
                println!("{}: {}", key.bold(), value.replace('\n', "\\n"));
            }
        }
    }

    ExitCode::SUCCESS
}

fn cmd_set(store: &Path, assignments: &[String], replace: bool) -> ExitCode {
    let mut admin = match open_admin(store) {
        Ok(a) => a,
        Err(e) => {
            eprintln!("{}", e.red());
            return ExitCode::from(2);
        }
    };

    // The admin form posts every field, pre-filled with the stored values
    let mut form: IndexMap<String, Value> = if replace {
        IndexMap::new()
    } else {
        match admin.settings().load() {
            Ok(record) => record.to_input(),
            Err(e) => {
                eprintln!("{}: {}", "Error".red(), e);
                return ExitCode::from(1);
            }
        }
    };

    for assignment in assignments {
        let (key, value) = match parse_assignment(assignment) {
            Ok(pair) => pair,
            Err(e) => {
                eprintln!("{}", e.red());
                return ExitCode::from(2);
            }
        };
        if !fields::is_known(&key) {
            eprintln!("{} Ignoring unknown field '{}'", "!".yellow(), key);
            continue;
        }
        form.insert(key, Value::String(value));
    }

    match admin.submit(&Caller::administrator(), &form) {
        Ok(record) => {
            for (key, _) in assignments.iter().filter_map(|a| parse_assignment(a).ok()) {
                if fields::is_known(&key) {
                    let stored = record.get(&key);
                    if stored.is_empty() {
                        eprintln!("{} {} cleared", "!".yellow(), key);
                    } else {
                        println!("{} {} = {}", "✓".green(), key, stored);
                    }
                }
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("{}: {}", "Error".red(), e);
            ExitCode::from(1)
        }
    }
}

fn cmd_export(store: &Path, output: Option<PathBuf>) -> ExitCode {
    let admin = match open_admin(store) {
        Ok(a) => a,
        Err(e) => {
            eprintln!("{}", e.red());
            return ExitCode::from(2);
        }
    };

    let file = match admin.export_file(&Caller::administrator()) {
        Ok(f) => f,
        Err(e) => {
            eprintln!("{}: {}", "Error".red(), e);
            return ExitCode::from(1);
        }
    };

    match output {
        Some(path) => {
            let target = if path.is_dir() {
                path.join(&file.filename)
            } else {
                path
            };
            if let Err(e) = std::fs::write(&target, &file.body) {
                eprintln!("{}: {}", "Error writing file".red(), e);
                return ExitCode::from(2);
            }
            eprintln!("{} Wrote to {}", "✓".green(), target.display());
        }
        None => println!("{}", file.body),
    }

    ExitCode::SUCCESS
}

fn cmd_import(store: &Path, file: &Path) -> ExitCode {
    let mut admin = match open_admin(store) {
        Ok(a) => a,
        Err(e) => {
            eprintln!("{}", e.red());
            return ExitCode::from(2);
        }
    };

    let upload = match std::fs::read_to_string(file) {
        Ok(body) => Some(Upload::new(file.display().to_string(), body)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
        Err(e) => {
            eprintln!("{}: {}", "Error reading file".red(), e);
            return ExitCode::from(2);
        }
    };

    match admin.import_upload(&Caller::administrator(), upload.as_ref()) {
        Ok(notice) => {
            println!("{} {}", "✓".green(), notice.message);
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("{} {}\n", "✗".red(), e.user_message());
            eprintln!("{}", e);
            ExitCode::from(1)
        }
    }
}

fn cmd_render(store: &Path, file: Option<PathBuf>, json: bool) -> ExitCode {
    let admin = match open_admin(store) {
        Ok(a) => a,
        Err(e) => {
            eprintln!("{}", e.red());
            return ExitCode::from(2);
        }
    };

    let input = match read_input(file.as_deref()) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("{}", e.red());
            return ExitCode::from(2);
        }
    };

    // One settings snapshot for the whole render
    let settings = match admin.settings().load() {
        Ok(s) => s,
        Err(e) => {
            eprintln!("{}: {}", "Error".red(), e);
            return ExitCode::from(1);
        }
    };
    let ctx = RenderContext::new(&settings);
    let registry = TransformerRegistry::with_global_tags();

    if json {
        let content: Value = match serde_json::from_str(&input) {
            Ok(v) => v,
            Err(e) => {
                eprintln!("{}: {}", "Invalid JSON".red(), e);
                return ExitCode::from(1);
            }
        };
        let resolved = registry.apply(Hook::ElementSettings, content, &ctx);
        match serde_json::to_string_pretty(&resolved) {
            Ok(s) => println!("{}", s),
            Err(e) => {
                eprintln!("{}: {}", "Error".red(), e);
                return ExitCode::from(1);
            }
        }
    } else {
        let text = registry.apply_text(Hook::RenderData, &input, &ctx);
        let html = registry.apply_text(Hook::RenderElement, &text, &ctx);
        print!("{}", html);
    }

    ExitCode::SUCCESS
}

fn cmd_tags(format: &str) -> ExitCode {
    let catalog = tags::tag_catalog();

    if format == "json" {
        let json = serde_json::json!({
            "group": tags::data_group(),
            "tags": catalog,
        });
        match serde_json::to_string_pretty(&json) {
            Ok(s) => println!("{}", s),
            Err(e) => {
                eprintln!("{}: {}", "Error".red(), e);
                return ExitCode::from(1);
            }
        }
    } else {
        let width = catalog.iter().map(|t| t.name.len()).max().unwrap_or(0);
        for tag in &catalog {
            let name = format!("{:width$}", tag.name, width = width);
            println!("{}  {}", name.cyan(), tag.label);
        }
    }

    ExitCode::SUCCESS
}

fn cmd_cleanup(store: &Path, enabled: bool) -> ExitCode {
    let mut admin = match open_admin(store) {
        Ok(a) => a,
        Err(e) => {
            eprintln!("{}", e.red());
            return ExitCode::from(2);
        }
    };

    match admin.set_cleanup(&Caller::administrator(), enabled) {
        Ok(()) => {
            let state = if enabled { "erase" } else { "keep" };
            println!("{} Uninstall will {} stored settings", "✓".green(), state);
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("{}: {}", "Error".red(), e);
            ExitCode::from(1)
        }
    }
}

fn cmd_uninstall(store: &Path) -> ExitCode {
    let admin = match open_admin(store) {
        Ok(a) => a,
        Err(e) => {
            eprintln!("{}", e.red());
            return ExitCode::from(2);
        }
    };

    let mut settings = admin.into_settings();
    match settings.uninstall() {
        Ok(true) => {
            println!("{} Removed stored settings", "✓".green());
            ExitCode::SUCCESS
        }
        Ok(false) => {
            println!("Cleanup is off; stored settings were kept");
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("{}: {}", "Error".red(), e);
            ExitCode::from(1)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_assignment() {
        assert_eq!(
            parse_assignment("cta_url=https://x.test/?a=b").unwrap(),
            ("cta_url".to_string(), "https://x.test/?a=b".to_string())
        );
        assert_eq!(
            parse_assignment("tagline=").unwrap(),
            ("tagline".to_string(), String::new())
        );
        assert!(parse_assignment("novalue").is_err());
        assert!(parse_assignment("=x").is_err());
    }

    #[test]
    fn test_parse_set_command() {
        let cli = Cli::try_parse_from([
            "global-options",
            "--store",
            "/tmp/opts.json",
            "set",
            "city=Oslo",
            "--replace",
        ])
        .unwrap();

        assert_eq!(cli.store, PathBuf::from("/tmp/opts.json"));
        match cli.command {
            Commands::Set {
                assignments,
                replace,
            } => {
                assert_eq!(assignments, vec!["city=Oslo".to_string()]);
                assert!(replace);
            }
            _ => panic!("expected set"),
        }
    }

    #[test]
    fn test_open_admin_on_missing_store() {
        let dir = tempfile::tempdir().unwrap();
        let admin = open_admin(&dir.path().join("none.json")).unwrap();
        assert!(admin.settings().load().unwrap().is_empty());
    }

    #[test]
    fn test_read_input_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("page.html");
        std::fs::write(&path, "<p>{global_city}</p>").unwrap();
        assert_eq!(read_input(Some(&path)).unwrap(), "<p>{global_city}</p>");
    }
}
