//! Configuration for the hexpack command-line tool.
//!
//! Handles parsing command-line arguments into a [`Config`]. The tool works
//! with zero arguments (it runs the demo with the default key) and prints
//! the seed it picked so any run can be reproduced.

use std::path::PathBuf;

/// What the tool should do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Pack the given text and print the hex string
    Pack(String),

    /// Unpack the given hex string and print the text
    Unpack(String),

    /// Print the code table for the key
    Table,

    /// Pack and unpack generated sample payloads, then print metrics
    Demo,
}

/// Where the key comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeySource {
    /// Built-in default key
    Default,

    /// Key text given on the command line
    Inline(String),

    /// Key text read from a file
    File(PathBuf),
}

/// Complete configuration for a run.
#[derive(Debug, Clone)]
pub struct Config {
    pub command: Command,

    pub key: KeySource,

    /// Seed for pad bits and sample generation
    pub seed: u64,

    /// Number of sample payloads for `demo`
    pub count: usize,

    /// Whether to print the resolved configuration
    pub print_config: bool,

    /// Whether to print the metrics summary
    pub print_metrics: bool,
}

impl Config {
    /// Parse configuration from command-line arguments (without the program name).
    ///
    /// If `--seed` is not given, a time-based seed is used.
    pub fn from_args(args: &[String]) -> Result<Self, String> {
        let mut command: Option<Command> = None;
        let mut key = KeySource::Default;
        let mut seed: Option<u64> = None;
        let mut count: Option<usize> = None;
        let mut print_config = false;
        let mut print_metrics = true;

        let mut i = 0;
        while i < args.len() {
            match args[i].as_str() {
                "pack" | "unpack" => {
                    let name = args[i].clone();
                    i += 1;
                    if i >= args.len() {
                        return Err(format!("{name} requires an argument"));
                    }
                    let value = args[i].clone();
                    set_command(
                        &mut command,
                        if name == "pack" {
                            Command::Pack(value)
                        } else {
                            Command::Unpack(value)
                        },
                    )?;
                }
                "table" => set_command(&mut command, Command::Table)?,
                "demo" => set_command(&mut command, Command::Demo)?,
                "--key" => {
                    i += 1;
                    if i >= args.len() {
                        return Err("--key requires key text".to_string());
                    }
                    key = KeySource::Inline(unescape_newlines(&args[i]));
                }
                "--key-file" => {
                    i += 1;
                    if i >= args.len() {
                        return Err("--key-file requires a path".to_string());
                    }
                    key = KeySource::File(PathBuf::from(&args[i]));
                }
                "--seed" => {
                    i += 1;
                    if i >= args.len() {
                        return Err("--seed requires a number".to_string());
                    }
                    seed = Some(args[i].parse().map_err(|_| "invalid seed")?);
                }
                "--count" => {
                    i += 1;
                    if i >= args.len() {
                        return Err("--count requires a number".to_string());
                    }
                    count = Some(args[i].parse().map_err(|_| "invalid count")?);
                }
                "--print-config" => {
                    print_config = true;
                }
                "--no-metrics" => {
                    print_metrics = false;
                }
                "--help" | "-h" => {
                    print_help();
                    std::process::exit(0);
                }
                _ => {
                    return Err(format!("unknown argument: {}", args[i]));
                }
            }
            i += 1;
        }

        let seed = seed.unwrap_or_else(|| {
            use std::time::{SystemTime, UNIX_EPOCH};
            SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_millis() as u64)
                .unwrap_or_default()
        });

        Ok(Config {
            command: command.unwrap_or(Command::Demo),
            key,
            seed,
            count: count.unwrap_or(16),
            print_config,
            print_metrics,
        })
    }

    /// Load the key text this configuration points at.
    pub fn load_key(&self) -> std::io::Result<Option<String>> {
        match &self.key {
            KeySource::Default => Ok(None),
            KeySource::Inline(text) => Ok(Some(text.clone())),
            KeySource::File(path) => std::fs::read_to_string(path).map(Some),
        }
    }

    /// Print the configuration in human-readable form.
    pub fn print(&self) {
        println!("=== Configuration ===");
        println!("Command: {:?}", self.command);
        match &self.key {
            KeySource::Default => println!("Key: (default)"),
            KeySource::Inline(text) => println!("Key: inline, {} lines", text.lines().count()),
            KeySource::File(path) => println!("Key file: {}", path.display()),
        }
        println!("Seed: {}", self.seed);
        if self.command == Command::Demo {
            println!("Sample payloads: {}", self.count);
        }
        println!();
    }
}

fn set_command(slot: &mut Option<Command>, command: Command) -> Result<(), String> {
    if slot.is_some() {
        return Err("only one command may be given".to_string());
    }
    *slot = Some(command);
    Ok(())
}

/// Shells make real newlines awkward; accept a literal `\n` between key lines.
fn unescape_newlines(text: &str) -> String {
    text.replace("\\n", "\n")
}

fn print_help() {
    println!("hexpack: keyed Huffman text codec with a hex wire format");
    println!();
    println!("USAGE:");
    println!("    hexpack [COMMAND] [OPTIONS]");
    println!();
    println!("COMMANDS:");
    println!("    pack <TEXT>             Pack text into a hex string");
    println!("    unpack <HEX>            Unpack a hex string into text");
    println!("    table                   Print the code table for the key");
    println!("    demo                    Round-trip sample payloads (default)");
    println!();
    println!("OPTIONS:");
    println!("    --key <HEX-LINES>       Key text, lines separated by newlines or \\n");
    println!("    --key-file <PATH>       Read the key from a file");
    println!("    --seed <N>              Random seed for pad bits and samples");
    println!("    --count <N>             Number of demo payloads (default: 16)");
    println!();
    println!("    --print-config          Print resolved configuration");
    println!("    --no-metrics            Don't print metrics summary");
    println!("    --help, -h              Print this help");
    println!();
    println!("EXAMPLES:");
    println!("    hexpack pack true");
    println!("    hexpack --key '64226964223a\\n3274727565' pack '{{\"id\":true}}'");
    println!("    hexpack --key-file key.txt unpack 3a1f07");
    println!("    hexpack demo --seed 42 --count 100");
    println!();
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_defaults() {
        let config = Config::from_args(&[]).unwrap();
        assert_eq!(config.command, Command::Demo);
        assert_eq!(config.key, KeySource::Default);
        assert_eq!(config.count, 16);
        assert!(config.print_metrics);
    }

    #[test]
    fn test_pack_with_inline_key() {
        let config =
            Config::from_args(&args(&["--key", "3274727565\\n1e2c", "pack", "true", "--seed", "5"]))
                .unwrap();
        assert_eq!(config.command, Command::Pack("true".to_string()));
        assert_eq!(config.key, KeySource::Inline("3274727565\n1e2c".to_string()));
        assert_eq!(config.seed, 5);
        assert_eq!(config.load_key().unwrap().as_deref(), Some("3274727565\n1e2c"));
    }

    #[test]
    fn test_errors() {
        assert!(Config::from_args(&args(&["pack"])).is_err());
        assert!(Config::from_args(&args(&["--seed", "x"])).is_err());
        assert!(Config::from_args(&args(&["table", "demo"])).is_err());
        assert!(Config::from_args(&args(&["--bogus"])).is_err());
    }

    #[test]
    fn test_missing_key_file() {
        let config = Config::from_args(&args(&["--key-file", "/nonexistent/hexpack.key"])).unwrap();
        assert!(config.load_key().is_err());
    }
}
