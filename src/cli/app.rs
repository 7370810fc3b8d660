use anyhow::{Context, Result, anyhow, bail};
use clap::{Parser, Subcommand};
use sqlbind::{Binder, BinderConfig, PlaceholderStyle, Value};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "sqlbind")]
#[command(about = "Inspect and render sqlbind statement definitions")]
pub struct Cli {
    /// Raise the log level (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List owners, tables and statements of a definition directory
    List { dir: PathBuf },
    /// Render one statement without a database
    Render {
        dir: PathBuf,
        /// Owner key, `package.Type` or `Type`
        owner: String,
        statement: String,
        /// Argument as name=<json>; text that is not JSON is taken as a string
        #[arg(long = "arg", value_name = "NAME=VALUE")]
        args: Vec<String>,
        /// Emit $1, $2, ... instead of ?
        #[arg(long)]
        numbered: bool,
    },
}

impl Cli {
    pub fn run(self) -> Result<()> {
        match self.command {
            Command::List { dir } => list(&dir),
            Command::Render {
                dir,
                owner,
                statement,
                args,
                numbered,
            } => render(&dir, &owner, &statement, &args, numbered),
        }
    }
}

fn load(dir: &Path, config: BinderConfig) -> Result<Binder> {
    let mut binder = Binder::with_config(config);
    let count = binder
        .scan_dir(dir)
        .with_context(|| format!("Failed to read definitions from '{}'", dir.display()))?;
    if count == 0 {
        bail!("No *.sql.json definitions found in '{}'", dir.display());
    }
    Ok(binder)
}

fn list(dir: &Path) -> Result<()> {
    let mut binder = load(dir, BinderConfig::default())?;
    let catalog = binder.index()?;

    for owner_key in catalog.owners() {
        let Some(owner) = catalog.get(owner_key) else {
            continue;
        };
        let table = if owner.table.is_empty() { "-" } else { owner.table.as_str() };
        println!("{owner_key} (table: {table})");
        for statement in owner.statements() {
            println!(
                "  {:<8} {}({})",
                statement.kind.to_string(),
                statement.name,
                statement.arg_names.join(", ")
            );
        }
    }
    Ok(())
}

fn parse_arg(raw: &str) -> Result<(String, Value)> {
    let (name, text) = raw
        .split_once('=')
        .ok_or_else(|| anyhow!("Argument '{raw}' must look like name=value"))?;
    let value = match serde_json::from_str::<serde_json::Value>(text) {
        Ok(json) => Value::from(json),
        Err(_) => Value::Text(text.to_string()),
    };
    Ok((name.trim().to_string(), value))
}

fn render(dir: &Path, owner: &str, statement: &str, raw_args: &[String], numbered: bool) -> Result<()> {
    let style = if numbered {
        PlaceholderStyle::Numbered
    } else {
        PlaceholderStyle::Question
    };
    let mut binder = load(dir, BinderConfig::new().placeholder(style))?;

    let mut named: HashMap<String, Value> = raw_args
        .iter()
        .map(|raw| parse_arg(raw))
        .collect::<Result<_>>()?;

    let arg_names = binder
        .index()?
        .get(owner)
        .and_then(|set| set.statement(statement))
        .map(|definition| definition.arg_names.clone())
        .unwrap_or_default();

    let mut values = Vec::with_capacity(arg_names.len());
    for name in &arg_names {
        let value = named
            .remove(name)
            .ok_or_else(|| anyhow!("Missing --arg {name}=..."))?;
        values.push(value);
    }
    if let Some(extra) = named.keys().next() {
        bail!("Statement '{statement}' has no argument named '{extra}'");
    }

    let rendered = binder.render(owner, statement, values)?;
    println!("{}", rendered.sql);
    println!("binds: {}", serde_json::to_string(&rendered.binds)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_arg() {
        assert_eq!(parse_arg("ids=[1,2]").unwrap(), ("ids".to_string(), Value::from(vec![1i64, 2])));
        assert_eq!(parse_arg("name=bar").unwrap(), ("name".to_string(), Value::from("bar")));
        assert_eq!(parse_arg("name=\"7\"").unwrap().1, Value::from("7"));
        assert!(parse_arg("oops").is_err());
    }
}
