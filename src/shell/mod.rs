//! Command execution against one tree
//!
//! A [`Session`] owns the tree and the settings it was built with. Input text
//! goes through the command parser, and every command produces an [`Output`]
//! for the caller to print.

mod error;

pub use error::{ShellError, ShellResult};

use csv::{ReaderBuilder, WriterBuilder};
use log::info;
use prettytable::{Table, row};
use serde::Serialize;
use std::fmt;
use std::fs;
use std::path::Path;

use crate::btree::BPlusTree;
use crate::command::{self, Command};
use crate::config::ShellConfig;

/// What a command has to show
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Output {
    Silent,
    Text(String),
}

impl Output {
    fn text(s: impl Into<String>) -> Self {
        Output::Text(s.into())
    }
}

impl fmt::Display for Output {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Output::Silent => Ok(()),
            Output::Text(text) => f.write_str(text),
        }
    }
}

#[derive(Serialize)]
struct DumpEntry<'a> {
    key: &'a str,
    value: &'a str,
}

pub struct Session {
    tree: BPlusTree,
    config: ShellConfig,
}

impl Session {
    pub fn new(config: ShellConfig) -> ShellResult<Self> {
        config.validate()?;
        let tree = config.build_tree()?;
        Ok(Self { tree, config })
    }

    pub fn tree(&self) -> &BPlusTree {
        &self.tree
    }

    pub fn config(&self) -> &ShellConfig {
        &self.config
    }

    /// Parse `input` and execute every statement in it, stopping at the
    /// first failing one
    pub fn run(&mut self, input: &str) -> ShellResult<Vec<Output>> {
        let commands = command::parse(input).map_err(ShellError::Parse)?;
        commands
            .into_iter()
            .map(|command| self.execute(command))
            .collect()
    }

    pub fn execute(&mut self, command: Command) -> ShellResult<Output> {
        if !matches!(command, Command::Annotation(_) | Command::Null) {
            info!("execute {:?}", command);
        }

        match command {
            Command::Insert(key, value) => Ok(match self.tree.insert(key.as_str(), value) {
                Some(old) => Output::text(format!("Updated {key} (was {old})")),
                None => Output::text(format!("Inserted {key}")),
            }),
            Command::Delete(key) => Ok(if self.tree.delete(&key) {
                Output::text(format!("Deleted {key}"))
            } else {
                Output::text(format!("Key {key} not found"))
            }),
            Command::Get(key) => Ok(match self.tree.get(&key) {
                Some(value) => Output::text(value),
                None => Output::text(format!("Key {key} not found")),
            }),
            Command::Traverse => Ok(self.traverse()),
            Command::Dump => self.dump(),
            Command::Stats => Ok(self.stats()),
            Command::Check => {
                self.tree.check_invariants()?;
                Ok(Output::text("OK"))
            }
            Command::Graph(None) => Ok(Output::text(self.tree.export_graph())),
            Command::Graph(Some(path)) => {
                fs::write(&path, self.tree.export_graph())?;
                Ok(Output::text(format!("Wrote graph to {path}")))
            }
            Command::Load(path) => {
                let count = self.load_csv(Path::new(&path))?;
                Ok(Output::text(format!("Loaded {count} rows from {path}")))
            }
            Command::Save(path) => {
                let count = self.save_csv(Path::new(&path))?;
                Ok(Output::text(format!("Saved {count} rows to {path}")))
            }
            Command::Reset(order) => {
                let order = order.unwrap_or(self.config.order);
                self.tree = BPlusTree::with_ordering(order, self.config.ordering)?;
                self.config.order = order;
                Ok(Output::text(format!("Reset to an empty tree of order {order}")))
            }
            Command::Annotation(_) | Command::Null => Ok(Output::Silent),
        }
    }

    fn traverse(&self) -> Output {
        let mut table = Table::new();
        table.set_titles(row!["key", "value"]);
        for (key, value) in &self.tree {
            table.add_row(row![key, value]);
        }
        Output::text(format!("{}{} entries", table, self.tree.len()))
    }

    fn dump(&self) -> ShellResult<Output> {
        let entries: Vec<DumpEntry> = self
            .tree
            .iter()
            .map(|(key, value)| DumpEntry { key, value })
            .collect();
        Ok(Output::text(serde_json::to_string_pretty(&entries)?))
    }

    fn stats(&self) -> Output {
        let mut table = Table::new();
        table.add_row(row!["order", self.tree.order()]);
        table.add_row(row!["ordering", self.tree.ordering()]);
        table.add_row(row!["entries", self.tree.len()]);
        table.add_row(row!["height", self.tree.height()]);
        table.add_row(row!["nodes", self.tree.node_count()]);
        table.add_row(row!["labels", self.tree.labels_allocated()]);
        Output::text(table.to_string())
    }

    /// Upsert every headerless `key,value` row of a CSV file
    fn load_csv(&mut self, path: &Path) -> ShellResult<usize> {
        let mut reader = ReaderBuilder::new().has_headers(false).from_path(path)?;

        let mut count = 0;
        for result in reader.deserialize() {
            let (key, value): (String, String) = result?;
            self.tree.insert(key, value);
            count += 1;
        }

        info!("loaded {} rows from {}", count, path.display());
        Ok(count)
    }

    fn save_csv(&self, path: &Path) -> ShellResult<usize> {
        let mut writer = WriterBuilder::new().has_headers(false).from_path(path)?;
        for entry in &self.tree {
            writer.serialize(entry)?;
        }
        writer.flush()?;
        Ok(self.tree.len())
    }
}
