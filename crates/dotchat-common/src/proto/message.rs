//! The message: a command plus named, typed arguments.

use super::value::{Value, ValueMap};

/// One protocol message, either direction.
///
/// A message is a command string and a map of named values; the envelope
/// layer in [`super::requests`] and [`super::responses`] gives the maps
/// their shapes.
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    command: String,
    args: ValueMap,
}

impl Message {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            args: ValueMap::new(),
        }
    }

    pub fn with_args(command: impl Into<String>, args: ValueMap) -> Self {
        Self {
            command: command.into(),
            args,
        }
    }

    /// Builder-style argument insertion.
    pub fn arg(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.args.set(key, value);
        self
    }

    pub fn command(&self) -> &str {
        &self.command
    }

    pub fn args(&self) -> &ValueMap {
        &self.args
    }

    pub fn args_mut(&mut self) -> &mut ValueMap {
        &mut self.args
    }
}
