//! Instruction-based JSON contributions.
//!
//! A contributor whose top level is an object holding
//! [`INSTRUCTIONS_KEY`] is not deep-merged. Its instructions are applied to
//! the target in order instead, each addressing a node by JSON Pointer
//! (RFC 6901):
//!
//! ```json
//! {
//!   "$instructions": [
//!     {"path": "/tags", "action": "add", "value": "heavy"},
//!     {"path": "/stats/heat", "action": "remove"},
//!     {"path": "/slots/1", "action": "add_before", "value": "ammo"}
//!   ]
//! }
//! ```

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::strategy::merge_json_values;

/// Top-level key marking an instruction contributor.
pub const INSTRUCTIONS_KEY: &str = "$instructions";

/// What an instruction does with the node at its path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InstructionAction {
    /// Append `value` to the array at the path.
    Add,
    /// Insert `value` after the array element at the path.
    AddAfter,
    /// Insert `value` before the array element at the path.
    AddBefore,
    /// Append every element of the `value` array to the array at the path.
    Concat,
    /// Deep-merge the `value` object into the object at the path.
    Merge,
    /// Remove the object member or array element at the path.
    Remove,
    /// Replace the node at the path with `value`.
    Replace,
}

/// One edit applied to a JSON target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Instruction {
    /// JSON Pointer to the node to edit.
    pub path: String,

    pub action: InstructionAction,

    /// Operand; unused by `remove`.
    #[serde(default)]
    pub value: Value,
}

impl Instruction {
    /// Apply the instruction to `root`.
    pub fn apply(&self, root: &mut Value) -> Result<(), String> {
        match self.action {
            InstructionAction::Replace => {
                *self.node(root)? = self.value.clone();
            }
            InstructionAction::Merge => match (self.node(root)?, &self.value) {
                (target @ Value::Object(_), Value::Object(_)) => {
                    merge_json_values(target, self.value.clone());
                }
                _ => return Err(self.fail("needs an object at the path and an object value")),
            },
            InstructionAction::Add => match self.node(root)? {
                Value::Array(items) => items.push(self.value.clone()),
                _ => return Err(self.fail("needs an array at the path")),
            },
            InstructionAction::Concat => match (self.node(root)?, &self.value) {
                (Value::Array(items), Value::Array(more)) => items.extend(more.iter().cloned()),
                _ => return Err(self.fail("needs an array at the path and an array value")),
            },
            InstructionAction::Remove
            | InstructionAction::AddAfter
            | InstructionAction::AddBefore => self.edit_parent(root)?,
        }
        Ok(())
    }

    fn node<'a>(&self, root: &'a mut Value) -> Result<&'a mut Value, String> {
        root.pointer_mut(&self.path)
            .ok_or_else(|| self.fail("path does not exist"))
    }

    /// Actions that change the container holding the addressed node.
    fn edit_parent(&self, root: &mut Value) -> Result<(), String> {
        let Some((parent_path, token)) = self.path.rsplit_once('/') else {
            return Err(self.fail("cannot edit the document root"));
        };
        let token = token.replace("~1", "/").replace("~0", "~");
        let parent = root
            .pointer_mut(parent_path)
            .ok_or_else(|| self.fail("path does not exist"))?;

        match (parent, self.action) {
            (Value::Object(members), InstructionAction::Remove) => members
                .remove(&token)
                .map(|_| ())
                .ok_or_else(|| self.fail("path does not exist")),
            (Value::Object(_), _) => Err(self.fail("needs an array element at the path")),
            (Value::Array(items), action) => {
                let index = token
                    .parse::<usize>()
                    .ok()
                    .filter(|i| *i < items.len())
                    .ok_or_else(|| self.fail("path does not exist"))?;
                match action {
                    InstructionAction::Remove => {
                        items.remove(index);
                    }
                    InstructionAction::AddAfter => items.insert(index + 1, self.value.clone()),
                    _ => items.insert(index, self.value.clone()),
                }
                Ok(())
            }
            _ => Err(self.fail("path does not exist")),
        }
    }

    fn fail(&self, reason: &str) -> String {
        format!("{:?} at '{}': {}", self.action, self.path, reason)
    }
}

/// Apply one contributor document to `target`.
///
/// Instruction contributors run their instructions; anything else is
/// deep-merged with [`merge_json_values`]. An instruction error names the
/// failing instruction by position.
pub fn apply_contribution(target: &mut Value, patch: Value) -> Result<(), String> {
    let instructions = match patch {
        Value::Object(mut members) if members.contains_key(INSTRUCTIONS_KEY) => {
            members.remove(INSTRUCTIONS_KEY).unwrap_or_default()
        }
        patch => {
            merge_json_values(target, patch);
            return Ok(());
        }
    };

    let instructions: Vec<Instruction> = serde_json::from_value(instructions)
        .map_err(|e| format!("invalid {}: {}", INSTRUCTIONS_KEY, e))?;
    for (i, instruction) in instructions.iter().enumerate() {
        instruction
            .apply(target)
            .map_err(|reason| format!("instruction {}: {}", i + 1, reason))?;
    }
    Ok(())
}
