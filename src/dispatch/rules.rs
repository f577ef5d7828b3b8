//! Declarative working-directory overrides.
//!
//! A rule is keyed on a tool name, one of its argument names, and a set of
//! exact argument values. Root rules pick which directory acts as the
//! boundary for the call; prefix rules rewrite a bare file name into a
//! subpath while the sandbox root is in effect. Calls that match no root rule
//! run in the sandbox root.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Root {
    /// The task-specific sandbox directory; the default boundary.
    Sandbox,
    /// The top-level project directory.
    Project,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RuleEffect {
    UseRoot { root: Root },
    Prefix { prefix: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OverrideRule {
    pub tool: String,
    pub argument: String,
    pub values: Vec<String>,
    pub effect: RuleEffect,
}

impl OverrideRule {
    pub fn use_root(tool: &str, argument: &str, values: &[&str], root: Root) -> Self {
        Self::build(tool, argument, values, RuleEffect::UseRoot { root })
    }

    pub fn prefix(tool: &str, argument: &str, values: &[&str], prefix: &str) -> Self {
        Self::build(
            tool,
            argument,
            values,
            RuleEffect::Prefix {
                prefix: prefix.to_string(),
            },
        )
    }

    fn build(tool: &str, argument: &str, values: &[&str], effect: RuleEffect) -> Self {
        Self {
            tool: tool.to_string(),
            argument: argument.to_string(),
            values: values.iter().map(|v| v.to_string()).collect(),
            effect,
        }
    }

    /// The matched argument value, if this rule applies to the call.
    fn matched<'a>(&self, tool: &str, args: &'a serde_json::Value) -> Option<&'a str> {
        if self.tool != tool {
            return None;
        }
        let value = args.get(&self.argument)?.as_str()?;
        self.values.iter().any(|v| v == value).then_some(value)
    }
}

/// The overrides the bundled calculator workspace was tuned for: the entry
/// points live at the project root, the library modules under `pkg/`.
pub fn calculator_rules() -> Vec<OverrideRule> {
    vec![
        OverrideRule::use_root("list_directory", "directory", &["pkg"], Root::Sandbox),
        OverrideRule::use_root("read_file", "file_path", &["main.py"], Root::Project),
        OverrideRule::use_root("run_script", "file_path", &["tests.py", "main.py"], Root::Project),
        OverrideRule::prefix(
            "read_file",
            "file_path",
            &["calculator.py", "render.py"],
            "pkg/",
        ),
    ]
}

#[derive(Debug, Clone, Default)]
pub struct RuleSet {
    rules: Vec<OverrideRule>,
}

impl RuleSet {
    pub fn new(rules: Vec<OverrideRule>) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &[OverrideRule] {
        &self.rules
    }

    /// First matching root rule wins; no match means the sandbox root.
    pub fn select_root(&self, tool: &str, args: &serde_json::Value) -> Root {
        self.rules
            .iter()
            .find_map(|rule| match &rule.effect {
                RuleEffect::UseRoot { root } => rule.matched(tool, args).map(|_| *root),
                RuleEffect::Prefix { .. } => None,
            })
            .unwrap_or(Root::Sandbox)
    }

    /// Apply prefix rules in place. Only meaningful under the sandbox root.
    pub fn rewrite(&self, tool: &str, args: &mut serde_json::Value, root: Root) {
        if root != Root::Sandbox {
            return;
        }
        for rule in &self.rules {
            let RuleEffect::Prefix { prefix } = &rule.effect else {
                continue;
            };
            let Some(value) = rule.matched(tool, args) else {
                continue;
            };
            if !value.starts_with(prefix.as_str()) {
                let rewritten = format!("{}{}", prefix, value);
                args[rule.argument.as_str()] = serde_json::Value::String(rewritten);
            }
        }
    }

    /// Pick the root for a call and rewrite its arguments accordingly.
    pub fn apply(&self, tool: &str, args: &mut serde_json::Value) -> Root {
        let root = self.select_root(tool, args);
        self.rewrite(tool, args, root);
        root
    }
}
