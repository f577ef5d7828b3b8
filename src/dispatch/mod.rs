pub mod rules;

use crate::config::Config;
use crate::security::path::PathGuard;
use crate::tools::{default_registry, ToolError, ToolRegistry};
use rules::{Root, RuleSet};
use serde::{Deserialize, Serialize};
use std::panic::{self, AssertUnwindSafe};
use std::path::PathBuf;

/// Wire-level reply for one tool call: exactly one of `{"result": ..}` or `{"error": ..}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Envelope {
    Result(String),
    Error(String),
}

impl Envelope {
    pub fn is_error(&self) -> bool {
        matches!(self, Envelope::Error(_))
    }
}

/// A named tool call as emitted by the model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolInvocation {
    pub name: String,
    #[serde(default)]
    pub arguments: serde_json::Map<String, serde_json::Value>,
}

/// Routes tool calls to the registry, picks the boundary for each call, and
/// folds every outcome into an [`Envelope`].
pub struct Dispatcher {
    registry: ToolRegistry,
    sandbox_root: PathBuf,
    project_root: PathBuf,
    rules: RuleSet,
}

impl Dispatcher {
    pub fn new(
        registry: ToolRegistry,
        sandbox_root: impl Into<PathBuf>,
        project_root: impl Into<PathBuf>,
        rules: RuleSet,
    ) -> Self {
        Self {
            registry,
            sandbox_root: sandbox_root.into(),
            project_root: project_root.into(),
            rules,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            default_registry(config),
            &config.sandbox.root,
            &config.sandbox.project_root,
            RuleSet::new(config.rules.clone()),
        )
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    pub fn invoke_call(&self, call: ToolInvocation) -> Envelope {
        self.invoke(&call.name, serde_json::Value::Object(call.arguments))
    }

    pub fn invoke(&self, name: &str, arguments: serde_json::Value) -> Envelope {
        tracing::info!(tool = name, "calling function");
        match self.call(name, arguments) {
            Ok(value) => Envelope::Result(value),
            Err(e) => {
                tracing::debug!(tool = name, kind = ?e.kind(), error = %e, "function failed");
                Envelope::Error(e.to_string())
            }
        }
    }

    fn call(&self, name: &str, arguments: serde_json::Value) -> Result<String, ToolError> {
        let tool = self.registry.get(name).ok_or_else(|| {
            tracing::warn!(tool = name, "unknown function");
            ToolError::UnknownTool(name.to_string())
        })?;

        let mut args = match arguments {
            serde_json::Value::Null => serde_json::Value::Object(serde_json::Map::new()),
            serde_json::Value::Object(_) => arguments,
            other => {
                return Err(ToolError::ExecutionFailure(format!(
                    "arguments must be an object, got {}",
                    other
                )))
            }
        };

        let root = self.rules.apply(name, &mut args);
        let boundary = match root {
            Root::Sandbox => &self.sandbox_root,
            Root::Project => &self.project_root,
        };
        tracing::debug!(
            tool = name,
            args = %args,
            ?root,
            boundary = %boundary.display(),
            "resolved working directory"
        );

        let guard = PathGuard::new(boundary)?;

        match panic::catch_unwind(AssertUnwindSafe(|| tool.execute(&guard, args))) {
            Ok(Err(ToolError::InvalidArguments(msg))) => Err(ToolError::ExecutionFailure(msg)),
            Ok(outcome) => outcome,
            Err(payload) => {
                let msg = panic_message(payload.as_ref());
                tracing::error!(tool = name, panic = %msg, "function panicked");
                Err(ToolError::ExecutionFailure(msg))
            }
        }
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
