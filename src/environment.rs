use std::collections::BTreeMap;
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq)]
struct Var {
    value: String,
    exported: bool,
}

/// Shell variables. Exported ones make up the environment of every spawned stage.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Environment {
    vars: BTreeMap<String, Var>,
}

impl Environment {
    /// Start from the process environment, everything exported.
    pub fn new() -> Self {
        let vars = std::env::vars()
            .map(|(key, value)| {
                let var = Var {
                    value,
                    exported: true,
                };
                (key, var)
            })
            .collect();
        Environment { vars }
    }

    pub fn empty() -> Self {
        Environment::default()
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.vars.get(key).map(|var| var.value.as_str())
    }

    /// Assign without touching the export flag; new variables stay local.
    pub fn set(&mut self, key: &str, value: &str) {
        match self.vars.get_mut(key) {
            Some(var) => var.value = value.to_string(),
            None => {
                self.vars.insert(
                    key.to_string(),
                    Var {
                        value: value.to_string(),
                        exported: false,
                    },
                );
            }
        }
    }

    /// Mark a variable for export, creating it empty if it does not exist yet.
    pub fn export(&mut self, key: &str) {
        self.vars
            .entry(key.to_string())
            .or_insert_with(|| Var {
                value: String::new(),
                exported: false,
            })
            .exported = true;
    }

    pub fn set_exported(&mut self, key: &str, value: &str) {
        self.set(key, value);
        self.export(key);
    }

    pub fn home(&self) -> Option<PathBuf> {
        self.get("HOME").filter(|h| !h.is_empty()).map(PathBuf::from)
    }

    /// `KEY=VALUE` strings for every exported variable, sorted by key.
    pub fn exported_pairs(&self) -> Vec<String> {
        self.vars
            .iter()
            .filter(|(_, var)| var.exported)
            .map(|(key, var)| format!("{}={}", key, var.value))
            .collect()
    }
}
