use std::collections::HashMap;

/// Mapping key paths supplied by the caller, per top-level variable.
///
/// Mappings cannot be enumerated on chain, so every entry to read must be
/// named. A path lists keys from the outermost mapping inwards:
/// `balances[owner][spender]` is the path `[owner, spender]`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeySet {
    paths: HashMap<String, Vec<Vec<String>>>,
}

impl KeySet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a key path for `label`.
    pub fn insert(&mut self, label: impl Into<String>, path: Vec<String>) {
        self.paths.entry(label.into()).or_default().push(path);
    }

    /// Builder-style [`KeySet::insert`].
    pub fn with_path<S: Into<String>>(mut self, label: &str, path: impl IntoIterator<Item = S>) -> Self {
        self.insert(label, path.into_iter().map(Into::into).collect());
        self
    }

    /// Key paths registered for `label`, in insertion order.
    pub fn paths(&self, label: &str) -> &[Vec<String>] {
        self.paths.get(label).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    /// Parse a `label=key1,key2` argument.
    pub fn parse_arg(arg: &str) -> Result<(String, Vec<String>), String> {
        let (label, keys) = arg
            .split_once('=')
            .ok_or_else(|| format!("expected `label=key[,key...]`, got `{arg}`"))?;
        let label = label.trim();
        if label.is_empty() {
            return Err(format!("missing variable label in `{arg}`"));
        }
        let keys: Vec<String> = keys.split(',').map(|k| k.trim().to_string()).collect();
        if keys.iter().any(String::is_empty) {
            return Err(format!("empty key in `{arg}`"));
        }
        Ok((label.to_string(), keys))
    }

    /// Build a key set from `label=key1,key2` arguments.
    pub fn from_args<S: AsRef<str>>(args: &[S]) -> Result<Self, String> {
        let mut keys = Self::new();
        for arg in args {
            let (label, path) = Self::parse_arg(arg.as_ref())?;
            keys.insert(label, path);
        }
        Ok(keys)
    }
}
