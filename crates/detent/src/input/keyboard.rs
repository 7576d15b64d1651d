use std::collections::BTreeMap;

/// Key-to-command table of one keyboard device. Unmapped keys pass through by name.
#[derive(Debug, Clone, Default)]
pub struct Keyboard {
    keys: BTreeMap<String, String>,
}

impl Keyboard {
    pub fn new(keys: &BTreeMap<String, String>) -> Self {
        Self {
            keys: keys
                .iter()
                .map(|(k, v)| (k.to_lowercase(), v.clone()))
                .collect(),
        }
    }

    pub fn command<'a>(&'a self, key: &'a str) -> &'a str {
        self.keys
            .get(&key.to_lowercase())
            .map(String::as_str)
            .unwrap_or(key)
    }
}
