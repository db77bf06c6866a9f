//! Raw stanza reader. Splits template definition text into stanzas of
//! `field: value` lines; a line whose key is `template` starts a new
//! stanza. Comments (`#`) and blank lines are skipped. Field lines seen
//! before any `template:` line are logged and dropped.

#[derive(Debug, Clone)]
pub struct Stanza {
    /// 1-based line number of the `template:` line, for error reporting.
    pub line: usize,
    pub fields: Vec<(String, String)>,
}

impl Stanza {
    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn name(&self) -> Option<&str> {
        self.get("template")
    }
}

pub fn read_stanzas(text: &str) -> Vec<Stanza> {
    let mut stanzas: Vec<Stanza> = Vec::new();

    for (idx, raw) in text.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let Some((key, value)) = line.split_once(':') else {
            tracing::warn!(line = idx + 1, text = %line, "Skipping malformed line");
            continue;
        };
        let key = key.trim().to_string();
        let value = value.trim().to_string();

        if key == "template" {
            stanzas.push(Stanza {
                line: idx + 1,
                fields: vec![(key, value)],
            });
            continue;
        }

        match stanzas.last_mut() {
            Some(stanza) => stanza.fields.push((key, value)),
            None => {
                tracing::warn!(line = idx + 1, field = %key, "Field before any template stanza");
            }
        }
    }

    stanzas
}
