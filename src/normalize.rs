//! Display names for attribute columns.
//!
//! CSV headers arrive as `memory_gb`, `fan_rpm` and so on; the catalog shows
//! them as `Memory GB`, `Fan RPM`.

use std::collections::HashSet;

#[derive(Debug, Clone)]
pub struct AttributeNormalizer {
    acronyms: HashSet<String>,
}

impl AttributeNormalizer {
    /// `acronyms` are matched case-insensitively.
    pub fn new<I, S>(acronyms: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            acronyms: acronyms
                .into_iter()
                .map(|a| a.as_ref().to_uppercase())
                .collect(),
        }
    }

    pub fn normalize(&self, raw: &str) -> String {
        raw.split(['_', ' '])
            .filter(|word| !word.is_empty())
            .map(|word| {
                let upper = word.to_uppercase();
                if self.acronyms.contains(&upper) {
                    upper
                } else {
                    capitalize(word)
                }
            })
            .collect::<Vec<_>>()
            .join(" ")
    }
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first
            .to_uppercase()
            .chain(chars.flat_map(char::to_lowercase))
            .collect(),
        None => String::new(),
    }
}
