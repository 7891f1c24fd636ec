use serde::{Deserialize, Serialize};

/// A single named note: the name is the unique key, the value is free text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Note {
    pub name: String,
    pub value: String,
}

impl Note {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_note() {
        let note = Note::new("shopping", "milk\neggs");
        assert_eq!(note.name, "shopping");
        assert_eq!(note.value, "milk\neggs");
    }
}
