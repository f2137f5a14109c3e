//! Inline `style` attribute handling.
//!
//! A deliberately small declaration list: `property: value` pairs split on
//! `;`. There is no selector, shorthand or cascade support.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Single `property: value` declaration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Declaration {
    pub property: String,
    pub value: String,
}

impl Declaration {
    pub fn new(property: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            property: property.into(),
            value: value.into(),
        }
    }
}

/// Ordered list of inline style declarations
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InlineStyle {
    pub declarations: Vec<Declaration>,
}

impl InlineStyle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse style text. Never fails; fragments without a `:` are skipped.
    pub fn parse(text: &str) -> Self {
        let declarations = text
            .split(';')
            .filter_map(|chunk| {
                let (property, value) = chunk.split_once(':')?;
                let property = property.trim().to_ascii_lowercase();
                let value = value.trim();
                if property.is_empty() {
                    return None;
                }
                Some(Declaration::new(property, value))
            })
            .collect();

        Self { declarations }
    }

    /// Value of a property (last declaration wins)
    pub fn get(&self, property: &str) -> Option<&str> {
        self.declarations
            .iter()
            .rev()
            .find(|decl| decl.property == property)
            .map(|decl| decl.value.as_str())
    }

    /// Replace every declaration of `property` with a single one
    pub fn set(&mut self, property: &str, value: impl Into<String>) {
        let value = value.into();
        match self.declarations.iter().position(|d| d.property == property) {
            Some(pos) => {
                self.declarations[pos].value = value;
                let mut index = 0;
                self.declarations.retain(|decl| {
                    let keep = index <= pos || decl.property != property;
                    index += 1;
                    keep
                });
            }
            None => self.declarations.push(Declaration::new(property, value)),
        }
    }

    pub fn remove(&mut self, property: &str) {
        self.declarations.retain(|decl| decl.property != property);
    }

    pub fn is_empty(&self) -> bool {
        self.declarations.is_empty()
    }
}

impl fmt::Display for InlineStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, decl) in self.declarations.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{}: {};", decl.property, decl.value)?;
        }
        Ok(())
    }
}
