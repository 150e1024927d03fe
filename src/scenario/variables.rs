use crate::errors::{Result, ScenarioError};
use regex::{Captures, Regex};
use std::collections::BTreeMap;
use std::sync::OnceLock;

fn placeholder() -> &'static Regex {
    static PLACEHOLDER: OnceLock<Regex> = OnceLock::new();
    PLACEHOLDER.get_or_init(|| {
        Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}").expect("placeholder pattern is valid")
    })
}

pub fn is_valid_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Values available to `${name}` placeholders during one scenario run.
#[derive(Debug, Clone, Default)]
pub struct Variables {
    values: BTreeMap<String, String>,
}

impl Variables {
    pub fn new(seed: &BTreeMap<String, String>) -> Self {
        Self {
            values: seed.clone(),
        }
    }

    pub fn set(&mut self, name: &str, value: String) {
        self.values.insert(name.to_string(), value);
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(|v| v.as_str())
    }

    /// Replace every `${name}`; an undefined name is an error.
    pub fn substitute(&self, input: &str) -> Result<String> {
        let mut missing: Option<String> = None;
        let output = placeholder().replace_all(input, |caps: &Captures| {
            let name = &caps[1];
            match self.values.get(name) {
                Some(value) => value.clone(),
                None => {
                    missing.get_or_insert_with(|| name.to_string());
                    String::new()
                }
            }
        });

        match missing {
            Some(name) => Err(ScenarioError::ScenarioParse(format!(
                "undefined variable ${{{}}}",
                name
            ))),
            None => Ok(output.into_owned()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seeded() -> Variables {
        let mut seed = BTreeMap::new();
        seed.insert("username".to_string(), "casuser".to_string());
        seed.insert("peer".to_string(), "https://localhost:8444/cas".to_string());
        Variables::new(&seed)
    }

    #[test]
    fn test_substitute() {
        let mut vars = seeded();
        vars.set("code", "948213".to_string());

        assert_eq!(vars.substitute("${peer}/login").unwrap(), "https://localhost:8444/cas/login");
        assert_eq!(vars.substitute("${username}:${code}").unwrap(), "casuser:948213");
        assert_eq!(vars.substitute("user3+casuser").unwrap(), "user3+casuser");
        assert_eq!(vars.substitute("$username").unwrap(), "$username");
    }

    #[test]
    fn test_undefined_variable() {
        let err = seeded().substitute("${token}").unwrap_err();
        assert!(err.to_string().contains("${token}"));
    }

    #[test]
    fn test_valid_names() {
        assert!(is_valid_name("code"));
        assert!(is_valid_name("_otp2"));
        assert!(!is_valid_name("2fa"));
        assert!(!is_valid_name("my code"));
        assert!(!is_valid_name(""));
    }
}
