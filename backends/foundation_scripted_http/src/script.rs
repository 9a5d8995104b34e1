//! The fixed, ordered sequence of instructions one handler serves.

use core::time::Duration;
use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Deserialize;
use serde_with::{serde_as, DurationMilliSeconds};

use crate::errors::{ScriptError, ScriptResult};
use crate::headers::HeaderName;
use crate::instruction::Instruction;

/// An immutable, cheaply cloneable list of [`Instruction`]s.
///
/// The i-th request a handler receives is answered with the i-th
/// instruction; requests beyond the end are answered with a diagnostic
/// `400 Bad Request`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Script {
    instructions: Arc<[Instruction]>,
}

impl Script {
    #[must_use]
    pub fn new(instructions: Vec<Instruction>) -> Self {
        Self {
            instructions: instructions.into(),
        }
    }

    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }

    #[must_use]
    pub fn get(&self, index: usize) -> Option<&Instruction> {
        self.instructions.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Instruction> {
        self.instructions.iter()
    }

    /// Parses a script from its TOML description.
    ///
    /// Each `[[instruction]]` table becomes one instruction, in file order.
    /// Durations are given in milliseconds; a missing `body` key means the
    /// response has no body at all.
    ///
    /// ```rust
    /// use foundation_scripted_http::Script;
    ///
    /// let script = Script::from_toml_str(r#"
    ///     [[instruction]]
    ///     status_code = 200
    ///     header_delay_ms = 5
    ///     body = "hello"
    ///
    ///     [[instruction]]
    ///     status_code = 204
    /// "#).unwrap();
    ///
    /// assert_eq!(script.len(), 2);
    /// assert!(script.get(1).unwrap().body.is_none());
    /// ```
    ///
    /// # Errors
    ///
    /// Returns [`ScriptError::DeserializationFailed`] when the document is
    /// not a valid script description.
    pub fn from_toml_str(content: &str) -> ScriptResult<Self> {
        let raw: ScriptDescription = toml::from_str(content)?;
        Ok(raw.instruction.into_iter().map(Instruction::from).collect())
    }

    /// Reads and parses a TOML script description from `target`.
    ///
    /// # Errors
    ///
    /// Returns [`ScriptError::InvalidPath`] when `target` is not a file,
    /// [`ScriptError::IOError`] when it cannot be read and
    /// [`ScriptError::DeserializationFailed`] when it does not parse.
    pub fn from_path<V: Into<std::path::PathBuf>>(target: V) -> ScriptResult<Self> {
        let target_path = target.into();
        if !target_path.is_file() {
            return Err(ScriptError::InvalidPath(target_path));
        }
        let content = std::fs::read_to_string(target_path)?;
        Self::from_toml_str(&content)
    }
}

impl From<Vec<Instruction>> for Script {
    fn from(value: Vec<Instruction>) -> Self {
        Self::new(value)
    }
}

impl<const N: usize> From<[Instruction; N]> for Script {
    fn from(value: [Instruction; N]) -> Self {
        Self::new(value.into())
    }
}

impl FromIterator<Instruction> for Script {
    fn from_iter<T: IntoIterator<Item = Instruction>>(iter: T) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ScriptDescription {
    #[serde(default)]
    instruction: Vec<InstructionDescription>,
}

#[serde_as]
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct InstructionDescription {
    status_code: u16,

    #[serde_as(as = "DurationMilliSeconds<u64>")]
    #[serde(default, rename = "header_delay_ms")]
    header_delay: Duration,

    #[serde_as(as = "DurationMilliSeconds<u64>")]
    #[serde(default, rename = "body_delay_ms")]
    body_delay: Duration,

    #[serde_as(as = "DurationMilliSeconds<u64>")]
    #[serde(default, rename = "body_service_time_ms")]
    body_service_time: Duration,

    #[serde(default)]
    headers: BTreeMap<String, Vec<String>>,

    body: Option<String>,
}

impl From<InstructionDescription> for Instruction {
    fn from(value: InstructionDescription) -> Self {
        let mut inst = Instruction::new(value.status_code)
            .header_delay(value.header_delay)
            .body_delay(value.body_delay)
            .body_service_time(value.body_service_time);

        for (name, values) in value.headers {
            inst.headers
                .entry(HeaderName::new(name))
                .or_default()
                .extend(values);
        }

        inst.body = value.body.map(String::into_bytes);
        inst
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_script_preserves_order() {
        let script = Script::from([
            Instruction::new(200),
            Instruction::new(404),
            Instruction::new(500),
        ]);

        let codes: Vec<u16> = script.iter().map(|inst| inst.status_code).collect();
        assert_eq!(codes, vec![200, 404, 500]);
        assert_eq!(script.len(), 3);
        assert!(script.get(3).is_none());
    }

    #[test]
    fn test_empty_script() {
        let script = Script::empty();
        assert!(script.is_empty());
        assert!(script.get(0).is_none());
    }

    #[test]
    fn test_parses_full_instruction() {
        let script = Script::from_toml_str(
            r#"
            [[instruction]]
            status_code = 400
            header_delay_ms = 5
            body_delay_ms = 7
            body_service_time_ms = 20
            body = "baz"

            [instruction.headers]
            foo = ["Bar"]
            content-length = ["1111"]
            "#,
        )
        .expect("should parse script");

        let inst = script.get(0).expect("should have one instruction");
        assert_eq!(inst.status_code, 400);
        assert_eq!(inst.header_delay, Duration::from_millis(5));
        assert_eq!(inst.body_delay, Duration::from_millis(7));
        assert_eq!(inst.body_service_time, Duration::from_millis(20));
        assert_eq!(inst.body.as_deref(), Some(&b"baz"[..]));
        assert_eq!(
            inst.headers.get(&HeaderName::new("Foo")),
            Some(&vec!["Bar".to_string()])
        );
        assert_eq!(
            inst.headers.get(&HeaderName::new("Content-Length")),
            Some(&vec!["1111".to_string()])
        );
    }

    #[test]
    fn test_missing_body_key_means_no_body() {
        let script = Script::from_toml_str(
            r#"
            [[instruction]]
            status_code = 200

            [[instruction]]
            status_code = 500
            body = ""
            "#,
        )
        .expect("should parse script");

        assert_eq!(script.get(0).and_then(|i| i.body.clone()), None);
        assert_eq!(script.get(1).and_then(|i| i.body.clone()), Some(Vec::new()));
    }

    #[test]
    fn test_document_without_instructions_is_empty_script() {
        let script = Script::from_toml_str("").expect("should parse script");
        assert!(script.is_empty());
    }

    #[test]
    fn test_missing_status_code_is_rejected() {
        let err = Script::from_toml_str("[[instruction]]\nbody = \"x\"\n")
            .expect_err("status code is required");
        assert!(matches!(err, ScriptError::DeserializationFailed(_)));
    }

    #[test]
    fn test_unknown_keys_are_rejected() {
        let err = Script::from_toml_str("[[instruction]]\nstatus_code = 200\nstatus = 1\n")
            .expect_err("unknown key should fail");
        assert!(matches!(err, ScriptError::DeserializationFailed(_)));
    }

    #[test]
    fn test_from_path_rejects_missing_file() {
        let missing = std::env::temp_dir().join("scripted-http-does-not-exist.toml");
        let err = Script::from_path(&missing).expect_err("missing file should fail");
        assert!(matches!(err, ScriptError::InvalidPath(path) if path == missing));
    }

    #[test]
    fn test_from_path_reads_file() {
        let target = std::env::temp_dir().join(format!(
            "scripted-http-{}-from-path.toml",
            std::process::id()
        ));
        std::fs::write(&target, "[[instruction]]\nstatus_code = 201\n")
            .expect("should write script file");

        let script = Script::from_path(&target);
        let _ = std::fs::remove_file(&target);

        let script = script.expect("should load script");
        assert_eq!(script.get(0).map(|i| i.status_code), Some(201));
    }
}
