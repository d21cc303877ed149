//! # Behaviour script interpreter module
//!
//! This module provides an interpreter for behaviour scripts, which list the
//! commands an executable should run one after another.
//!
//! A script contains one JSON command per statement, each terminated by a
//! `;`. Lines starting with `#` are comments:
//!
//! ```text
//! # Trace a square then follow the line
//! {"Square": {"side_cm": 30.0}};
//! {"LineFollow": {"k": 1.0}};
//! ```

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use regex::RegexBuilder;
use serde::de::DeserializeOwned;
use std::collections::VecDeque;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A script interpreter.
///
/// After initialising with the path to the script to run use `.next_cmd` to
/// acquire the commands in order.
pub struct ScriptInterpreter<T> {
    script_path: PathBuf,
    cmds: VecDeque<T>
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ScriptError {
    #[error("Could not find the script at {0:?}")]
    ScriptNotFound(PathBuf),

    #[error("Could not load the script: {0}")]
    ScriptLoadError(std::io::Error),

    #[error("The script is empty (or is so bad it can't be read)")]
    ScriptEmpty,

    #[error("Script statement {0} is not a valid command: {1}")]
    InvalidCmd(usize, serde_json::Error)
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl<T> ScriptInterpreter<T>
where
    T: DeserializeOwned
{
    /// Create a new interpreter from the given script path.
    pub fn new<P: AsRef<Path>>(script_path: P) -> Result<Self, ScriptError> {
        let path = PathBuf::from(script_path.as_ref());

        if !path.exists() {
            return Err(ScriptError::ScriptNotFound(path));
        }

        let script = fs::read_to_string(&path)
            .map_err(ScriptError::ScriptLoadError)?;

        let cmds = Self::parse(&script)?;

        Ok(ScriptInterpreter {
            script_path: path,
            cmds
        })
    }

    /// Build an interpreter directly from the text of a script.
    pub fn from_script_str(script: &str) -> Result<Self, ScriptError> {
        Ok(ScriptInterpreter {
            script_path: PathBuf::new(),
            cmds: Self::parse(script)?
        })
    }

    fn parse(script: &str) -> Result<VecDeque<T>, ScriptError> {
        let mut cmds = VecDeque::new();

        // Comment lines are removed before splitting, so a `;` inside a
        // comment doesn't end a statement.
        let comment_re = RegexBuilder::new(r"^\s*#.*$")
            .multi_line(true)
            .build()
            .expect("comment regex is valid");
        let stripped = comment_re.replace_all(script, "");

        let statement_re = RegexBuilder::new(r"([^;]*);")
            .build()
            .expect("statement regex is valid");

        let statements = statement_re
            .captures_iter(&stripped)
            .filter_map(|cap| cap.get(1))
            .map(|m| m.as_str().trim())
            .filter(|s| !s.is_empty());

        for (i, statement) in statements.enumerate() {
            let cmd = serde_json::from_str(statement)
                .map_err(|e| ScriptError::InvalidCmd(i, e))?;

            cmds.push_back(cmd);
        }

        if cmds.is_empty() {
            return Err(ScriptError::ScriptEmpty)
        }

        Ok(cmds)
    }

    /// Return the next command in the script, or `None` at the end of the
    /// script.
    pub fn next_cmd(&mut self) -> Option<T> {
        self.cmds.pop_front()
    }

    /// Get the number of commands remaining in the script
    pub fn get_num_cmds(&self) -> usize {
        self.cmds.len()
    }

    /// Get the path the script was loaded from.
    pub fn script_path(&self) -> &Path {
        &self.script_path
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use serde::Deserialize;

    #[derive(Deserialize, Debug, PartialEq)]
    enum Cmd {
        Stop,
        Move { cm: f64 },
    }

    #[test]
    fn test_parse_script() {
        let script = "\
            # Comment with a ; in it\n\
            {\"Move\": {\"cm\": 10.0}};\n\
            \"Stop\"; {\"Move\": {\"cm\": -5}};\n";

        let mut si: ScriptInterpreter<Cmd> = ScriptInterpreter::from_script_str(script).unwrap();

        assert_eq!(si.get_num_cmds(), 3);
        assert_eq!(si.next_cmd(), Some(Cmd::Move { cm: 10.0 }));
        assert_eq!(si.next_cmd(), Some(Cmd::Stop));
        assert_eq!(si.next_cmd(), Some(Cmd::Move { cm: -5.0 }));
        assert_eq!(si.next_cmd(), None);
    }

    #[test]
    fn test_load_script_file() {
        let path = std::env::temp_dir()
            .join(format!("basebot_script_{}.txt", std::process::id()));
        fs::write(&path, "\"Stop\";\n{\"Move\": {\"cm\": 1.5}};\n").unwrap();

        let mut si: ScriptInterpreter<Cmd> = ScriptInterpreter::new(&path).unwrap();
        fs::remove_file(&path).unwrap();

        assert_eq!(si.script_path(), path.as_path());
        assert_eq!(si.get_num_cmds(), 2);
        assert_eq!(si.next_cmd(), Some(Cmd::Stop));
        assert_eq!(si.next_cmd(), Some(Cmd::Move { cm: 1.5 }));
    }

    #[test]
    fn test_bad_scripts() {
        assert!(matches!(
            ScriptInterpreter::<Cmd>::from_script_str("# nothing here\n"),
            Err(ScriptError::ScriptEmpty)
        ));
        assert!(matches!(
            ScriptInterpreter::<Cmd>::from_script_str("{\"Jump\": 3};"),
            Err(ScriptError::InvalidCmd(0, _))
        ));
        assert!(matches!(
            ScriptInterpreter::<Cmd>::new("/definitely/not/a/script.txt"),
            Err(ScriptError::ScriptNotFound(_))
        ));
    }
}
