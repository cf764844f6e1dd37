//! Collision-avoiding output filenames
//!
//! Both the CSV data file and the info file resolve their names here: a
//! name that already exists on disk is either overwritten (the operator
//! confirmed) or given the first free numeric suffix, `base(1)`,
//! `base(2)`, and so on. Overwriting an unrelated session's files by
//! accident is the one mistake this module exists to prevent.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Width the subject identifier is zero-padded to in filenames
const SUBJECT_PAD_WIDTH: usize = 3;

/// When to consult the overwrite prompt
///
/// Both variants exist in the wild; `AskOnce` is the default. Under
/// `AskOnce` the first answer is remembered and reused for every later
/// collision in the session, so the data file and the info file are
/// governed by a single decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverwritePolicy {
    /// Ask on the first collision and remember the answer
    #[default]
    AskOnce,
    /// Ask on every collision
    AskEveryTime,
}

/// The confirm-overwrite collaborator
///
/// In a live experiment this is a modal yes/no dialog shown to the
/// operator; headless callers use [`AlwaysOverwrite`] or
/// [`NeverOverwrite`].
pub trait OverwritePrompt {
    /// Ask whether `path` may be overwritten
    fn confirm_overwrite(&mut self, path: &Path) -> bool;
}

/// Prompt that always allows overwriting
#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysOverwrite;

impl OverwritePrompt for AlwaysOverwrite {
    fn confirm_overwrite(&mut self, _path: &Path) -> bool {
        true
    }
}

/// Prompt that never allows overwriting; collisions get numeric suffixes
#[derive(Debug, Clone, Copy, Default)]
pub struct NeverOverwrite;

impl OverwritePrompt for NeverOverwrite {
    fn confirm_overwrite(&mut self, _path: &Path) -> bool {
        false
    }
}

/// Applies the configured [`OverwritePolicy`] to a prompt
pub(crate) struct OverwriteResolver {
    policy: OverwritePolicy,
    prompt: Box<dyn OverwritePrompt>,
    remembered: Option<bool>,
}

impl OverwriteResolver {
    pub(crate) fn new(policy: OverwritePolicy, prompt: Box<dyn OverwritePrompt>) -> Self {
        Self {
            policy,
            prompt,
            remembered: None,
        }
    }

    /// Decide whether `path` may be overwritten, caching per policy
    fn confirm(&mut self, path: &Path) -> bool {
        match self.policy {
            OverwritePolicy::AskEveryTime => self.prompt.confirm_overwrite(path),
            OverwritePolicy::AskOnce => match self.remembered {
                Some(decision) => decision,
                None => {
                    let decision = self.prompt.confirm_overwrite(path);
                    self.remembered = Some(decision);
                    decision
                }
            },
        }
    }

    /// Resolve `base.ext` under `dir` to a path that is safe to create.
    ///
    /// Returns the plain name when it is unused or the operator allowed
    /// overwriting, otherwise the first free `base(i).ext`.
    pub(crate) fn resolve(&mut self, dir: &Path, base: &str, ext: &str) -> PathBuf {
        let candidate = dir.join(format!("{}.{}", base, ext));
        if !candidate.exists() || self.confirm(&candidate) {
            return candidate;
        }

        let mut i = 1;
        loop {
            let suffixed = dir.join(format!("{}({}).{}", base, i, ext));
            if !suffixed.exists() {
                tracing::info!(
                    "{} exists, writing to {} instead",
                    candidate.display(),
                    suffixed.display()
                );
                return suffixed;
            }
            i += 1;
        }
    }
}

/// Zero-pad a subject identifier to three digits
///
/// Identifiers already three characters or longer pass through unchanged.
pub fn pad_subject_number(subject: &str) -> String {
    if subject.len() >= SUBJECT_PAD_WIDTH {
        subject.to_string()
    } else {
        format!("{:0>width$}", subject, width = SUBJECT_PAD_WIDTH)
    }
}

/// Strip a trailing `.ext` from a caller-supplied base name
pub(crate) fn strip_extension<'a>(name: &'a str, ext: &str) -> &'a str {
    let suffix = format!(".{}", ext);
    name.strip_suffix(suffix.as_str()).unwrap_or(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    /// Prompt that pops scripted answers and counts how often it was asked
    pub(crate) struct ScriptedPrompt {
        answers: Vec<bool>,
        pub(crate) asked: Rc<RefCell<usize>>,
    }

    impl ScriptedPrompt {
        pub(crate) fn new(answers: Vec<bool>) -> Self {
            Self {
                answers,
                asked: Rc::new(RefCell::new(0)),
            }
        }
    }

    impl OverwritePrompt for ScriptedPrompt {
        fn confirm_overwrite(&mut self, _path: &Path) -> bool {
            *self.asked.borrow_mut() += 1;
            self.answers.remove(0)
        }
    }

    #[test]
    fn test_pad_subject_number() {
        assert_eq!(pad_subject_number("0"), "000");
        assert_eq!(pad_subject_number("12"), "012");
        assert_eq!(pad_subject_number("123"), "123");
        assert_eq!(pad_subject_number("1234"), "1234");
    }

    #[test]
    fn test_strip_extension() {
        assert_eq!(strip_extension("run1.csv", "csv"), "run1");
        assert_eq!(strip_extension("run1", "csv"), "run1");
        assert_eq!(strip_extension("run1.txt", "csv"), "run1.txt");
    }

    #[test]
    fn test_resolve_unused_name_never_prompts() {
        let dir = tempfile::tempdir().unwrap();
        let prompt = ScriptedPrompt::new(vec![]);
        let asked = prompt.asked.clone();
        let mut resolver = OverwriteResolver::new(OverwritePolicy::AskOnce, Box::new(prompt));

        let path = resolver.resolve(dir.path(), "exp_001", "csv");
        assert_eq!(path, dir.path().join("exp_001.csv"));
        assert_eq!(*asked.borrow(), 0);
    }

    #[test]
    fn test_resolve_declined_picks_first_free_suffix() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("exp_001.csv"), "").unwrap();
        std::fs::write(dir.path().join("exp_001(1).csv"), "").unwrap();

        let mut resolver =
            OverwriteResolver::new(OverwritePolicy::AskOnce, Box::new(NeverOverwrite));
        let path = resolver.resolve(dir.path(), "exp_001", "csv");
        assert_eq!(path, dir.path().join("exp_001(2).csv"));
    }

    #[test]
    fn test_ask_once_caches_decision() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.csv"), "").unwrap();
        std::fs::write(dir.path().join("b.txt"), "").unwrap();

        let prompt = ScriptedPrompt::new(vec![false]);
        let asked = prompt.asked.clone();
        let mut resolver = OverwriteResolver::new(OverwritePolicy::AskOnce, Box::new(prompt));

        assert_eq!(
            resolver.resolve(dir.path(), "a", "csv"),
            dir.path().join("a(1).csv")
        );
        assert_eq!(
            resolver.resolve(dir.path(), "b", "txt"),
            dir.path().join("b(1).txt")
        );
        assert_eq!(*asked.borrow(), 1);
    }

    #[test]
    fn test_ask_every_time_prompts_per_collision() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.csv"), "").unwrap();
        std::fs::write(dir.path().join("b.txt"), "").unwrap();

        let prompt = ScriptedPrompt::new(vec![false, true]);
        let asked = prompt.asked.clone();
        let mut resolver = OverwriteResolver::new(OverwritePolicy::AskEveryTime, Box::new(prompt));

        assert_eq!(
            resolver.resolve(dir.path(), "a", "csv"),
            dir.path().join("a(1).csv")
        );
        // Second collision re-prompts and is allowed through.
        assert_eq!(
            resolver.resolve(dir.path(), "b", "txt"),
            dir.path().join("b.txt")
        );
        assert_eq!(*asked.borrow(), 2);
    }
}
