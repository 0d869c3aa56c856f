//! Interactive prompting for arguments left unset on the command line.

use std::io;

use dialoguer::{Input, Password};
use log::debug;

/// How a prompt-able argument is asked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptKind {
    Text,
    /// Input is not echoed.
    Secret,
}

/// One argument that may be requested interactively.
pub struct PromptSpec<T> {
    /// Argument name, for logs.
    pub argument: &'static str,

    /// Text shown to the operator.
    pub label: &'static str,

    pub kind: PromptKind,

    /// Whether the argument already has a value.
    pub is_set: fn(&T) -> bool,

    /// Store the answer.
    pub set: fn(&mut T, String),
}

/// Source of answers.
pub trait Prompter {
    fn ask(&mut self, label: &str, kind: PromptKind) -> io::Result<String>;
}

/// Asks on the terminal.
#[derive(Debug, Default)]
pub struct TerminalPrompter;

impl Prompter for TerminalPrompter {
    fn ask(&mut self, label: &str, kind: PromptKind) -> io::Result<String> {
        match kind {
            PromptKind::Text => Input::<String>::new()
                .with_prompt(label)
                .interact_text()
                .map_err(io::Error::other),
            PromptKind::Secret => Password::new()
                .with_prompt(label)
                .interact()
                .map_err(io::Error::other),
        }
    }
}

/// Ask for every argument in `specs` that `target` does not have yet, in
/// list order.
pub fn fill_missing<T, P: Prompter>(
    target: &mut T,
    specs: &[PromptSpec<T>],
    prompter: &mut P,
) -> io::Result<()> {
    for spec in specs {
        if (spec.is_set)(target) {
            continue;
        }
        debug!("prompting for {}", spec.argument);
        let answer = prompter.ask(spec.label, spec.kind)?;
        (spec.set)(target, answer);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Args {
        user: Option<String>,
        password: Option<String>,
    }

    const SPECS: &[PromptSpec<Args>] = &[
        PromptSpec {
            argument: "user",
            label: "Username",
            kind: PromptKind::Text,
            is_set: |a| a.user.is_some(),
            set: |a, v| a.user = Some(v),
        },
        PromptSpec {
            argument: "password",
            label: "Password",
            kind: PromptKind::Secret,
            is_set: |a| a.password.is_some(),
            set: |a, v| a.password = Some(v),
        },
    ];

    struct Scripted {
        asked: Vec<(String, PromptKind)>,
    }

    impl Prompter for Scripted {
        fn ask(&mut self, label: &str, kind: PromptKind) -> io::Result<String> {
            self.asked.push((label.to_string(), kind));
            Ok(format!("answer-{}", label.to_lowercase()))
        }
    }

    #[test]
    fn test_fills_only_unset() {
        let mut args = Args {
            user: Some("admin".into()),
            password: None,
        };
        let mut prompter = Scripted { asked: vec![] };

        fill_missing(&mut args, SPECS, &mut prompter).unwrap();

        assert_eq!(args.user.as_deref(), Some("admin"));
        assert_eq!(args.password.as_deref(), Some("answer-password"));
        assert_eq!(
            prompter.asked,
            vec![("Password".to_string(), PromptKind::Secret)]
        );
    }

    #[test]
    fn test_nothing_to_ask() {
        let mut args = Args {
            user: Some("admin".into()),
            password: Some("pw".into()),
        };
        let mut prompter = Scripted { asked: vec![] };

        fill_missing(&mut args, SPECS, &mut prompter).unwrap();
        assert!(prompter.asked.is_empty());
    }

    #[test]
    fn test_prompt_error_propagates() {
        struct Closed;
        impl Prompter for Closed {
            fn ask(&mut self, _: &str, _: PromptKind) -> io::Result<String> {
                Err(io::Error::new(io::ErrorKind::UnexpectedEof, "stdin closed"))
            }
        }

        let mut args = Args::default();
        assert!(fill_missing(&mut args, SPECS, &mut Closed).is_err());
        assert!(args.user.is_none());
    }
}
