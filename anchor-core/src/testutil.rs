//! Scripted [`CommandRunner`] for unit tests.
//!
//! Rules are matched in insertion order: the program name must be equal and
//! every rule token must appear in the call's arguments, in order. Unmatched
//! calls fail the way a missing binary would.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::io;
use std::time::Duration;

use crate::cmd::{CommandRunner, Execution};

#[derive(Debug, Clone)]
enum Outcome {
    Run(Execution),
    Err(io::ErrorKind, String),
}

impl Outcome {
    fn produce(&self) -> io::Result<Execution> {
        match self {
            Outcome::Run(run) => Ok(run.clone()),
            Outcome::Err(kind, message) => Err(io::Error::new(*kind, message.clone())),
        }
    }
}

#[derive(Debug)]
struct Rule {
    program: String,
    tokens: Vec<String>,
    outcomes: VecDeque<Outcome>,
}

impl Rule {
    fn matches(&self, program: &str, args: &[&str]) -> bool {
        if self.program != program {
            return false;
        }
        let mut position = 0;
        for token in &self.tokens {
            match args[position..].iter().position(|arg| arg == token) {
                Some(offset) => position += offset + 1,
                None => return false,
            }
        }
        true
    }

    /// Consume the next scripted outcome; the last one repeats forever.
    fn next(&mut self) -> io::Result<Execution> {
        if self.outcomes.len() > 1 {
            self.outcomes
                .pop_front()
                .map(|outcome| outcome.produce())
                .unwrap_or_else(|| Err(io::Error::other("empty rule")))
        } else {
            self.outcomes
                .front()
                .map(Outcome::produce)
                .unwrap_or_else(|| Err(io::Error::other("empty rule")))
        }
    }
}

#[derive(Debug, Default)]
pub(crate) struct MockRunner {
    installed: Vec<String>,
    rules: RefCell<Vec<Rule>>,
    calls: RefCell<Vec<String>>,
}

pub(crate) fn ok(stdout: &str) -> Execution {
    Execution {
        exit_code: Some(0),
        stdout: stdout.as_bytes().to_vec(),
        stderr: Vec::new(),
    }
}

pub(crate) fn fail(code: i32, stderr: &str) -> Execution {
    Execution {
        exit_code: Some(code),
        stdout: Vec::new(),
        stderr: stderr.as_bytes().to_vec(),
    }
}

impl MockRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark programs as present on the PATH.
    pub fn installed(mut self, programs: &[&str]) -> Self {
        self.installed
            .extend(programs.iter().map(ToString::to_string));
        self
    }

    fn rule(self, program: &str, tokens: &[&str], outcomes: Vec<Outcome>) -> Self {
        self.rules.borrow_mut().push(Rule {
            program: program.to_string(),
            tokens: tokens.iter().map(ToString::to_string).collect(),
            outcomes: outcomes.into(),
        });
        self
    }

    /// Successful run producing `stdout`.
    pub fn on_ok(self, program: &str, tokens: &[&str], stdout: &str) -> Self {
        self.rule(program, tokens, vec![Outcome::Run(ok(stdout))])
    }

    /// Run exiting with `code` and `stderr`.
    pub fn on_fail(self, program: &str, tokens: &[&str], code: i32, stderr: &str) -> Self {
        self.rule(program, tokens, vec![Outcome::Run(fail(code, stderr))])
    }

    /// Spawn failure, as if the binary vanished.
    pub fn on_spawn_err(self, program: &str, tokens: &[&str]) -> Self {
        self.rule(
            program,
            tokens,
            vec![Outcome::Err(
                io::ErrorKind::NotFound,
                format!("{program}: no such file or directory"),
            )],
        )
    }

    /// Scripted sequence of results; the last one repeats once exhausted.
    pub fn on_results(self, program: &str, tokens: &[&str], results: Vec<Execution>) -> Self {
        self.rule(
            program,
            tokens,
            results.into_iter().map(Outcome::Run).collect(),
        )
    }

    /// Every recorded subprocess invocation, rendered as a command line.
    pub fn calls(&self) -> Vec<String> {
        self.calls.borrow().clone()
    }

    /// Number of recorded invocations containing `needle`.
    pub fn call_count(&self, needle: &str) -> usize {
        self.calls
            .borrow()
            .iter()
            .filter(|call| call.contains(needle))
            .count()
    }

    fn dispatch(&self, program: &str, args: &[&str]) -> io::Result<Execution> {
        let rendered = if args.is_empty() {
            program.to_string()
        } else {
            format!("{program} {}", args.join(" "))
        };
        self.calls.borrow_mut().push(rendered.clone());
        let mut rules = self.rules.borrow_mut();
        for rule in rules.iter_mut() {
            if rule.matches(program, args) {
                return rule.next();
            }
        }
        Err(io::Error::new(
            io::ErrorKind::NotFound,
            format!("no rule for: {rendered}"),
        ))
    }
}

impl CommandRunner for MockRunner {
    fn output(&self, program: &str, args: &[&str]) -> io::Result<Execution> {
        self.dispatch(program, args)
    }

    fn stream(&self, program: &str, args: &[&str]) -> io::Result<Execution> {
        self.dispatch(program, args)
    }

    fn output_within(
        &self,
        program: &str,
        args: &[&str],
        _deadline: Duration,
    ) -> io::Result<Execution> {
        self.dispatch(program, args)
    }

    fn installed(&self, program: &str) -> bool {
        self.installed.iter().any(|name| name == program)
    }
}

// Lets a test keep a handle on the runner after boxing a clone of the Rc
// into a Connection.
impl CommandRunner for std::rc::Rc<MockRunner> {
    fn output(&self, program: &str, args: &[&str]) -> io::Result<Execution> {
        (**self).output(program, args)
    }

    fn stream(&self, program: &str, args: &[&str]) -> io::Result<Execution> {
        (**self).stream(program, args)
    }

    fn output_within(
        &self,
        program: &str,
        args: &[&str],
        deadline: Duration,
    ) -> io::Result<Execution> {
        (**self).output_within(program, args, deadline)
    }

    fn installed(&self, program: &str) -> bool {
        CommandRunner::installed(&**self, program)
    }
}
