//! Recording fake runtime for tests.
//!
//! Responses are scripted per command key (see [`command_key`]). Queued
//! responses are consumed first, then the sticky response for the key, then
//! a plain success with empty output.

use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::{CommandOutput, ContainerRuntime, RuntimeError, RuntimeFut};

/// A scripted reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FakeResponse {
    Ok(String),
    Fail { code: i32, stderr: String },
    Missing,
}

impl FakeResponse {
    #[must_use]
    pub fn fail(code: i32, stderr: &str) -> Self {
        Self::Fail {
            code,
            stderr: stderr.to_string(),
        }
    }

    /// What docker prints when its daemon socket is not up.
    #[must_use]
    pub fn daemon_down() -> Self {
        Self::fail(
            1,
            "Cannot connect to the Docker daemon at unix:///var/run/docker.sock. Is the docker daemon running?",
        )
    }

    fn into_result(self, binary: &str, args: &[String]) -> Result<CommandOutput, RuntimeError> {
        match self {
            Self::Ok(stdout) => Ok(CommandOutput::with_stdout(stdout)),
            Self::Fail { code, stderr } => Err(RuntimeError::Failed {
                binary: binary.to_string(),
                command: args.join(" "),
                code: Some(code),
                stderr,
            }),
            Self::Missing => Err(RuntimeError::ToolMissing {
                binary: binary.to_string(),
            }),
        }
    }
}

/// `container top x` → `"container top"`, `pull img` → `"pull"`.
#[must_use]
pub fn command_key(args: &[String]) -> String {
    match args {
        [group, verb, ..] if group == "container" || group == "volume" => {
            format!("{group} {verb}")
        }
        [first, ..] => first.clone(),
        [] => String::new(),
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[derive(Debug)]
pub struct FakeRuntime {
    binary: String,
    calls: Mutex<Vec<Vec<String>>>,
    queued: Mutex<HashMap<String, VecDeque<FakeResponse>>>,
    sticky: Mutex<HashMap<String, FakeResponse>>,
}

impl Default for FakeRuntime {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeRuntime {
    #[must_use]
    pub fn new() -> Self {
        Self {
            binary: "docker".to_string(),
            calls: Mutex::new(Vec::new()),
            queued: Mutex::new(HashMap::new()),
            sticky: Mutex::new(HashMap::new()),
        }
    }

    /// Report `binary` as the runtime executable. Anything spawned from it
    /// directly (attach mode) then fails to resolve instead of starting a
    /// real container.
    #[must_use]
    pub fn with_binary(mut self, binary: &str) -> Self {
        self.binary = binary.to_string();
        self
    }

    /// Reply once with `response` the next time `key` runs.
    pub fn queue(&self, key: &str, response: FakeResponse) -> &Self {
        lock(&self.queued)
            .entry(key.to_string())
            .or_default()
            .push_back(response);
        self
    }

    /// Reply with `response` whenever `key` runs and nothing is queued.
    pub fn always(&self, key: &str, response: FakeResponse) -> &Self {
        lock(&self.sticky).insert(key.to_string(), response);
        self
    }

    /// Every invocation so far, in order.
    #[must_use]
    pub fn calls(&self) -> Vec<Vec<String>> {
        lock(&self.calls).clone()
    }

    /// Command keys of every invocation so far, in order.
    #[must_use]
    pub fn keys(&self) -> Vec<String> {
        self.calls().iter().map(|c| command_key(c)).collect()
    }

    #[must_use]
    pub fn count(&self, key: &str) -> usize {
        self.keys().iter().filter(|k| k.as_str() == key).count()
    }

    fn respond(&self, args: &[String]) -> Result<CommandOutput, RuntimeError> {
        lock(&self.calls).push(args.to_vec());
        let key = command_key(args);
        let queued = lock(&self.queued).get_mut(&key).and_then(VecDeque::pop_front);
        let response = queued
            .or_else(|| lock(&self.sticky).get(&key).cloned())
            .unwrap_or_else(|| FakeResponse::Ok(String::new()));
        response.into_result(&self.binary, args)
    }
}

impl ContainerRuntime for FakeRuntime {
    fn binary(&self) -> &str {
        &self.binary
    }

    fn exec<'a>(&'a self, args: &'a [String]) -> RuntimeFut<'a> {
        let result = self.respond(args);
        Box::pin(async move { result })
    }
}
