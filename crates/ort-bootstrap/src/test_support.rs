use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::{
    CommandOutput, CommandRunner, CommandSpec, Downloader, EnvironmentProbe, HostFacts,
    OutputMode, ProvisionError,
};

/// Scripted command runner. Every command succeeds with empty output unless
/// a response is registered for its exact command line, or its program is
/// marked missing. All invocations are recorded.
#[derive(Default)]
pub struct FakeRunner {
    responses: HashMap<String, CommandOutput>,
    missing: HashSet<String>,
    calls: Mutex<Vec<CommandSpec>>,
}

impl FakeRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Respond to the command whose `Display` form equals `command_line`.
    pub fn respond(mut self, command_line: impl Into<String>, output: CommandOutput) -> Self {
        self.responses.insert(command_line.into(), output);
        self
    }

    /// Treat `program` as not installed.
    pub fn missing(mut self, program: impl Into<String>) -> Self {
        self.missing.insert(program.into());
        self
    }

    /// Command lines run so far, in order.
    pub fn calls(&self) -> Vec<String> {
        self.invocations().iter().map(|c| c.to_string()).collect()
    }

    pub fn invocations(&self) -> Vec<CommandSpec> {
        self.calls.lock().unwrap().clone()
    }

    pub fn ran(&self, command_line: &str) -> bool {
        self.count(command_line) > 0
    }

    pub fn count(&self, command_line: &str) -> usize {
        self.calls().iter().filter(|c| *c == command_line).count()
    }
}

#[async_trait::async_trait]
impl CommandRunner for FakeRunner {
    async fn run(
        &self,
        command: &CommandSpec,
        _mode: OutputMode,
    ) -> Result<CommandOutput, ProvisionError> {
        self.calls.lock().unwrap().push(command.clone());

        if self.missing.contains(&command.program) {
            return Err(ProvisionError::ProgramNotFound(command.program.clone()));
        }

        Ok(self
            .responses
            .get(&command.to_string())
            .cloned()
            .unwrap_or_else(|| CommandOutput::ok("")))
    }
}

/// Probe with fixed host facts and environment.
pub struct FakeProbe {
    facts: HostFacts,
    env: HashMap<String, String>,
    temp_dir: PathBuf,
}

impl FakeProbe {
    pub fn new(facts: HostFacts) -> Self {
        Self {
            facts,
            env: HashMap::new(),
            temp_dir: std::env::temp_dir(),
        }
    }

    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    pub fn with_temp_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.temp_dir = dir.into();
        self
    }
}

impl EnvironmentProbe for FakeProbe {
    fn facts(&self) -> &HostFacts {
        &self.facts
    }

    fn env_var(&self, key: &str) -> Option<String> {
        self.env.get(key).cloned()
    }

    fn temp_dir(&self) -> PathBuf {
        self.temp_dir.clone()
    }
}

/// Downloader that writes a fixed payload and records requested URLs.
pub struct FakeDownloader {
    payload: Vec<u8>,
    urls: Mutex<Vec<String>>,
}

impl FakeDownloader {
    pub fn new(payload: Vec<u8>) -> Self {
        Self {
            payload,
            urls: Mutex::new(Vec::new()),
        }
    }

    pub fn urls(&self) -> Vec<String> {
        self.urls.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl Downloader for FakeDownloader {
    async fn download(&self, url: &str, dest: &Path) -> Result<u64, ProvisionError> {
        self.urls.lock().unwrap().push(url.to_owned());
        if let Some(parent) = dest.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(dest, &self.payload)?;
        Ok(self.payload.len() as u64)
    }
}
