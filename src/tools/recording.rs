//! Scripted tool runner for orchestrator tests.

use super::{Invocation, ToolOutput, ToolRunner};
use crate::error::Result;
use std::sync::Mutex;

type Script = Box<dyn Fn(&Invocation) -> Option<ToolOutput> + Send + Sync>;

/// Records every invocation and answers from a list of scripted responses.
///
/// Responses are consulted in insertion order; an invocation no script
/// answers succeeds with empty output.
#[derive(Default)]
pub(crate) struct RecordingRunner {
    calls: Mutex<Vec<Invocation>>,
    scripts: Vec<Script>,
}

impl RecordingRunner {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Answer invocations whose rendered command line contains `needle`
    pub(crate) fn respond(mut self, needle: &str, output: ToolOutput) -> Self {
        let needle = needle.to_string();
        self.scripts.push(Box::new(move |inv| {
            inv.to_string().contains(&needle).then(|| output.clone())
        }));
        self
    }

    /// Answer invocations with a closure
    pub(crate) fn respond_with(
        mut self,
        script: impl Fn(&Invocation) -> Option<ToolOutput> + Send + Sync + 'static,
    ) -> Self {
        self.scripts.push(Box::new(script));
        self
    }

    pub(crate) fn calls(&self) -> Vec<Invocation> {
        self.calls.lock().unwrap().clone()
    }

    pub(crate) fn rendered_calls(&self) -> Vec<String> {
        self.calls().iter().map(ToString::to_string).collect()
    }
}

impl ToolRunner for RecordingRunner {
    async fn run(&self, invocation: &Invocation) -> Result<ToolOutput> {
        self.calls.lock().unwrap().push(invocation.clone());
        Ok(self
            .scripts
            .iter()
            .find_map(|script| script(invocation))
            .unwrap_or_else(|| ToolOutput::ok("")))
    }
}
