use std::time::Duration;

use procrelay::exec::{Invocation, Runner, RunnerOptions};

/// `sh -c <script>`: the child used by most process tests.
pub fn sh(script: &str) -> Invocation {
    Invocation::new("sh").arg("-c").arg(script)
}

/// Builder for `Runner` to simplify test setup.
pub struct RunnerBuilder {
    options: RunnerOptions,
}

impl RunnerBuilder {
    pub fn new() -> Self {
        Self {
            options: RunnerOptions::default(),
        }
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.options.timeout = Some(timeout);
        self
    }

    pub fn drain_grace(mut self, grace: Duration) -> Self {
        self.options.drain_grace = grace;
        self
    }

    pub fn stderr_tail_lines(mut self, lines: usize) -> Self {
        self.options.stderr_tail_lines = lines;
        self
    }

    pub fn build(self) -> Runner {
        Runner::new(self.options)
    }
}

impl Default for RunnerBuilder {
    fn default() -> Self {
        Self::new()
    }
}
