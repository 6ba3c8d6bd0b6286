//! Scripted in-memory transport for tests.
//!
//! Every line written is recorded. A written line that matches a rule
//! queues that rule's reply as the next chunk of device output; reads
//! with nothing queued never complete, so the caller's deadline decides.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use bytes::Bytes;

use super::Transport;
use crate::error::Result;

struct Rule {
    matcher: String,
    prefix: bool,
    repeat: bool,
    used: bool,
    replies: Vec<String>,
}

impl Rule {
    fn matches(&self, line: &str) -> bool {
        if self.used && !self.repeat {
            return false;
        }
        if self.prefix {
            line.starts_with(&self.matcher)
        } else {
            line == self.matcher
        }
    }
}

/// Read side of the recorded writes.
#[derive(Clone, Default)]
pub(crate) struct MockHandle {
    writes: Arc<Mutex<Vec<String>>>,
}

impl MockHandle {
    /// Every line written so far, without line terminators.
    pub(crate) fn writes(&self) -> Vec<String> {
        self.writes.lock().unwrap().clone()
    }

    /// Number of written lines starting with `prefix`.
    pub(crate) fn count(&self, prefix: &str) -> usize {
        self.writes()
            .iter()
            .filter(|line| line.starts_with(prefix))
            .count()
    }
}

pub(crate) struct MockTransport {
    rules: Vec<Rule>,
    queue: VecDeque<Bytes>,
    handle: MockHandle,
}

impl MockTransport {
    pub(crate) fn new() -> (Self, MockHandle) {
        let handle = MockHandle::default();
        let transport = Self {
            rules: Vec::new(),
            queue: VecDeque::new(),
            handle: handle.clone(),
        };
        (transport, handle)
    }

    /// Output available before anything is written.
    pub(crate) fn banner(mut self, text: &str) -> Self {
        self.queue.push_back(Bytes::copy_from_slice(text.as_bytes()));
        self
    }

    /// Reply once to the exact line `line`.
    pub(crate) fn on(self, line: &str, reply: &str) -> Self {
        self.rule(line, false, false, vec![reply])
    }

    /// Reply once, in several chunks, to the exact line `line`.
    pub(crate) fn on_chunks(self, line: &str, replies: &[&str]) -> Self {
        self.rule(line, false, false, replies.to_vec())
    }

    /// Reply once to the first line starting with `prefix`.
    pub(crate) fn on_prefix(self, prefix: &str, reply: &str) -> Self {
        self.rule(prefix, true, false, vec![reply])
    }

    /// Reply every time the exact line `line` is written.
    pub(crate) fn always(self, line: &str, reply: &str) -> Self {
        self.rule(line, false, true, vec![reply])
    }

    fn rule(mut self, matcher: &str, prefix: bool, repeat: bool, replies: Vec<&str>) -> Self {
        self.rules.push(Rule {
            matcher: matcher.to_string(),
            prefix,
            repeat,
            used: false,
            replies: replies.into_iter().map(str::to_string).collect(),
        });
        self
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn write(&mut self, data: &[u8]) -> Result<()> {
        let text = String::from_utf8_lossy(data);
        for line in text.split_terminator('\n') {
            let line = line.trim_end_matches('\r');
            self.handle.writes.lock().unwrap().push(line.to_string());

            if let Some(rule) = self.rules.iter_mut().find(|r| r.matches(line)) {
                rule.used = true;
                for reply in &rule.replies {
                    self.queue.push_back(Bytes::copy_from_slice(reply.as_bytes()));
                }
            }
        }
        Ok(())
    }

    async fn read(&mut self) -> Result<Bytes> {
        match self.queue.pop_front() {
            Some(chunk) => Ok(chunk),
            None => std::future::pending::<Result<Bytes>>().await,
        }
    }

    async fn close(&mut self) -> Result<()> {
        Ok(())
    }
}
