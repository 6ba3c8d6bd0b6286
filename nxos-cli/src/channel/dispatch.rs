//! Action-map dispatch engine.
//!
//! [`run`] reads device output until a target prompt appears, answering
//! interactive questions along the way from an [`ActionMap`].
//!
//! On every read the unprocessed output is evaluated as follows:
//!
//! 1. The target prompt is searched in the buffer tail.
//! 2. Triggers are tried in insertion order; the first one that matches
//!    *before* the target prompt fires, the output up to the end of the
//!    line holding its match is consumed, and evaluation restarts without
//!    reading.
//! 3. Otherwise, if the target prompt matched, dispatch completes.
//! 4. Otherwise more output is read, until the deadline.
//!
//! Consuming the question's line means a trigger fires once per occurrence
//! of its question, even when several triggers match the same line. A
//! device that keeps asking the same question is caught by the reaction
//! budget.

use std::time::Duration;

use log::{debug, trace};
use regex::bytes::Regex;
use tokio::time::Instant;

use super::action::ActionMap;
use super::buffer::PatternBuffer;
use super::session::Session;
use crate::error::{ChannelError, Result};

/// How much trailing output error values carry for diagnosis.
const LAST_OUTPUT_CHARS: usize = 512;

/// Drive `session` until `target` is seen, reacting to `actions`.
///
/// Returns all output consumed, ANSI-stripped, up to and including the
/// matched prompt.
///
/// # Errors
///
/// - [`ChannelError::Timeout`] if `target` is not seen before the deadline
///   (`timeout`, plus any extensions granted by fired triggers).
/// - [`ChannelError::ReactionBudgetExceeded`] if more than `max_reactions`
///   triggers fire.
pub async fn run(
    session: &mut Session,
    target: &Regex,
    actions: &ActionMap,
    timeout: Duration,
    max_reactions: usize,
) -> Result<String> {
    let mut deadline = Instant::now() + timeout;
    let mut allowed = timeout;
    let mut pending = PatternBuffer::new(session.search_depth());
    let mut consumed: Vec<u8> = Vec::new();
    let mut reactions = 0usize;

    loop {
        let prompt = pending.find_in_tail(target);
        let limit = prompt.as_ref().map_or(usize::MAX, |m| m.start);

        if let Some((trigger, end)) = actions.first_match(&pending, limit) {
            reactions += 1;
            if reactions > max_reactions {
                consumed.extend_from_slice(&pending.take());
                return Err(ChannelError::ReactionBudgetExceeded {
                    limit: max_reactions,
                    last_output: last_output(&consumed),
                }
                .into());
            }

            debug!(
                "trigger {:?} matched, reaction {}/{}: {}",
                trigger.pattern.as_str(),
                reactions,
                max_reactions,
                trigger.action
            );
            let end = pending.line_end(end).min(limit);
            consumed.extend_from_slice(&pending.drain_to(end));

            if let Some(extra) = trigger.extend_deadline {
                deadline += extra;
                allowed += extra;
            }

            session.perform(&trigger.action).await?;
            continue;
        }

        if let Some(m) = prompt {
            consumed.extend_from_slice(&pending.drain_to(m.end));
            trace!("target {:?} matched after {} reactions", target.as_str(), reactions);
            return Ok(String::from_utf8_lossy(&consumed).into_owned());
        }

        match tokio::time::timeout_at(deadline, session.read_chunk()).await {
            Ok(chunk) => pending.extend(&chunk?),
            Err(_) => {
                consumed.extend_from_slice(&pending.take());
                return Err(ChannelError::Timeout {
                    timeout: allowed,
                    last_output: last_output(&consumed),
                }
                .into());
            }
        }
    }
}

fn last_output(consumed: &[u8]) -> String {
    let text = String::from_utf8_lossy(consumed);
    let skip = text.chars().count().saturating_sub(LAST_OUTPUT_CHARS);
    text.chars().skip(skip).collect()
}
