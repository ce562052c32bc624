pub(super) mod config;
pub(super) mod core;
pub(super) mod history;
pub(super) mod model;

use crate::commands::registry::CommandInvocation;
use crate::commands::CommandResult;

pub(super) fn usage(usage: &'static str) -> CommandResult {
    CommandResult::Output(format!("Usage: {usage}"))
}

pub(super) fn required_args<'a>(
    invocation: &CommandInvocation<'a>,
    usage_text: &'static str,
) -> Result<&'a str, CommandResult> {
    if invocation.args.is_empty() {
        Err(usage(usage_text))
    } else {
        Ok(invocation.args)
    }
}
