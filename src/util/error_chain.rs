//! Flattening of error cause chains into an indented, multi-line report.
//!
//! Each cause gets two lines:
//!
//! ```text
//! Error #1 => outer message
//! Trace #1 => <trace>
//! 	Inner Error #2 => cause message
//! 	Trace #2 => <trace>
//! ```
//!
//! Line breaks inside a trace are collapsed to tabs so each trace stays on its
//! own line. Only the outermost error of an `anyhow::Error` can carry a
//! captured backtrace; other causes render as `<none>`.

use std::error::Error as StdError;
use std::fmt::Write;
use std::panic::{self, AssertUnwindSafe};

/// Returned when rendering itself fails.
pub const FALLBACK_MESSAGE: &str = "Failed getting exception messages.";

const NO_TRACE: &str = "<none>";

/// Render `err` and its `source()` chain.
pub fn format_error_chain(err: &(dyn StdError + 'static)) -> String {
    let mut causes = Vec::new();
    let mut current = Some(err);
    while let Some(cause) = current {
        causes.push(cause);
        current = cause.source();
    }
    guarded(|| render(causes.into_iter().map(|cause| (cause.to_string(), None))))
}

/// Render an `anyhow::Error` chain, including its backtrace when captured.
pub fn format_anyhow_chain(err: &anyhow::Error) -> String {
    guarded(|| {
        let backtrace = err.backtrace();
        let mut trace = match backtrace.status() {
            std::backtrace::BacktraceStatus::Captured => Some(backtrace.to_string()),
            _ => None,
        };
        render(err.chain().map(|cause| (cause.to_string(), trace.take())))
    })
}

fn guarded<F>(render: F) -> String
where
    F: FnOnce() -> Result<String, std::fmt::Error>,
{
    match panic::catch_unwind(AssertUnwindSafe(render)) {
        Ok(Ok(report)) => report,
        Ok(Err(_)) | Err(_) => FALLBACK_MESSAGE.to_string(),
    }
}

fn render<I>(causes: I) -> Result<String, std::fmt::Error>
where
    I: IntoIterator<Item = (String, Option<String>)>,
{
    let mut out = String::new();
    for (index, (message, trace)) in causes.into_iter().enumerate() {
        let number = index + 1;
        if index > 0 {
            out.push('\n');
            push_tabs(&mut out, index);
            out.push_str("Inner ");
        }
        writeln!(out, "Error #{number} => {message}")?;
        push_tabs(&mut out, index);
        write!(
            out,
            "Trace #{number} => {}",
            flatten(trace.as_deref().unwrap_or(NO_TRACE))
        )?;
    }
    Ok(out)
}

fn push_tabs(out: &mut String, count: usize) {
    out.extend(std::iter::repeat_n('\t', count));
}

fn flatten(trace: &str) -> String {
    trace
        .trim_end()
        .replace("\r\n", "\t")
        .replace('\n', "\t")
}
