//! CLI output handling - Event receiver loop.
//!
//! Receives events from the controller via the runtime channel and renders
//! them based on output mode (terminal, JSON, or quiet). In stdio mode stdout
//! carries the host protocol, so everything goes to stderr instead.

use std::io::{self, Write};

use anyhow::Result;
use tokio::sync::mpsc;

use crate::controller::NotificationStatus;
use crate::runtime::{RuntimeEvent, Toast, ToastVariant};
use crate::view::FrameView;

#[derive(Debug, Clone, Copy, Default)]
pub struct OutputOptions {
    /// Output events as JSON lines
    pub json: bool,
    /// Suppress per-event output
    pub quiet: bool,
    /// Write to stderr instead of stdout
    pub stderr: bool,
    /// Colour toast tags with ANSI escapes
    pub color: bool,
}

impl OutputOptions {
    fn write_line(&self, line: &str) -> io::Result<()> {
        if self.stderr {
            let mut err = io::stderr().lock();
            writeln!(err, "{}", line)
        } else {
            let mut out = io::stdout().lock();
            writeln!(out, "{}", line)?;
            out.flush()
        }
    }
}

/// Run the event loop until the controller is torn down or the channel closes.
pub async fn run_event_loop(
    mut event_rx: mpsc::UnboundedReceiver<RuntimeEvent>,
    options: OutputOptions,
) -> Result<()> {
    while let Some(event) = event_rx.recv().await {
        if !options.quiet {
            if let Some(line) = format_event(&event, options)? {
                options.write_line(&line)?;
            }
        }
        if matches!(event, RuntimeEvent::TornDown) {
            break;
        }
    }

    Ok(())
}

/// Print the final frame view.
pub fn print_view(view: &FrameView, options: OutputOptions) -> Result<()> {
    if options.json {
        let json = serde_json::json!({ "type": "view", "view": view });
        options.write_line(&json.to_string())?;
        return Ok(());
    }

    match view {
        FrameView::Loading => options.write_line("[frame] loading")?,
        FrameView::Ready(layout) => {
            options.write_line(&format!("[frame] {}", layout.title))?;
            options.write_line(&format!(
                "[frame] padding top={} bottom={} left={} right={}",
                layout.padding.top, layout.padding.bottom, layout.padding.left, layout.padding.right
            ))?;
            options.write_line(&format!(
                "[frame] notifications: {}",
                layout.notification_label
            ))?;
            options.write_line(&format!(
                "[frame] [{}]{}",
                layout.enable_button.label,
                if layout.enable_button.disabled {
                    " (disabled)"
                } else {
                    ""
                }
            ))?;
        }
    }
    Ok(())
}

/// One output line for an event, or `None` if the event is not shown.
fn format_event(event: &RuntimeEvent, options: OutputOptions) -> Result<Option<String>> {
    if options.json {
        return Ok(Some(serde_json::to_string(event)?));
    }

    let line = match event {
        RuntimeEvent::Toast(toast) => format_toast(toast, options.color),
        RuntimeEvent::AddedChanged { added } => {
            format!("[state] added = {}", added)
        }
        RuntimeEvent::NotificationStatusChanged { status } => {
            format!("[state] notifications = {}", status_label(*status))
        }
        RuntimeEvent::Ready => "[host] ready".to_string(),
        RuntimeEvent::ProvidersDiscovered { providers } => {
            let names: Vec<&str> = providers.iter().map(|p| p.info.name.as_str()).collect();
            format!("[providers] {}", names.join(", "))
        }
        RuntimeEvent::TornDown => "[host] torn down".to_string(),
        RuntimeEvent::Custom { name, .. } => format!("[event] {}", name),
    };
    Ok(Some(line))
}

fn format_toast(toast: &Toast, color: bool) -> String {
    let (tag, ansi) = match toast.variant {
        ToastVariant::Success => ("ok", "32"),
        ToastVariant::Warning => ("warn", "33"),
        ToastVariant::Destructive => ("err", "31"),
    };
    let tag = if color {
        format!("\x1b[{}m{}\x1b[0m", ansi, tag)
    } else {
        tag.to_string()
    };
    if toast.description.is_empty() {
        format!("[{}] {}", tag, toast.title)
    } else {
        format!("[{}] {}: {}", tag, toast.title, toast.description)
    }
}

fn status_label(status: NotificationStatus) -> &'static str {
    match status {
        NotificationStatus::Unknown => "unknown",
        NotificationStatus::Enabled => "enabled",
        NotificationStatus::Disabled => "disabled",
    }
}
