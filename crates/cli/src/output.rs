//! Event and snapshot formatting

use owo_colors::OwoColorize;
use std::io::{self, Write};
use std::time::UNIX_EPOCH;
use treewatch_core::{EntryKind, EntryState};
use treewatch_watcher::{EventKind, WatchEvent};

/// Short label for an event kind
pub fn event_label(kind: &EventKind) -> &'static str {
    match kind {
        EventKind::Exists { modified: None } => "exists",
        EventKind::Exists { modified: Some(false) } => "present",
        EventKind::Exists { modified: Some(true) } => "modified",
        EventKind::Removed => "removed",
    }
}

/// Write one event as a line of coloured text or JSON
pub fn write_event(out: &mut impl Write, event: &WatchEvent, json: bool) -> io::Result<()> {
    if json {
        serde_json::to_writer(&mut *out, event)?;
        return writeln!(out);
    }

    let label = event_label(&event.kind);
    let label = match event.kind {
        EventKind::Exists { modified: None } => label.dimmed().to_string(),
        EventKind::Exists { modified: Some(false) } => label.green().to_string(),
        EventKind::Exists { modified: Some(true) } => label.yellow().to_string(),
        EventKind::Removed => label.red().to_string(),
    };
    writeln!(
        out,
        "{:>8}  {}/{}",
        label,
        event.root.display().to_string().dimmed(),
        event.path
    )
}

/// One line of `tw snapshot` output
pub fn format_entry(path: &str, state: &EntryState) -> String {
    match state.kind {
        EntryKind::Directory => format!("  {}/", path.blue()),
        EntryKind::File => {
            let mtime = state
                .modified
                .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
                .map(|d| format!("{}.{:09}", d.as_secs(), d.subsec_nanos()))
                .unwrap_or_else(|| "-".to_string());
            format!("  {}  {}", path, mtime.dimmed())
        }
    }
}
