/*
 * registry.rs
 *
 * Copyright (C) 2024 Posit Software, PBC. All rights reserved.
 *
 */

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::Mutex;

use crossbeam::channel::Sender;
use uuid::Uuid;

use crate::socket::iopub::IOPubMessage;
use crate::wire::display_data::DisplayData;
use crate::wire::display_data::Rendering;
use crate::wire::header::JupyterHeader;
use crate::wire::update_display_data::UpdateDisplayData;

struct DisplayEntry {
    display_id: String,

    /// Header of the request that created the display. Updates are attached
    /// to it, whenever they happen.
    parent: Option<JupyterHeader>,

    /// Held while emitting, so the updates of one display go out in order
    lock: Mutex<()>,
}

/// Maps display ids to the displays published during the session. Entries
/// are never removed.
#[derive(Clone)]
pub struct DisplayRegistry {
    entries: Arc<Mutex<HashMap<String, Arc<DisplayEntry>>>>,
    iopub_tx: Sender<IOPubMessage>,
}

/// A published display that can be updated in place, from any thread
#[derive(Clone)]
pub struct DisplayHandle {
    entry: Arc<DisplayEntry>,
    iopub_tx: Sender<IOPubMessage>,
}

impl DisplayRegistry {
    pub fn new(iopub_tx: Sender<IOPubMessage>) -> Self {
        Self {
            entries: Arc::new(Mutex::new(HashMap::new())),
            iopub_tx,
        }
    }

    /// Publishes `rendering` under a freshly allocated display id
    pub fn publish(
        &self,
        rendering: Rendering,
        parent: Option<JupyterHeader>,
    ) -> crate::Result<DisplayHandle> {
        self.publish_with_id(Uuid::new_v4().to_string(), rendering, parent)
    }

    /// Publishes `rendering` under the given display id. Publishing an id
    /// that is already registered shows the display again; the original
    /// entry and parent are kept.
    pub fn publish_with_id(
        &self,
        display_id: String,
        rendering: Rendering,
        parent: Option<JupyterHeader>,
    ) -> crate::Result<DisplayHandle> {
        let entry = {
            let mut entries = self.entries.lock().unwrap_or_else(|err| err.into_inner());
            entries
                .entry(display_id.clone())
                .or_insert_with(|| {
                    Arc::new(DisplayEntry {
                        display_id,
                        parent,
                        lock: Mutex::new(()),
                    })
                })
                .clone()
        };

        let handle = DisplayHandle {
            entry,
            iopub_tx: self.iopub_tx.clone(),
        };
        handle.emit_display(rendering)?;
        Ok(handle)
    }

    pub fn get(&self, display_id: &str) -> Option<DisplayHandle> {
        let entries = self.entries.lock().unwrap_or_else(|err| err.into_inner());
        entries.get(display_id).map(|entry| DisplayHandle {
            entry: entry.clone(),
            iopub_tx: self.iopub_tx.clone(),
        })
    }

    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(|err| err.into_inner())
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl DisplayHandle {
    pub fn display_id(&self) -> &str {
        &self.entry.display_id
    }

    pub fn parent(&self) -> Option<&JupyterHeader> {
        self.entry.parent.as_ref()
    }

    /// Replaces the content of the display with `rendering`
    pub fn update(&self, rendering: Rendering) -> crate::Result<()> {
        let _guard = self.entry.lock.lock().unwrap_or_else(|err| err.into_inner());
        let content = UpdateDisplayData::new(rendering, self.entry.display_id.clone());
        self.iopub_tx.send(IOPubMessage::UpdateDisplayData(
            self.entry.parent.clone(),
            content,
        ))?;
        Ok(())
    }

    fn emit_display(&self, rendering: Rendering) -> crate::Result<()> {
        let _guard = self.entry.lock.lock().unwrap_or_else(|err| err.into_inner());
        let content = DisplayData::new(rendering, Some(self.entry.display_id.clone()));
        self.iopub_tx
            .send(IOPubMessage::DisplayData(self.entry.parent.clone(), content))?;
        Ok(())
    }
}

impl std::fmt::Debug for DisplayHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DisplayHandle")
            .field("display_id", &self.entry.display_id)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use crossbeam::channel::unbounded;

    use super::*;

    #[test]
    fn test_display_identity() {
        let (iopub_tx, iopub_rx) = unbounded();
        let registry = DisplayRegistry::new(iopub_tx);

        let handle = registry
            .publish(Rendering::plain("loading"), None)
            .unwrap();
        handle.update(Rendering::plain("half")).unwrap();
        handle.update(Rendering::plain("done")).unwrap();

        let id = assert_matches!(
            iopub_rx.try_recv().unwrap(),
            IOPubMessage::DisplayData(None, data) => data.transient.display_id.unwrap()
        );
        assert_eq!(id, handle.display_id());

        for text in ["half", "done"] {
            assert_matches!(
                iopub_rx.try_recv().unwrap(),
                IOPubMessage::UpdateDisplayData(None, data) => {
                    assert_eq!(data.transient.display_id.as_deref(), Some(id.as_str()));
                    assert_eq!(data.data["text/plain"], text);
                }
            );
        }

        // A fresh publish allocates a new id
        let other = registry.publish(Rendering::plain("other"), None).unwrap();
        assert_ne!(other.display_id(), handle.display_id());
        assert_eq!(registry.len(), 2);

        // Lookups return the same display
        let found = registry.get(&id).unwrap();
        assert_eq!(found.display_id(), id);
        assert!(registry.get("nope").is_none());
    }

    #[test]
    fn test_publish_with_existing_id_keeps_entry() {
        let (iopub_tx, _iopub_rx) = unbounded();
        let registry = DisplayRegistry::new(iopub_tx);

        registry
            .publish_with_id(String::from("plot"), Rendering::plain("a"), None)
            .unwrap();
        registry
            .publish_with_id(String::from("plot"), Rendering::plain("b"), None)
            .unwrap();
        assert_eq!(registry.len(), 1);
    }
}
