/*
 * mod.rs
 *
 * Copyright (C) 2024 Posit Software, PBC. All rights reserved.
 *
 */

pub mod publisher;
pub mod registry;

use crate::display::publisher::UpdatePublisher;
use crate::display::registry::DisplayHandle;
use crate::display::registry::DisplayRegistry;
use crate::execution::interrupt::InterruptController;
use crate::wire::display_data::Rendering;

/// Given to the executor at startup. Publishes displays outside of the
/// `ExecutionContext`, including ones whose content is computed in the
/// background.
///
/// Displays are attached to the execution running when they are published,
/// if any.
#[derive(Clone)]
pub struct Renderer {
    registry: DisplayRegistry,
    publisher: UpdatePublisher,
    interrupts: InterruptController,
}

impl Renderer {
    pub fn new(
        registry: DisplayRegistry,
        publisher: UpdatePublisher,
        interrupts: InterruptController,
    ) -> Self {
        Self {
            registry,
            publisher,
            interrupts,
        }
    }

    pub fn registry(&self) -> &DisplayRegistry {
        &self.registry
    }

    pub fn publish(&self, rendering: Rendering) -> crate::Result<DisplayHandle> {
        let parent = self.interrupts.active().map(|active| active.header);
        self.registry.publish(rendering, parent)
    }

    /// Publishes `placeholder` now and replaces it with the result of
    /// `computation` once it completes on a background thread
    pub fn defer<F>(&self, placeholder: Rendering, computation: F) -> crate::Result<DisplayHandle>
    where
        F: FnOnce() -> Rendering + Send + 'static,
    {
        let handle = self.publish(placeholder)?;
        self.publisher.spawn(handle.clone(), computation);
        Ok(handle)
    }

    /// Number of deferred computations still running
    pub fn outstanding(&self) -> usize {
        self.publisher.outstanding()
    }
}
