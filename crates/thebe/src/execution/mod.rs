/*
 * mod.rs
 *
 * Copyright (C) 2024 Posit Software, PBC. All rights reserved.
 *
 */

pub mod cancellation;
pub mod context;
pub mod interrupt;
pub mod queue;
pub mod worker;
