/*
 * mod.rs
 *
 * Copyright (C) 2022 Posit Software, PBC. All rights reserved.
 *
 */

pub mod control_handler;
pub mod executor;
pub mod shell_handler;
