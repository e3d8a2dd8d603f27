/*
 * mod.rs
 *
 * Copyright (C) 2022 Posit Software, PBC. All rights reserved.
 *
 */

pub mod complete_reply;
pub mod complete_request;
pub mod display_data;
pub mod error_reply;
pub mod exception;
pub mod execute_error;
pub mod execute_input;
pub mod execute_reply;
pub mod execute_reply_exception;
pub mod execute_request;
pub mod execute_result;
pub mod header;
pub mod help_link;
pub mod input_reply;
pub mod input_request;
pub mod inspect_reply;
pub mod inspect_request;
pub mod interrupt_reply;
pub mod interrupt_request;
pub mod is_complete_reply;
pub mod is_complete_request;
pub mod jupyter_message;
pub mod kernel_info_reply;
pub mod kernel_info_request;
pub mod language_info;
pub mod originator;
pub mod payload;
pub mod shutdown_reply;
pub mod shutdown_request;
pub mod status;
pub mod stream;
pub mod update_display_data;
pub mod wire_message;
