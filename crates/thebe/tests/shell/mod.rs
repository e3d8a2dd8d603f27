/*
 * mod.rs
 *
 * Copyright (C) 2022 Posit Software, PBC. All rights reserved.
 *
 */

use async_trait::async_trait;
use serde_json::json;
use thebe::language::shell_handler::ShellHandler;
use thebe::wire::complete_reply::CompleteReply;
use thebe::wire::complete_request::CompleteRequest;
use thebe::wire::inspect_reply::InspectReply;
use thebe::wire::inspect_request::InspectRequest;
use thebe::wire::is_complete_reply::IsComplete;
use thebe::wire::is_complete_reply::IsCompleteReply;
use thebe::wire::is_complete_request::IsCompleteRequest;
use thebe::wire::jupyter_message::Status;
use thebe::wire::kernel_info_reply::KernelInfoReply;
use thebe::wire::kernel_info_request::KernelInfoRequest;
use thebe::wire::language_info::LanguageInfo;

/// Stub implementation of the shell handler for test harness
pub struct Shell {}

#[async_trait]
impl ShellHandler for Shell {
    async fn handle_info_request(
        &mut self,
        _req: &KernelInfoRequest,
    ) -> thebe::Result<KernelInfoReply> {
        let info = LanguageInfo {
            name: String::from("Test"),
            version: String::from("1.0"),
            file_extension: String::from(".ech"),
            mimetype: String::from("text/echo"),
            pygments_lexer: None,
            codemirror_mode: None,
            nbconvert_exporter: None,
        };
        Ok(KernelInfoReply {
            status: Status::Ok,
            banner: String::from("Thebe Test"),
            debugger: false,
            help_links: Vec::new(),
            language_info: info,
        })
    }

    async fn handle_is_complete_request(
        &self,
        req: &IsCompleteRequest,
    ) -> thebe::Result<IsCompleteReply> {
        // Code ending in a backslash continues on the next line
        let status = if req.code.ends_with('\\') {
            IsComplete::Incomplete
        } else {
            IsComplete::Complete
        };
        Ok(IsCompleteReply {
            status,
            indent: String::from(""),
        })
    }

    async fn handle_complete_request(&self, req: &CompleteRequest) -> thebe::Result<CompleteReply> {
        Ok(CompleteReply {
            status: Status::Ok,
            matches: vec![format!("{}!", req.code)],
            cursor_start: 0,
            cursor_end: req.cursor_pos,
            metadata: json!({}),
        })
    }

    async fn handle_inspect_request(&self, _req: &InspectRequest) -> thebe::Result<InspectReply> {
        Err(thebe::anyhow!("Inspection is not supported"))
    }
}
