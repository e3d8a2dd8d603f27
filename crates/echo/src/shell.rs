/*
 * shell.rs
 *
 * Copyright (C) 2022 Posit Software, PBC. All rights reserved.
 *
 */

use async_trait::async_trait;
use serde_json::json;
use thebe::language::shell_handler::ShellHandler;
use thebe::wire::complete_reply::CompleteReply;
use thebe::wire::complete_request::CompleteRequest;
use thebe::wire::help_link::HelpLink;
use thebe::wire::inspect_reply::InspectReply;
use thebe::wire::inspect_request::InspectRequest;
use thebe::wire::is_complete_reply::IsComplete;
use thebe::wire::is_complete_reply::IsCompleteReply;
use thebe::wire::is_complete_request::IsCompleteRequest;
use thebe::wire::jupyter_message::Status;
use thebe::wire::kernel_info_reply::KernelInfoReply;
use thebe::wire::kernel_info_request::KernelInfoRequest;
use thebe::wire::language_info::LanguageInfo;

use crate::command::Command;

pub struct Shell {}

#[async_trait]
impl ShellHandler for Shell {
    async fn handle_info_request(
        &mut self,
        _req: &KernelInfoRequest,
    ) -> thebe::Result<KernelInfoReply> {
        let info = LanguageInfo {
            name: String::from("Echo"),
            version: String::from(env!("CARGO_PKG_VERSION")),
            file_extension: String::from(".ech"),
            mimetype: String::from("text/echo"),
            pygments_lexer: None,
            codemirror_mode: None,
            nbconvert_exporter: None,
        };
        Ok(KernelInfoReply {
            status: Status::Ok,
            banner: format!("Thebe Echo {}", env!("CARGO_PKG_VERSION")),
            debugger: false,
            help_links: vec![HelpLink {
                text: String::from("Jupyter messaging"),
                url: String::from("https://jupyter-client.readthedocs.io/en/stable/messaging.html"),
            }],
            language_info: info,
        })
    }

    async fn handle_is_complete_request(
        &self,
        req: &IsCompleteRequest,
    ) -> thebe::Result<IsCompleteReply> {
        Ok(is_complete(&req.code))
    }

    async fn handle_complete_request(&self, req: &CompleteRequest) -> thebe::Result<CompleteReply> {
        Ok(complete(&req.code, req.cursor_pos))
    }

    async fn handle_inspect_request(&self, req: &InspectRequest) -> thebe::Result<InspectReply> {
        let word = word_at(&req.code, req.cursor_pos);
        let reply = match Command::help(word) {
            Some(help) => InspectReply {
                status: Status::Ok,
                found: true,
                data: json!({ "text/plain": help }),
                metadata: json!({}),
            },
            None => InspectReply {
                status: Status::Ok,
                found: false,
                data: json!({}),
                metadata: json!({}),
            },
        };
        Ok(reply)
    }
}

/// A trailing backslash continues the code on the next line
fn is_complete(code: &str) -> IsCompleteReply {
    if code.trim_end().ends_with('\\') {
        IsCompleteReply {
            status: IsComplete::Incomplete,
            indent: String::from("  "),
        }
    } else {
        IsCompleteReply {
            status: IsComplete::Complete,
            indent: String::new(),
        }
    }
}

/// Completes the command name under the cursor
fn complete(code: &str, cursor_pos: u32) -> CompleteReply {
    let prefix = word_at(code, cursor_pos);
    let matches = Command::NAMES
        .iter()
        .filter(|name| name.starts_with(prefix))
        .map(|name| String::from(*name))
        .collect();

    let cursor_end = cursor_pos.min(code.chars().count() as u32);
    CompleteReply {
        status: Status::Ok,
        matches,
        cursor_start: cursor_end - prefix.chars().count() as u32,
        cursor_end,
        metadata: json!({}),
    }
}

/// The word ending at `cursor_pos`, counted in characters
fn word_at(code: &str, cursor_pos: u32) -> &str {
    let end = code
        .char_indices()
        .nth(cursor_pos as usize)
        .map(|(i, _)| i)
        .unwrap_or(code.len());
    let start = code[..end]
        .rfind(char::is_whitespace)
        .map(|i| i + 1)
        .unwrap_or(0);
    &code[start..end]
}
