/*
 * kernel_info_reply.rs
 *
 * Copyright (C) 2022 Posit Software, PBC. All rights reserved.
 *
 */

use serde::Deserialize;
use serde::Serialize;

use crate::wire::header::PROTOCOL_VERSION;
use crate::wire::help_link::HelpLink;
use crate::wire::jupyter_message::MessageType;
use crate::wire::jupyter_message::Status;
use crate::wire::language_info::LanguageInfo;

/// Represents a reply to a kernel_info_request, as provided by the language
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct KernelInfoReply {
    /// The execution status ("ok" or "error")
    pub status: Status,

    /// Information about the language the kernel supports
    pub language_info: LanguageInfo,

    /// A startup banner
    pub banner: String,

    /// Whether debugging is supported
    pub debugger: bool,

    /// A list of help links
    pub help_links: Vec<HelpLink>,
}

/// Complete version of `kernel_info_reply`, including the fields owned by the
/// kernel runtime rather than by the language.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct KernelInfoReplyFull {
    /// Version of messaging protocol
    pub protocol_version: String,

    /// The execution status ("ok" or "error")
    pub status: Status,

    /// Information about the language the kernel supports
    pub language_info: LanguageInfo,

    /// A startup banner
    pub banner: String,

    /// Whether debugging is supported
    pub debugger: bool,

    /// A list of help links
    pub help_links: Vec<HelpLink>,
}

impl MessageType for KernelInfoReplyFull {
    fn message_type() -> String {
        String::from("kernel_info_reply")
    }
}

impl From<KernelInfoReply> for KernelInfoReplyFull {
    fn from(value: KernelInfoReply) -> Self {
        Self {
            protocol_version: String::from(PROTOCOL_VERSION),
            status: value.status,
            language_info: value.language_info,
            banner: value.banner,
            debugger: value.debugger,
            help_links: value.help_links,
        }
    }
}
