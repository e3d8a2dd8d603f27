/*
 * connection_file.rs
 *
 * Copyright (C) 2022 Posit Software, PBC. All rights reserved.
 *
 */

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use serde::Deserialize;
use serde::Serialize;

/// The contents of the Connection File as listed in the Jupyter specfication;
/// directly parsed from JSON.
///
/// A port of `0` asks the transport to pick a free port; the ports actually
/// bound are reported by `Kernel::connection_file()`.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct ConnectionFile {
    /// ZeroMQ port: Control channel (kernel interrupts)
    pub control_port: u16,

    /// ZeroMQ port: Shell channel (execution, completion)
    pub shell_port: u16,

    /// ZeroMQ port: Standard input channel (prompts)
    pub stdin_port: u16,

    /// ZeroMQ port: IOPub channel (broadcasts input/output)
    pub iopub_port: u16,

    /// ZeroMQ port: Heartbeat messages (echo)
    pub hb_port: u16,

    /// The transport type to use for ZeroMQ; generally "tcp"
    pub transport: String,

    /// The signature scheme to use for messages; generally "hmac-sha256"
    pub signature_scheme: String,

    /// The IP address to bind to
    pub ip: String,

    /// The HMAC-256 signing key, or an empty string for an unauthenticated
    /// connection
    pub key: String,
}

impl ConnectionFile {
    /// Create a ConnectionFile by parsing the contents of a connection file.
    pub fn from_file<P: AsRef<Path>>(connection_file: P) -> anyhow::Result<ConnectionFile> {
        let file = File::open(connection_file)?;
        let reader = BufReader::new(file);
        let control = serde_json::from_reader(reader)?;

        Ok(control)
    }

    /// A local TCP connection with OS-assigned ports, signed with `key`.
    pub fn local(key: String) -> Self {
        Self {
            control_port: 0,
            shell_port: 0,
            stdin_port: 0,
            iopub_port: 0,
            hb_port: 0,
            transport: String::from("tcp"),
            signature_scheme: String::from("hmac-sha256"),
            ip: String::from("127.0.0.1"),
            key,
        }
    }

    /// Given a port, return a URI-like string that can be used to connect to
    /// the port, given the other parameters in the connection file.
    ///
    /// Example: `32` => `"tcp://127.0.0.1:32"`
    pub fn endpoint(&self, port: u16) -> String {
        format!("{}://{}:{}", self.transport, self.ip, port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_connection_file() {
        let json = r#"{
            "control_port": 50160,
            "shell_port": 57503,
            "transport": "tcp",
            "signature_scheme": "hmac-sha256",
            "stdin_port": 52597,
            "hb_port": 42540,
            "ip": "127.0.0.1",
            "iopub_port": 40885,
            "key": "a0436f6c-1916-498b-8eb9-e81ab9368e84",
            "kernel_name": "echo"
        }"#;
        let connection: ConnectionFile = serde_json::from_str(json).unwrap();
        assert_eq!(connection.shell_port, 57503);
        assert_eq!(connection.endpoint(connection.hb_port), "tcp://127.0.0.1:42540");
    }
}
