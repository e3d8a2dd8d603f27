/*
 * session.rs
 *
 * Copyright (C) 2022 Posit Software, PBC. All rights reserved.
 *
 */

use hmac::Hmac;
use hmac::Mac;
use sha2::Sha256;
use uuid::Uuid;

use crate::error::Error;

/// A Jupyter session: the kernel-side identity stamped on every outbound
/// header, plus the HMAC key used to sign and verify frames.
#[derive(Clone)]
pub struct Session {
    /// The HMAC signing key, if any. `None` for unsigned deployments.
    pub hmac: Option<Hmac<Sha256>>,

    /// The username to use in message headers
    pub username: String,

    /// The unique session ID, fixed for the lifetime of the kernel process
    pub session_id: String,
}

impl Session {
    /// Create a new session from a connection key. An empty key produces a
    /// session that neither signs nor verifies messages.
    pub fn create(key: &str) -> Result<Self, Error> {
        let hmac = match key.len() {
            0 => None,
            _ => {
                let result = match Hmac::<Sha256>::new_from_slice(key.as_bytes()) {
                    Ok(hmac) => hmac,
                    Err(err) => return Err(Error::HmacKeyInvalid(key.to_string(), err)),
                };
                Some(result)
            },
        };
        Ok(Self {
            hmac,
            session_id: Uuid::new_v4().to_string(),
            username: String::from("kernel"),
        })
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Never print the key
        f.debug_struct("Session")
            .field("signed", &self.hmac.is_some())
            .field("username", &self.username)
            .field("session_id", &self.session_id)
            .finish()
    }
}
