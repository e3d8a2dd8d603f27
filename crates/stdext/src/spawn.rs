//
// spawn.rs
//
// Copyright (C) 2022 Posit Software, PBC. All rights reserved.
//
//

/// Spawns a named thread.
///
/// Thread names show up in panic messages, debuggers, and log output, so all
/// long-lived kernel threads should be spawned with this macro. Panics if the
/// OS refuses to create the thread, which is not something a kernel can
/// recover from.
#[macro_export]
macro_rules! spawn {
    ($name:expr, $body:expr) => {{
        let name: String = ($name).into();
        std::thread::Builder::new()
            .name(name.clone())
            .spawn($body)
            .unwrap_or_else(|err| panic!("Can't spawn thread '{name}': {err:?}"))
    }};
}
