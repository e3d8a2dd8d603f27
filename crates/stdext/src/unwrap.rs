//
// unwrap.rs
//
// Copyright (C) 2022 Posit Software, PBC. All rights reserved.
//
//

/// Unwraps a `Result` or `Option`, evaluating the fallback arm otherwise.
///
/// ```
/// # use stdext::unwrap;
/// let value: Result<u32, String> = Err(String::from("oops"));
/// let value = unwrap!(value, Err(err) => {
///     println!("{err}");
///     0
/// });
/// assert_eq!(value, 0);
/// ```
#[macro_export]
macro_rules! unwrap {
    ($value:expr, Err($err:pat) => $fallback:expr) => {
        match $value {
            Ok(value) => value,
            Err($err) => $fallback,
        }
    };

    ($value:expr, None => $fallback:expr) => {
        match $value {
            Some(value) => value,
            None => $fallback,
        }
    };
}
