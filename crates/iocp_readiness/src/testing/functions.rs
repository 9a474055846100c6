// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use tracing::level_filters::LevelFilter;

/// Routes `tracing` output of the current thread to the console, for debugging a test.
///
/// Only affects the calling thread and only until the returned guard is dropped.
#[cfg_attr(test, mutants::skip)] // This is test code, we do not care about mutating it.
#[must_use]
pub fn log_to_console() -> tracing::subscriber::DefaultGuard {
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(LevelFilter::TRACE)
        .with_test_writer()
        .finish();

    tracing::subscriber::set_default(subscriber)
}
