//! Logging helpers on top of `tracing`

#[doc(hidden)]
pub use tracing;

/// Log an unrecoverable configuration error.
///
/// `tracing` has no fatal level, so this is an `error!` event tagged with
/// `fatal = true`. Accepts the same field/message syntax as `tracing::error!`.
#[macro_export]
macro_rules! fatal {
    ($($arg:tt)+) => {
        $crate::logging::tracing::error!(fatal = true, $($arg)+)
    };
}

#[cfg(test)]
mod tests {
    #[test]
    fn test_fatal_accepts_fields_and_message() {
        let node = "draw_polygon";
        crate::fatal!(node = %node, "'polygon' param is malformed");
        crate::fatal!("plain message {}", 3);
    }
}
