/// Logging macro with explicit level selection.
///
/// Forwards to [`tracing`] macros. During tests it prints to `stdout`,
/// preserving the log level for context.
///
/// # Examples
/// ```
/// use postcms::cross_log;
/// # fn main() {
/// cross_log!(info, "fetched {} posts", 42);
/// cross_log!(warn, "slow response from {}", "postcms.x-static.io");
/// # }
/// ```
#[macro_export]
macro_rules! cross_log {
    ($level:ident, $($arg:tt)*) => {
        #[cfg(not(test))]
        tracing::$level!($($arg)*);
        #[cfg(test)]
        println!("[{}] {}", stringify!($level), format_args!($($arg)*));
    };
}
