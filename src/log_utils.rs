pub use log::debug;

/// Log a debug message, or print it directly when debugging a targeted part of the run
///
/// The first argument is a local debug flag, typically set for a single genome section selected
/// on the command line. When it is set, the message goes straight to stderr regardless of log
/// level. Otherwise the message is logged at debug level, so that it only appears with `--debug`.
///
/// # Examples
///
/// ```ignore
/// debug_msg!(false, "Swept section {:?}", section); // logged only with the --debug flag
/// debug_msg!(debug, "Swept section {:?}", section); // printed to stderr if debug is true
/// ```
macro_rules! debug_msg {
    ($flag:expr, $($arg:tt)+) => {
        if $flag {
            eprintln!($($arg)+);
        } else {
            $crate::log_utils::debug!($($arg)+);
        }
    }
}

pub(crate) use debug_msg;
