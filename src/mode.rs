//! The forward/reverse axis every side of the tunnel is configured along,
//! independent of which binary (`client` or `server`) is running it.

/// - `Forward`: the HTTP side dials the target. Mirrors the original's
///   default (`--reverse` unset) where `post_aiotunnel` opens a connection
///   to the address the caller supplied.
/// - `Reverse`: the HTTP side listens, and whoever connects to that
///   listener is tunneled back to the other side's local target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Forward,
    Reverse,
}

impl Mode {
    pub fn from_flag(reverse: bool) -> Self {
        if reverse {
            Mode::Reverse
        } else {
            Mode::Forward
        }
    }
}
