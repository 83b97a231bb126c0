/// ContextOption tweaks how a session treats the packets of one direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextOption {
    /// Track incoming packets in a sliding window of the given size and drop replays.
    ReplayProtection(usize),
    /// Accept every packet regardless of its index.
    NoReplayProtection,
    /// Pass packets through without decrypting or authenticating them.
    NoDecrypt,
}

/// srtp_replay_protection sets SRTP replay protection window size.
pub fn srtp_replay_protection(window_size: usize) -> ContextOption {
    ContextOption::ReplayProtection(window_size)
}

/// srtcp_replay_protection sets SRTCP replay protection window size.
pub fn srtcp_replay_protection(window_size: usize) -> ContextOption {
    ContextOption::ReplayProtection(window_size)
}

/// srtp_no_replay_protection disables SRTP replay protection.
pub fn srtp_no_replay_protection() -> ContextOption {
    ContextOption::NoReplayProtection
}

/// srtcp_no_replay_protection disables SRTCP replay protection.
pub fn srtcp_no_replay_protection() -> ContextOption {
    ContextOption::NoReplayProtection
}

/// srtp_no_decrypt lets incoming SRTP through unmodified.
pub fn srtp_no_decrypt() -> ContextOption {
    ContextOption::NoDecrypt
}

/// srtcp_no_decrypt lets incoming SRTCP through unmodified.
pub fn srtcp_no_decrypt() -> ContextOption {
    ContextOption::NoDecrypt
}

/// replay_window resolves the replay window a set of options asks for.
///
/// The last replay option wins. `None` means replay protection is disabled,
/// no replay option at all falls back to `default_window`.
pub fn replay_window(options: &[ContextOption], default_window: usize) -> Option<usize> {
    let mut window = Some(default_window);
    for option in options {
        match *option {
            ContextOption::ReplayProtection(size) => window = Some(size),
            ContextOption::NoReplayProtection => window = None,
            ContextOption::NoDecrypt => {}
        }
    }
    window
}

/// decrypt_disabled reports whether any option turns decryption off.
pub fn decrypt_disabled(options: &[ContextOption]) -> bool {
    options.contains(&ContextOption::NoDecrypt)
}
