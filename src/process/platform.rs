//! Platform-specific launch settings.

use tokio::process::Command;

/// Ask the kernel to SIGTERM the child when its parent goes away.
///
/// Linux ties the signal to the thread that forked the child, not to the
/// whole process. Starting exiftool from a short-lived thread (for instance
/// inside `spawn_blocking`, or a runtime worker that is later retired) kills
/// it as soon as that thread exits. Start it from a long-lived thread.
///
/// Best effort: a parent killed between `fork` and `prctl` still leaks the child.
#[cfg(target_os = "linux")]
#[allow(unsafe_code)]
pub(crate) fn configure(cmd: &mut Command) {
    use nix::sys::prctl::set_pdeathsig;
    use nix::sys::signal::Signal;

    // SAFETY: the closure runs in the forked child before exec. It only calls
    // prctl(2), which is async-signal-safe, and captures nothing.
    unsafe {
        cmd.pre_exec(|| {
            let _ = set_pdeathsig(Signal::SIGTERM);
            Ok(())
        });
    }
}

/// Keep the console window of the child hidden.
#[cfg(windows)]
pub(crate) fn configure(cmd: &mut Command) {
    const CREATE_NO_WINDOW: u32 = 0x0800_0000;
    cmd.creation_flags(CREATE_NO_WINDOW);
}

/// No parent-death propagation here; a killed parent can leak the child.
#[cfg(not(any(target_os = "linux", windows)))]
pub(crate) fn configure(_cmd: &mut Command) {}
