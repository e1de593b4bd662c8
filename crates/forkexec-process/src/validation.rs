//! Command and argument validation.
//!
//! Only what the platform would reject outright is checked here. Whether the
//! command exists on `PATH` is left to exec time.

use forkexec_common::LaunchError;

/// Validate a command name and its argument vector.
pub fn validate_command<S: AsRef<str>>(command: &str, args: &[S]) -> Result<(), LaunchError> {
    if command.is_empty() {
        return Err(LaunchError::invalid_command("command cannot be empty"));
    }

    if command.contains('\0') {
        return Err(LaunchError::invalid_command(format!(
            "command contains a NUL byte: {:?}",
            command
        )));
    }

    if let Some((index, arg)) = args
        .iter()
        .enumerate()
        .find(|(_, arg)| arg.as_ref().contains('\0'))
    {
        return Err(LaunchError::invalid_command(format!(
            "argument {} contains a NUL byte: {:?}",
            index,
            arg.as_ref()
        )));
    }

    Ok(())
}

/// Program name and argv as C strings, ready for `execvp`.
///
/// An empty argument vector becomes `[command]` so both launch backends hand
/// the child the same argv.
#[cfg(unix)]
pub(crate) fn exec_argv<S: AsRef<str>>(
    command: &str,
    args: &[S],
) -> Result<(std::ffi::CString, Vec<std::ffi::CString>), LaunchError> {
    use std::ffi::CString;

    validate_command(command, args)?;

    let to_cstring = |s: &str| {
        CString::new(s).map_err(|e| LaunchError::invalid_command(e.to_string()))
    };

    let program = to_cstring(command)?;
    let argv = if args.is_empty() {
        vec![program.clone()]
    } else {
        args.iter()
            .map(|arg| to_cstring(arg.as_ref()))
            .collect::<Result<Vec<_>, _>>()?
    };

    Ok((program, argv))
}
