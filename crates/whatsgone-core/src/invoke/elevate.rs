//! UAC elevation shim.
//!
//! Windows has no "spawn elevated" call that hands back a child handle, so
//! the scanner is started by PowerShell's `Start-Process -Verb RunAs -Wait`.
//! The shim itself then becomes the child we wait on.
//!
//! The script is passed with `-EncodedCommand` (base64 of UTF-16LE), which
//! sidesteps the command-line quoting rules of both `cmd` and PowerShell.
//! Inside the script every argument is a single-quoted PowerShell literal.
use base64::{engine::general_purpose, Engine as _};
use std::path::Path;
use std::process::Command;

/// Exit code the shim uses when `Start-Process` itself fails, which
/// includes the user declining the UAC prompt.
pub const SHIM_LAUNCH_FAILED: i32 = 1;

/// Quote `s` as a PowerShell single-quoted string literal.
pub fn powershell_quote(s: &str) -> String {
    format!("'{}'", s.replace('\'', "''"))
}

/// The PowerShell script that launches `tool` elevated and waits for it.
pub fn shim_script(tool: &Path, args: &[String]) -> String {
    let arg_list = args
        .iter()
        .map(|a| powershell_quote(a))
        .collect::<Vec<_>>()
        .join(",");

    format!(
        "$ErrorActionPreference = 'Stop'\n\
         try {{\n\
         \x20   Start-Process -FilePath {} -ArgumentList @({}) -Verb RunAs -Wait\n\
         }} catch {{\n\
         \x20   [Console]::Error.WriteLine($_.Exception.Message)\n\
         \x20   exit {}\n\
         }}\n\
         exit 0\n",
        powershell_quote(&tool.to_string_lossy()),
        arg_list,
        SHIM_LAUNCH_FAILED,
    )
}

/// Encode a script for `powershell -EncodedCommand`.
pub fn encode_script(script: &str) -> String {
    let utf16: Vec<u8> = script.encode_utf16().flat_map(u16::to_le_bytes).collect();
    general_purpose::STANDARD.encode(utf16)
}

/// Build the shim command. The caller decides how stdio is wired.
pub fn shim_command(tool: &Path, args: &[String]) -> Command {
    let mut cmd = Command::new("powershell.exe");
    cmd.args([
        "-NoProfile",
        "-NonInteractive",
        "-ExecutionPolicy",
        "Bypass",
        "-EncodedCommand",
    ]);
    cmd.arg(encode_script(&shim_script(tool, args)));
    cmd
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quote_doubles_single_quotes() {
        assert_eq!(powershell_quote("plain"), "'plain'");
        assert_eq!(powershell_quote("it's"), "'it''s'");
        assert_eq!(powershell_quote("/filter=\"a b\""), "'/filter=\"a b\"'");
    }

    #[test]
    fn script_lists_every_argument() {
        let args = vec![
            "X:".to_owned(),
            "/filter=\"Bob's Films\"".to_owned(),
            "/admin=1".to_owned(),
        ];
        let script = shim_script(Path::new("C:/Program Files/WizTree/WizTree64.exe"), &args);

        assert!(script.contains(
            "Start-Process -FilePath 'C:/Program Files/WizTree/WizTree64.exe' \
             -ArgumentList @('X:','/filter=\"Bob''s Films\"','/admin=1') -Verb RunAs -Wait"
        ));
        assert!(script.contains("exit 1"));
    }

    #[test]
    fn encoding_is_utf16le_base64() {
        // "ab" -> 61 00 62 00
        assert_eq!(encode_script("ab"), "YQBiAA==");
    }

    #[test]
    fn shim_runs_powershell_with_encoded_command() {
        let cmd = shim_command(Path::new("tool.exe"), &[]);
        assert_eq!(cmd.get_program(), "powershell.exe");
        let args: Vec<_> = cmd
            .get_args()
            .map(|a| a.to_string_lossy().into_owned())
            .collect();
        assert_eq!(args[args.len() - 2], "-EncodedCommand");
    }
}
