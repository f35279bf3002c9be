use std::io;
use std::process::Stdio;

/// Opens a URL for the user during interactive login
#[cfg_attr(test, mockall::automock)]
pub trait BrowserLauncher: Send + Sync {
    /// # Errors
    ///
    /// Returns an error if no browser could be started.
    fn open(&self, url: &str) -> io::Result<()>;
}

/// Launches the platform's default URL handler
#[derive(Debug, Clone, Copy, Default)]
pub struct ExecBrowserLauncher;

impl BrowserLauncher for ExecBrowserLauncher {
    fn open(&self, url: &str) -> io::Result<()> {
        let mut command = if cfg!(target_os = "windows") {
            let mut command = std::process::Command::new("rundll32");
            command.args(["url.dll,FileProtocolHandler", url]);
            command
        } else if cfg!(target_os = "macos") {
            let mut command = std::process::Command::new("open");
            command.arg(url);
            command
        } else {
            let mut command = std::process::Command::new("xdg-open");
            command.arg(url);
            command
        };
        command
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map(|_| ())
    }
}
