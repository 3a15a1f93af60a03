use gh_explorer_client::navigator::HOME_PATH;
use gh_explorer_client::Navigator;

/// Pseudo location of the CLI, never a public page
const CLI_PATH: &str = "/cli";

/// Navigator that tells the user where to go
#[derive(Debug, Default)]
pub struct TerminalNavigator;

impl Navigator for TerminalNavigator {
    fn navigate(&self, url: &str) {
        log::info!("Navigation requested to {}", url);
        if url == HOME_PATH {
            eprintln!("Session expired. Run `gh-explorer login` to sign in again.");
        } else {
            println!("Open this URL in your browser to sign in:\n\n  {}\n", url);
            println!("Then run `gh-explorer callback <code>` with the code you receive.");
        }
    }

    fn current_path(&self) -> String {
        CLI_PATH.to_string()
    }
}
