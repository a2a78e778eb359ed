//! Startup banner.

use owo_colors::OwoColorize;

const BANNER: &str = r"
             _      _        _
  _ __  __ _(_)_ _ | |_ __ _| |_____ _ _
 | '_ \/ _` | | '_||  _/ _` | / / -_) '_|
 | .__/\__,_|_|_|   \__\__,_|_\_\___|_|
 |_|
";

/// Print the banner unless suppressed.
pub fn print(no_banner: bool) {
    if no_banner {
        return;
    }
    println!("{}", BANNER.cyan());
    println!(
        "  {} v{}\n",
        "cross-venue hedged taker engine".dimmed(),
        env!("CARGO_PKG_VERSION")
    );
}
