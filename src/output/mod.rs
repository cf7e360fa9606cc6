mod tables;

use console::style;

pub use tables::builds_table;

fn accent(text: impl std::fmt::Display) -> console::StyledObject<String> {
    style(text.to_string()).magenta().bold()
}

fn muted(text: impl std::fmt::Display) -> console::StyledObject<String> {
    style(text.to_string()).dim()
}

/// Prints the buildlens banner to stderr.
pub fn print_banner() {
    eprintln!(
        r"
{} {}
  {}
",
        accent("🔗 buildlens"),
        muted(env!("CARGO_PKG_VERSION")),
        muted("Jenkins build correlator")
    );
}
