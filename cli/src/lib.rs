pub mod cli;
pub mod commands;
pub mod error;

/// Initialize tracing/logging with the given directives
///
/// `RUST_LOG` is honoured; the directives are added on top of it.
pub fn init_logging(directives: &[&str]) {
    let mut filter = tracing_subscriber::EnvFilter::from_default_env();
    for directive in directives {
        match directive.parse() {
            Ok(directive) => filter = filter.add_directive(directive),
            Err(e) => eprintln!("Ignoring invalid log directive {:?}: {}", directive, e),
        }
    }
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(filter)
        .init();
}

pub use cli::{run, Args};
