use tracing_subscriber::EnvFilter;

/// Environment variable whose filter directives override every other source.
pub const LOG_ENV: &str = "INFRA_FORGE_LOG";

/// Install the stderr subscriber.
///
/// `INFRA_FORGE_LOG` wins over `fallback`, which already reflects `-v`, `-q`
/// and the config file.
pub fn init(fallback: &str) {
    let filter = filter_from(std::env::var(LOG_ENV).ok().as_deref(), fallback);
    let installed = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
    if installed.is_err() {
        tracing::debug!("a global subscriber was already installed");
    }
}

fn filter_from(env: Option<&str>, fallback: &str) -> EnvFilter {
    env.and_then(|directives| EnvFilter::try_new(directives).ok())
        .unwrap_or_else(|| EnvFilter::new(fallback))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_directives_take_precedence() {
        let filter = filter_from(Some("infra_forge_compiler=trace"), "warn");
        assert_eq!(filter.to_string(), "infra_forge_compiler=trace");
    }

    #[test]
    fn fallback_used_without_env() {
        assert_eq!(filter_from(None, "debug").to_string(), "debug");
    }
}
