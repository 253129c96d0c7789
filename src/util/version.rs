pub const APP_NAME: &str = "Vessel Quote";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");
/// `git describe` output captured at build time, when built from a checkout.
pub const GIT_DESCRIBE: Option<&str> = option_env!("VESSEL_QUOTE_GIT_DESCRIBE");

pub fn version_label() -> String {
    match GIT_DESCRIBE {
        Some(describe) if !describe.is_empty() => format!("v{APP_VERSION} ({describe})"),
        _ => format!("v{APP_VERSION}"),
    }
}

pub fn user_agent() -> String {
    format!("vessel-quote/{APP_VERSION}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn label_starts_with_package_version() {
        assert!(version_label().starts_with(&format!("v{APP_VERSION}")));
        assert!(user_agent().ends_with(APP_VERSION));
    }
}
