use rust_embed::RustEmbed;
use std::borrow::Cow;

// Files compiled into the binary from the assets/ directory
#[derive(RustEmbed)]
#[folder = "assets/"]
pub struct Asset;

pub const DEFAULT_PLAN_FILE: &str = "default_plan.txt";

pub fn get_asset_bytes(name: &str) -> Option<Cow<'static, [u8]>> {
    Asset::get(name).map(|f| f.data)
}

/// Text of the built-in autonomous plan, if it was embedded
pub fn default_plan_text() -> Option<String> {
    get_asset_bytes(DEFAULT_PLAN_FILE).map(|bytes| String::from_utf8_lossy(&bytes).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_plan_is_embedded() {
        let text = default_plan_text().expect("default plan should be embedded");
        assert!(text.contains("[GPS]"));
        assert!(text.contains("[BASIC]"));
        assert!(get_asset_bytes("missing.txt").is_none());
    }
}
