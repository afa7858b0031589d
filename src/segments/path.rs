use serde::Serialize;
use serde_json::Value;

use super::{Base, Segment, SegmentType};
use crate::runtime;

const DEFAULT_TEMPLATE: &str = " {{ .Path }} ";

#[derive(Debug, Default, Serialize)]
#[serde(rename_all = "PascalCase")]
struct PathData {
    path: String,
    folder: String,
}

/// Current working directory, with the home directory shortened.
pub struct Path {
    base: Base,
    data: PathData,
}

impl Path {
    /// Option: replacement for the home directory prefix.
    pub const HOME_ICON: &'static str = "home_icon";

    pub fn new(base: Base) -> Self {
        Self {
            base,
            data: PathData::default(),
        }
    }

    fn shorten(&self, pwd: &str) -> String {
        let Some(home) = self.base.env.home().filter(|home| !home.is_empty()) else {
            return pwd.to_string();
        };
        let icon = self.base.options.string(Self::HOME_ICON, "~");

        match pwd.strip_prefix(home.as_str()) {
            Some("") => icon,
            Some(rest) if rest.starts_with(['/', '\\']) => format!("{icon}{rest}"),
            _ => pwd.to_string(),
        }
    }
}

impl Segment for Path {
    fn kind(&self) -> SegmentType {
        SegmentType::Path
    }

    fn enabled(&mut self) -> bool {
        let pwd = self.base.env.pwd().to_string();
        if pwd.is_empty() {
            return false;
        }

        self.data.path = self.shorten(&pwd);
        self.data.folder = runtime::base(&pwd).to_string();
        true
    }

    fn template(&self) -> &str {
        self.base.template(DEFAULT_TEMPLATE)
    }

    fn data(&self) -> Value {
        serde_json::to_value(&self.data).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::runtime::mock::MockEnvironment;
    use crate::segments::Options;

    fn path(pwd: &str, options: Options) -> Path {
        let env = Arc::new(MockEnvironment::new("bash", pwd).with_env("HOME", "/home/me"));
        Path::new(Base::new(options, env))
    }

    #[test]
    fn test_home_is_shortened() {
        let mut segment = path("/home/me/src/monline", Options::new());
        assert!(segment.enabled());
        assert_eq!(segment.data()["Path"], "~/src/monline");
        assert_eq!(segment.data()["Folder"], "monline");

        let mut segment = path("/home/me", Options::new());
        assert!(segment.enabled());
        assert_eq!(segment.data()["Path"], "~");
    }

    #[test]
    fn test_similar_prefix_is_not_home() {
        let mut segment = path("/home/meg", Options::new());
        assert!(segment.enabled());
        assert_eq!(segment.data()["Path"], "/home/meg");
    }

    #[test]
    fn test_home_icon_option() {
        let mut segment = path("/home/me/src", Options::new().with(Path::HOME_ICON, "H"));
        assert!(segment.enabled());
        assert_eq!(segment.data()["Path"], "H/src");
    }

    #[test]
    fn test_empty_pwd_is_disabled() {
        assert!(!path("", Options::new()).enabled());
    }
}
