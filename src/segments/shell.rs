use serde::Serialize;
use serde_json::Value;

use super::{Base, Segment, SegmentType};

const DEFAULT_TEMPLATE: &str = " {{ .Name }} ";

#[derive(Debug, Default, Serialize)]
#[serde(rename_all = "PascalCase")]
struct ShellData {
    name: String,
}

/// Name of the shell the prompt is drawn for.
pub struct Shell {
    base: Base,
    data: ShellData,
}

impl Shell {
    pub fn new(base: Base) -> Self {
        Self {
            base,
            data: ShellData::default(),
        }
    }
}

impl Segment for Shell {
    fn kind(&self) -> SegmentType {
        SegmentType::Shell
    }

    fn enabled(&mut self) -> bool {
        self.data.name = self.base.env.shell().to_string();
        true
    }

    fn template(&self) -> &str {
        self.base.template(DEFAULT_TEMPLATE)
    }

    fn data(&self) -> Value {
        serde_json::to_value(&self.data).unwrap_or_default()
    }
}
