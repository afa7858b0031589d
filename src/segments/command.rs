use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use super::{Base, Segment, SegmentType};

/// Option naming the executable to look up.
pub const COMMAND: &str = "command";

const DEFAULT_TEMPLATE: &str = " {{ .Command }} ";

#[derive(Debug, Default, Serialize)]
#[serde(rename_all = "PascalCase")]
struct CommandData {
    command: String,
    path: String,
}

/// Shows a command when it is installed. Lookups go through the command cache.
pub struct Command {
    base: Base,
    data: CommandData,
}

impl Command {
    pub fn new(base: Base) -> Self {
        Self {
            base,
            data: CommandData::default(),
        }
    }
}

impl Segment for Command {
    fn kind(&self) -> SegmentType {
        SegmentType::Command
    }

    fn enabled(&mut self) -> bool {
        let command = self.base.options.string(COMMAND, "");
        if command.is_empty() {
            debug!("Command segment has no command configured");
            return false;
        }

        let Some(path) = self.base.env.has_command(&command) else {
            return false;
        };

        self.data = CommandData { command, path };
        true
    }

    fn template(&self) -> &str {
        self.base.template(DEFAULT_TEMPLATE)
    }

    fn data(&self) -> Value {
        serde_json::to_value(&self.data).unwrap_or_default()
    }
}
