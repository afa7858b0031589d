use serde_json::{Value, json};

use super::{Base, Segment, SegmentType};

/// Static text. The template is the content; globals such as `.UserName`
/// are still available to it.
pub struct Text {
    base: Base,
}

impl Text {
    pub fn new(base: Base) -> Self {
        Self { base }
    }
}

impl Segment for Text {
    fn kind(&self) -> SegmentType {
        SegmentType::Text
    }

    fn enabled(&mut self) -> bool {
        !self.template().is_empty()
    }

    fn template(&self) -> &str {
        self.base.template("")
    }

    fn data(&self) -> Value {
        json!({})
    }
}
