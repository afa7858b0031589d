//! Parsed template representation.

/// A compiled template. Immutable once built and shared between renders.
#[derive(Debug, Clone, PartialEq)]
pub struct Template {
    pub nodes: Vec<Node>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Text(String),
    Action(Pipeline),
    If {
        branches: Vec<(Pipeline, Vec<Node>)>,
        otherwise: Vec<Node>,
    },
    With {
        pipeline: Pipeline,
        body: Vec<Node>,
        otherwise: Vec<Node>,
    },
    Range {
        pipeline: Pipeline,
        body: Vec<Node>,
        otherwise: Vec<Node>,
    },
}

/// Commands chained with `|`; each result is passed as the last argument of the next.
#[derive(Debug, Clone, PartialEq)]
pub struct Pipeline {
    pub commands: Vec<Command>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Command {
    pub args: Vec<Operand>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    /// `.` or `.A.B`, relative to the current dot.
    Field(Vec<String>),
    /// `$` or `$.A.B`, relative to the data passed to the render.
    Root(Vec<String>),
    Function(String),
    Str(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    Nil,
    Pipeline(Box<Pipeline>),
}

impl Template {
    /// Names of every function the template calls.
    pub fn functions(&self) -> Vec<&str> {
        let mut names = Vec::new();
        collect_nodes(&self.nodes, &mut names);
        names
    }
}

fn collect_nodes<'a>(nodes: &'a [Node], names: &mut Vec<&'a str>) {
    for node in nodes {
        match node {
            Node::Text(_) => {}
            Node::Action(pipeline) => collect_pipeline(pipeline, names),
            Node::If {
                branches,
                otherwise,
            } => {
                for (pipeline, body) in branches {
                    collect_pipeline(pipeline, names);
                    collect_nodes(body, names);
                }
                collect_nodes(otherwise, names);
            }
            Node::With {
                pipeline,
                body,
                otherwise,
            }
            | Node::Range {
                pipeline,
                body,
                otherwise,
            } => {
                collect_pipeline(pipeline, names);
                collect_nodes(body, names);
                collect_nodes(otherwise, names);
            }
        }
    }
}

fn collect_pipeline<'a>(pipeline: &'a Pipeline, names: &mut Vec<&'a str>) {
    for command in &pipeline.commands {
        for arg in &command.args {
            match arg {
                Operand::Function(name) => names.push(name),
                Operand::Pipeline(inner) => collect_pipeline(inner, names),
                _ => {}
            }
        }
    }
}
