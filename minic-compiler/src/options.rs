use serde::{Deserialize, Serialize};

/// Knobs for code generation, loadable from a JSON file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompileOptions {
    /// Name used in the `.assembly` directive and the wrapper class.
    pub assembly_name: String,
    /// Emit the `.assembly extern mscorlib {}` header.
    pub emit_header: bool,
    /// Annotate statements with `// line N` comments.
    pub comments: bool,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self {
            assembly_name: "generated_code".to_string(),
            emit_header: true,
            comments: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_take_defaults() {
        let opts: CompileOptions = serde_json::from_str(r#"{ "comments": true }"#).unwrap();
        assert!(opts.comments);
        assert!(opts.emit_header);
        assert_eq!(opts.assembly_name, "generated_code");
    }
}
