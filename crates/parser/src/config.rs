use html5ever::tokenizer::TokenizerOpts;
use html5ever::tree_builder::TreeBuilderOpts;
use html5ever::ParseOpts;

/// Configuration for the parser
#[derive(Debug, Clone)]
pub struct ParserConfig {
    /// Elements nested deeper than this are attached flat to their deepest
    /// retained ancestor instead of being dropped
    pub max_depth: usize,
    /// Largest accepted input, in bytes
    pub max_input_bytes: usize,
    /// Parse as a browser with scripting enabled would (affects `<noscript>`)
    pub scripting_enabled: bool,
    /// Treat input as `iframe srcdoc` content
    pub iframe_srcdoc: bool,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            max_depth: 512,
            max_input_bytes: 4 * 1024 * 1024,
            scripting_enabled: true,
            iframe_srcdoc: false,
        }
    }
}

impl ParserConfig {
    /// Create tree builder options based on configuration
    pub fn tree_builder_opts(&self) -> TreeBuilderOpts {
        TreeBuilderOpts {
            drop_doctype: true,
            scripting_enabled: self.scripting_enabled,
            iframe_srcdoc: self.iframe_srcdoc,
            ..Default::default()
        }
    }

    /// Create tokenizer options based on configuration
    pub fn tokenizer_opts(&self) -> TokenizerOpts {
        TokenizerOpts {
            discard_bom: false,
            ..Default::default()
        }
    }

    pub fn parse_opts(&self) -> ParseOpts {
        ParseOpts {
            tokenizer: self.tokenizer_opts(),
            tree_builder: self.tree_builder_opts(),
        }
    }

    /// Get the maximum nesting depth
    pub fn max_nesting_depth(&self) -> usize {
        self.max_depth
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parser_config_default() {
        let config = ParserConfig::default();
        assert_eq!(config.max_depth, 512);
        assert_eq!(config.max_input_bytes, 4 * 1024 * 1024);
        assert!(config.scripting_enabled);
        assert!(!config.iframe_srcdoc);
    }

    #[test]
    fn test_parse_opts_follow_config() {
        let config = ParserConfig {
            scripting_enabled: false,
            ..Default::default()
        };
        let opts = config.parse_opts();
        assert!(!opts.tree_builder.scripting_enabled);
        assert!(opts.tree_builder.drop_doctype);
        assert!(!opts.tokenizer.discard_bom);
    }
}
