//! Line classification and directive execution
//!
//! Every non-blank, non-comment line is first run through the indentation
//! tracker, then tried in this order:
//! 1. the active multi-line directive, if any
//! 2. `$` raw passthrough
//! 3. built-in directives
//! 4. line rules, then leading-token rules
//! 5. quoted narration

use log::{debug, info, log, trace, warn};

use super::context::{OpenLabel, ParseContext, PendingCall};
use super::engine::{compile_ignore_list, Engine, Flow};
use crate::directive::{known_keyword, parse_block_line, parse_directive, Directive};
use crate::error::BuildError;
use crate::format::IndentExpectation;
use crate::parser::patterns::{COMMENT_RE, DIRECTIVE_MARKER_RE, PARENT_LABEL_RE, RAW_RE};
use crate::parser::ScriptLine;
use crate::rules::{escape_quotes, NvlAffix};

impl Engine {
    pub(super) fn dispatch_line(
        &mut self,
        ctx: &mut ParseContext,
        line: &ScriptLine,
    ) -> Result<Flow, BuildError> {
        if line.is_blank() {
            self.write_blank(ctx)?;
            return Ok(Flow::Continue);
        }

        if let Some(caps) = COMMENT_RE.captures(&line.text) {
            let marker = self.config.copy_special_comments.as_str();
            if !marker.is_empty() && caps[2].starts_with(marker) {
                trace!("{}Copying comment", ctx.location());
                self.write_verbatim(ctx, &line.text)?;
            }
            return Ok(Flow::Continue);
        }

        self.track_indent(ctx, line.leading_whitespace())?;
        let text = line.text.trim();
        ctx.indent.expect_next(if text.ends_with(':') {
            IndentExpectation::Required
        } else {
            IndentExpectation::Forbidden
        });

        if let Some(block) = ctx.block {
            let directive = parse_block_line(block, text)?;
            return self.execute(ctx, directive);
        }

        if RAW_RE.is_match(text) {
            self.write_content(ctx, text)?;
            return Ok(Flow::Continue);
        }

        if let Some(directive) = parse_directive(text) {
            return self.execute(ctx, directive?);
        }

        if DIRECTIVE_MARKER_RE.is_match(text) {
            if let Some(keyword) = known_keyword(text) {
                return Err(BuildError::MalformedDirective {
                    keyword: keyword.to_string(),
                    line: text.to_string(),
                });
            }
            warn!(
                "{}Unknown directive, writing it as narration: {text}",
                ctx.location()
            );
        }

        self.write_dialogue(ctx, text)?;
        Ok(Flow::Continue)
    }

    fn execute(&mut self, ctx: &mut ParseContext, directive: Directive) -> Result<Flow, BuildError> {
        self.stats.directives += 1;
        debug!("{}{directive:?}", ctx.location());

        match directive {
            Directive::LineRule { pattern, template } => {
                self.rules.add_line_rule(&pattern, &template)?;
                self.stats.rules_registered += 1;
            }
            Directive::PrefixRule { pattern, name } => {
                self.rules.add_prefix_rule(&pattern, &name)?;
                self.stats.rules_registered += 1;
            }
            Directive::Block(kind) => ctx.block = Some(kind),
            Directive::Label(name) => self.declare_label(ctx, &name)?,
            Directive::Scene(args) => self.write_content(ctx, &format!("scene {args}"))?,
            Directive::Show(args) => self.write_content(ctx, &format!("show {args}"))?,
            Directive::With(args) => self.write_content(ctx, &format!("with {args}"))?,
            Directive::Call(args) => self.write_content(ctx, &format!("call {args}"))?,
            Directive::Jump(args) => self.write_content(ctx, &format!("jump {args}"))?,
            Directive::Return => self.write_content(ctx, "return")?,
            Directive::Menu => self.write_content(ctx, "menu:")?,
            Directive::If(condition) => self.write_content(ctx, &format!("if {condition}:"))?,
            Directive::Elif(condition) => {
                self.write_content(ctx, &format!("elif {condition}:"))?;
            }
            Directive::Else => self.write_content(ctx, "else:")?,
            Directive::Nvl => {
                if self.nvl.is_none() {
                    debug!("{}Entering NVL mode", ctx.location());
                    self.nvl = Some(0);
                } else {
                    warn!("{}Already in NVL mode", ctx.location());
                }
            }
            Directive::Clear => {
                if self.nvl_active() {
                    self.write_content(ctx, "nvl clear")?;
                } else {
                    self.write_blank(ctx)?;
                }
            }
            Directive::Import(name) => return Ok(Flow::Import(name)),
            Directive::File(name) => {
                info!("{}Redirecting output to {name}", ctx.location());
                self.router.set_target(&name);
            }
            Directive::Log { level, message } => log!(level, "{}{message}", ctx.location()),
            Directive::Config { key, value } => {
                self.set_option(&key, &value)?;
                info!("{}Set config {key} = {value}", ctx.location());
            }
            Directive::Break => {
                info!("{}Stopping at :break", ctx.location());
                return Ok(Flow::Break);
            }
            Directive::Voice(file) => self.write_content(ctx, &format!("voice \"{file}\""))?,
            Directive::Play { channel, file } => {
                self.write_content(ctx, &format!("play {channel} \"{file}\""))?;
            }
        }
        Ok(Flow::Continue)
    }

    /// Apply a `:config` option, effective from the next line
    fn set_option(&mut self, key: &str, value: &str) -> Result<(), BuildError> {
        self.config.set_option(key, value)?;
        self.ignore = compile_ignore_list(&self.config.flow_control_ignore)?;
        self.router.set_output_dir(&self.config.output_path);
        Ok(())
    }

    fn declare_label(&mut self, ctx: &mut ParseContext, name: &str) -> Result<(), BuildError> {
        let depth = ctx.indent.depth();
        if !name.starts_with('.') {
            if self.config.create_parent_files && depth == 0 {
                self.route_parent(ctx, name);
            }
            ctx.label_roots.push(label_root(name).unwrap_or(name).to_string());
        }
        let qualified = ctx.qualify(name).unwrap_or_else(|| {
            warn!("{}Local label {name} has no parent label", ctx.location());
            name.to_string()
        });

        self.write_content(ctx, &format!("label {name}:"))?;
        ctx.open_labels.push(OpenLabel {
            depth,
            has_body: false,
            terminated: false,
        });
        ctx.indent.expect_next(IndentExpectation::Optional);
        self.stats.labels += 1;

        if !self.config.create_flow_control_file {
            return Ok(());
        }
        if self.ignore.iter().any(|re| re.is_match(&qualified)) {
            debug!(
                "{}Label {qualified} matches flow_control_ignore",
                ctx.location()
            );
            return Ok(());
        }
        ctx.pending_call = Some(PendingCall {
            label: qualified,
            depth,
        });
        Ok(())
    }

    /// Send output for a top-level label to `<root>.rpy`, reopening the
    /// root's file when an earlier label already created it
    fn route_parent(&mut self, ctx: &ParseContext, name: &str) {
        let Some(root) = label_root(name).map(str::to_string) else {
            return;
        };
        if self.routed_roots.insert(root.clone()) {
            info!("{}Creating parent file for {root}", ctx.location());
        }
        self.router.set_target(&format!("{root}.rpy"));
    }

    /// Content line: line rules, then leading-token rules, then narration
    fn write_dialogue(&mut self, ctx: &mut ParseContext, text: &str) -> Result<(), BuildError> {
        if let Some(rendered) = self.rules.apply_line_rules(text) {
            let rendered = rendered?;
            self.stats.line_replacements += 1;
            return self.write_content(ctx, &rendered);
        }

        let affix = self.nvl_active().then(|| NvlAffix {
            prefix: &self.config.nvl_prefix,
            suffix: &self.config.nvl_suffix,
        });
        if let Some(rendered) = self.rules.apply_prefix_rules(text, affix) {
            let rendered = rendered?;
            self.stats.prefix_replacements += 1;
            return self.write_content(ctx, &rendered);
        }

        let speaker = if self.nvl_active() {
            format!("{} ", self.config.nvl_character)
        } else {
            String::new()
        };
        let narration = match text.strip_suffix(':') {
            Some(body) => format!("{speaker}\"{}\":", escape_quotes(body)),
            None => format!("{speaker}\"{}\"", escape_quotes(text)),
        };
        self.stats.narration_lines += 1;
        self.write_content(ctx, &narration)
    }
}

/// Root segment of a dotted label name, `None` for local labels
fn label_root(name: &str) -> Option<&str> {
    PARENT_LABEL_RE
        .captures(name)
        .and_then(|caps| caps.get(1))
        .map(|root| root.as_str())
        .filter(|root| !root.is_empty())
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;
    use std::path::Path;

    use super::label_root;
    use crate::config::Config;
    use crate::error::BuildError;
    use crate::process::Engine;

    fn build_with(config: Config, script: &str) -> Engine {
        let mut engine = Engine::in_memory(config).unwrap();
        engine
            .run_reader(Path::new("/game/story.rps"), Cursor::new(script))
            .unwrap();
        engine
    }

    fn build(script: &str) -> Engine {
        build_with(Config::default(), script)
    }

    fn try_build(script: &str) -> BuildError {
        let mut engine = Engine::in_memory(Config::default()).unwrap();
        engine
            .run_reader(Path::new("/game/story.rps"), Cursor::new(script))
            .unwrap_err()
            .error
    }

    #[test]
    fn test_structural_passthroughs() {
        let script = "\
:: start
    :sc bg room
    :s eileen happy
    :w dissolve
    :m:
        Go left:
            :j left
        Stay:
            :c stay
            :r
";
        assert_eq!(
            build(script).output("story.rpy").unwrap(),
            "\
label start:
    scene bg room
    show eileen happy
    with dissolve
    menu:
        \"Go left\":
            jump left
        \"Stay\":
            call stay
            return
"
        );
    }

    #[test]
    fn test_conditionals() {
        let script = ":if points > 3:\n    Win\n:elif points > 1:\n    Draw\n:else:\n    Lose\n";
        assert_eq!(
            build(script).output("story.rpy").unwrap(),
            "if points > 3:\n    \"Win\"\nelif points > 1:\n    \"Draw\"\nelse:\n    \"Lose\"\n"
        );
    }

    #[test]
    fn test_rule_blocks() {
        let script = "\
:l:
    Good {name} = Hello, {0}!
    Bye = \"Goodbye.\"
:p:
    e = eileen
Good Bob
Bye
e Nice to meet you.
";
        let engine = build(script);
        assert_eq!(engine.rules().line_rules().len(), 2);
        assert_eq!(engine.rules().prefix_rules().len(), 1);
        assert_eq!(
            engine.output("story.rpy").unwrap(),
            "Hello, Bob!\n\"Goodbye.\"\neileen \"Nice to meet you.\"\n"
        );
        assert_eq!(engine.stats().line_replacements, 2);
        assert_eq!(engine.stats().prefix_replacements, 1);
    }

    #[test]
    fn test_nvl_affixes_and_clear() {
        let script = "\
:p e = eileen
:clear
:nvl:
    e Hi
    Narration
    :clear
e Back
";
        assert_eq!(
            build(script).output("story.rpy").unwrap(),
            "eileen_NVL \"Hi\"\nNVL \"Narration\"\nnvl clear\neileen \"Back\"\n"
        );
    }

    #[test]
    fn test_narration_quotes_and_raw_lines() {
        let script = ":: start\n    She said \"hi\"\n    $ points += 1\n";
        assert_eq!(
            build(script).output("story.rpy").unwrap(),
            "label start:\n    \"She said \\\"hi\\\"\"\n    $ points += 1\n"
        );
    }

    #[test]
    fn test_audio() {
        let script = ":v e01.ogg\n:a music theme.ogg\n";
        assert_eq!(
            build(script).output("story.rpy").unwrap(),
            "voice \"e01.ogg\"\nplay music \"theme.ogg\"\n"
        );
    }

    #[test]
    fn test_comments() {
        let script = "# dropped\n  ## kept as is\n:: start\n    Hi\n";
        assert_eq!(
            build(script).output("story.rpy").unwrap(),
            "  ## kept as is\nlabel start:\n    \"Hi\"\n"
        );

        let config = Config {
            copy_special_comments: String::new(),
            ..Default::default()
        };
        assert_eq!(
            build_with(config, "## gone\nHi\n").output("story.rpy").unwrap(),
            "\"Hi\"\n"
        );
    }

    #[test]
    fn test_unknown_directive_becomes_narration() {
        assert_eq!(
            build(":shrug whatever\n").output("story.rpy").unwrap(),
            "\":shrug whatever\"\n"
        );
    }

    #[test]
    fn test_malformed_directive() {
        assert!(matches!(
            try_build(":r now\n"),
            BuildError::MalformedDirective { ref keyword, .. } if keyword == "r"
        ));
        assert!(matches!(
            try_build(":p:\n    nothing here\n"),
            BuildError::MalformedDirective { .. }
        ));
    }

    #[test]
    fn test_config_directives() {
        let script = "\
:config nvl_character = \"narrator\"
:config:
    nvl_suffix = _nvl
    flow_control_ignore = [\"skip*\"]
:p e = eileen
:nvl:
    e Hi
    Text
:: skip_me
    Hidden
";
        let engine = build(script);
        assert_eq!(
            engine.output("story.rpy").unwrap(),
            "eileen_nvl \"Hi\"\nnarrator \"Text\"\nlabel skip_me:\n    \"Hidden\"\n"
        );
        assert!(engine.control_calls().is_empty());
        assert_eq!(engine.config().nvl_suffix, "_nvl");
    }

    #[test]
    fn test_unknown_config_key() {
        assert!(matches!(
            try_build(":config no_such = 1\n"),
            BuildError::UnknownConfigKey(_)
        ));
    }

    #[test]
    fn test_local_labels_qualified_in_control_file() {
        let script = ":: chapter1\n    Hi\n:: .sub\n    There\n";
        let engine = build(script);
        assert_eq!(engine.control_calls(), ["chapter1", "chapter1.sub"]);
        assert_eq!(
            engine.output("story.rpy").unwrap(),
            "label chapter1:\n    \"Hi\"\nlabel .sub:\n    \"There\"\n"
        );
    }

    #[test]
    fn test_local_label_after_dotted_label() {
        let script = ":: ch1.intro\n    A\n:: .sub\n    B\n";
        let engine = build(script);
        assert_eq!(engine.control_calls(), ["ch1.intro", "ch1.sub"]);
    }

    #[test]
    fn test_label_root() {
        assert_eq!(label_root("ch1.intro"), Some("ch1"));
        assert_eq!(label_root("start"), Some("start"));
        assert_eq!(label_root(".sub"), None);
    }

    #[test]
    fn test_parent_files() {
        let config = Config {
            create_parent_files: true,
            ..Default::default()
        };
        let script = ":: ch1.intro\n    A\n:: ch2\n    B\n:: ch1.outro\n    C\n";
        let engine = build_with(config, script);
        assert_eq!(
            engine.output("ch1.rpy").unwrap(),
            "label ch1.intro:\n    \"A\"\nlabel ch1.outro:\n    \"C\"\n"
        );
        assert_eq!(engine.output("ch2.rpy").unwrap(), "label ch2:\n    \"B\"\n");
        assert!(engine.output("story.rpy").is_none());
    }

    #[test]
    fn test_file_redirection_reuses_handles() {
        let script = ":file a.rpy\nOne\n:file b.rpy\nTwo\n:file a.rpy\nThree\n";
        let engine = build(script);
        assert_eq!(engine.output("a.rpy").unwrap(), "\"One\"\n\"Three\"\n");
        assert_eq!(engine.output("b.rpy").unwrap(), "\"Two\"\n");
    }
}
