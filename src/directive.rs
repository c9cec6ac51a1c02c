//! Script directive parsing for `:keyword` lines
//!
//! Directives are tried in a fixed order and the first match wins. Several
//! argument shapes overlap (`:c` and `:config`, `:s` and `:sc`), so the order
//! in [`DirectiveKind::ALL`] is part of the grammar.
//!
//! ```text
//! :l Good {name} = Hello, {0}!     :: chapter1.intro
//! :p e = eileen                    :s eileen happy
//! :config nvl_suffix = "_nvl"      :import common.rps
//! ```

use std::sync::LazyLock;

use log::Level;
use regex::Regex;

use crate::error::BuildError;

/// Matches any line shaped like a directive, capturing its keyword
static KEYWORD_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^:(:|[A-Za-z]+:?)").unwrap_or_else(|_| panic!("Invalid keyword pattern"))
});

/// Compiled directive patterns in match order
static DIRECTIVE_PATTERNS: LazyLock<Vec<(DirectiveKind, Regex)>> = LazyLock::new(|| {
    DirectiveKind::ALL
        .iter()
        .map(|kind| {
            let re = Regex::new(kind.pattern())
                .unwrap_or_else(|_| panic!("Invalid directive pattern: {}", kind.pattern()));
            (*kind, re)
        })
        .collect()
});

/// Directive shapes, one per pattern
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DirectiveKind {
    LineRule,
    LineRuleBlock,
    PrefixRule,
    PrefixRuleBlock,
    Label,
    Scene,
    Show,
    With,
    Call,
    Jump,
    Return,
    Menu,
    If,
    Elif,
    Else,
    Nvl,
    Clear,
    Import,
    File,
    Log,
    Config,
    ConfigBlock,
    Break,
    Voice,
    Play,
}

impl DirectiveKind {
    /// Match order
    pub const ALL: [DirectiveKind; 25] = [
        DirectiveKind::LineRule,
        DirectiveKind::LineRuleBlock,
        DirectiveKind::PrefixRule,
        DirectiveKind::PrefixRuleBlock,
        DirectiveKind::Label,
        DirectiveKind::Scene,
        DirectiveKind::Show,
        DirectiveKind::With,
        DirectiveKind::Call,
        DirectiveKind::Jump,
        DirectiveKind::Return,
        DirectiveKind::Menu,
        DirectiveKind::If,
        DirectiveKind::Elif,
        DirectiveKind::Else,
        DirectiveKind::Nvl,
        DirectiveKind::Clear,
        DirectiveKind::Import,
        DirectiveKind::File,
        DirectiveKind::Log,
        DirectiveKind::Config,
        DirectiveKind::ConfigBlock,
        DirectiveKind::Break,
        DirectiveKind::Voice,
        DirectiveKind::Play,
    ];

    fn pattern(self) -> &'static str {
        match self {
            DirectiveKind::LineRule => r"^:l\s+(.*?)\s*=\s*(.*)$",
            DirectiveKind::LineRuleBlock => r"^:l:$",
            DirectiveKind::PrefixRule => r"^:p\s+(.*?)\s*=\s*(.*)$",
            DirectiveKind::PrefixRuleBlock => r"^:p:$",
            DirectiveKind::Label => r"^::\s*(\.?.*?):?$",
            DirectiveKind::Scene => r"^:sc\s+(.*)$",
            DirectiveKind::Show => r"^:s\s+(.*)$",
            DirectiveKind::With => r"^:w\s+(.*)$",
            DirectiveKind::Call => r"^:c\s+(.*)$",
            DirectiveKind::Jump => r"^:j\s+(.*)$",
            DirectiveKind::Return => r"^:r$",
            DirectiveKind::Menu => r"^:m:$",
            DirectiveKind::If => r"^:if\s+(.*?):$",
            DirectiveKind::Elif => r"^:elif\s+(.*?):$",
            DirectiveKind::Else => r"^:else:$",
            DirectiveKind::Nvl => r"^:nvl:$",
            DirectiveKind::Clear => r"^:clear$",
            DirectiveKind::Import => r"^:import\s+(.*)$",
            DirectiveKind::File => r"^:file\s+(.*)$",
            DirectiveKind::Log => {
                r"^:log\s+(0|1|2|3|4|VERBOSE|DEBUG|INFO|WARN|WARNING|ERROR)\s+(.*)$"
            }
            DirectiveKind::Config => r"^:config\s+(.*?)\s*=\s*(.*)$",
            DirectiveKind::ConfigBlock => r"^:config:$",
            DirectiveKind::Break => r"^:break$",
            DirectiveKind::Voice => r"^:v\s+(.*)$",
            DirectiveKind::Play => r"^:a\s+(\S+)\s+(.*)$",
        }
    }

    /// Keyword as written after the leading `:`
    #[must_use]
    pub fn keyword(self) -> &'static str {
        match self {
            DirectiveKind::LineRule => "l",
            DirectiveKind::LineRuleBlock => "l:",
            DirectiveKind::PrefixRule => "p",
            DirectiveKind::PrefixRuleBlock => "p:",
            DirectiveKind::Label => ":",
            DirectiveKind::Scene => "sc",
            DirectiveKind::Show => "s",
            DirectiveKind::With => "w",
            DirectiveKind::Call => "c",
            DirectiveKind::Jump => "j",
            DirectiveKind::Return => "r",
            DirectiveKind::Menu => "m:",
            DirectiveKind::If => "if",
            DirectiveKind::Elif => "elif",
            DirectiveKind::Else => "else:",
            DirectiveKind::Nvl => "nvl:",
            DirectiveKind::Clear => "clear",
            DirectiveKind::Import => "import",
            DirectiveKind::File => "file",
            DirectiveKind::Log => "log",
            DirectiveKind::Config => "config",
            DirectiveKind::ConfigBlock => "config:",
            DirectiveKind::Break => "break",
            DirectiveKind::Voice => "v",
            DirectiveKind::Play => "a",
        }
    }
}

/// Multi-line directive whose body lines reuse a single-line form
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockKind {
    LineRules,
    PrefixRules,
    Config,
}

impl BlockKind {
    /// Single-line directive each body line is parsed as
    #[must_use]
    pub fn line_kind(self) -> DirectiveKind {
        match self {
            BlockKind::LineRules => DirectiveKind::LineRule,
            BlockKind::PrefixRules => DirectiveKind::PrefixRule,
            BlockKind::Config => DirectiveKind::Config,
        }
    }
}

/// A parsed directive with its arguments
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Directive {
    LineRule { pattern: String, template: String },
    PrefixRule { pattern: String, name: String },
    Block(BlockKind),
    Label(String),
    Scene(String),
    Show(String),
    With(String),
    Call(String),
    Jump(String),
    Return,
    Menu,
    If(String),
    Elif(String),
    Else,
    Nvl,
    Clear,
    Import(String),
    File(String),
    Log { level: Level, message: String },
    Config { key: String, value: String },
    Break,
    Voice(String),
    Play { channel: String, file: String },
}

/// Map a `:log` level token to a log level
#[must_use]
pub fn parse_log_level(token: &str) -> Option<Level> {
    match token {
        "0" | "VERBOSE" => Some(Level::Trace),
        "1" | "DEBUG" => Some(Level::Debug),
        "2" | "INFO" => Some(Level::Info),
        "3" | "WARN" | "WARNING" => Some(Level::Warn),
        "4" | "ERROR" => Some(Level::Error),
        _ => None,
    }
}

fn build(kind: DirectiveKind, line: &str, caps: &regex::Captures<'_>) -> Result<Directive, BuildError> {
    let arg = |i: usize| caps.get(i).map_or("", |m| m.as_str().trim()).to_string();
    let malformed = || BuildError::MalformedDirective {
        keyword: kind.keyword().to_string(),
        line: line.to_string(),
    };

    let directive = match kind {
        DirectiveKind::LineRule => Directive::LineRule {
            pattern: arg(1),
            template: arg(2),
        },
        DirectiveKind::PrefixRule => Directive::PrefixRule {
            pattern: arg(1),
            name: arg(2),
        },
        DirectiveKind::LineRuleBlock => Directive::Block(BlockKind::LineRules),
        DirectiveKind::PrefixRuleBlock => Directive::Block(BlockKind::PrefixRules),
        DirectiveKind::ConfigBlock => Directive::Block(BlockKind::Config),
        DirectiveKind::Label => {
            let name = arg(1);
            if name.is_empty() || name == "." {
                return Err(malformed());
            }
            Directive::Label(name)
        }
        DirectiveKind::Scene => Directive::Scene(arg(1)),
        DirectiveKind::Show => Directive::Show(arg(1)),
        DirectiveKind::With => Directive::With(arg(1)),
        DirectiveKind::Call => Directive::Call(arg(1)),
        DirectiveKind::Jump => Directive::Jump(arg(1)),
        DirectiveKind::Return => Directive::Return,
        DirectiveKind::Menu => Directive::Menu,
        DirectiveKind::If => Directive::If(arg(1)),
        DirectiveKind::Elif => Directive::Elif(arg(1)),
        DirectiveKind::Else => Directive::Else,
        DirectiveKind::Nvl => Directive::Nvl,
        DirectiveKind::Clear => Directive::Clear,
        DirectiveKind::Import => Directive::Import(arg(1)),
        DirectiveKind::File => Directive::File(arg(1)),
        DirectiveKind::Log => Directive::Log {
            level: parse_log_level(&arg(1)).ok_or_else(malformed)?,
            message: arg(2),
        },
        DirectiveKind::Config => Directive::Config {
            key: arg(1),
            value: arg(2),
        },
        DirectiveKind::Break => Directive::Break,
        DirectiveKind::Voice => Directive::Voice(arg(1)),
        DirectiveKind::Play => Directive::Play {
            channel: arg(1),
            file: arg(2),
        },
    };

    let empty_argument = match &directive {
        Directive::LineRule { pattern, .. } | Directive::PrefixRule { pattern, .. } => {
            pattern.is_empty()
        }
        Directive::Config { key, .. } => key.is_empty(),
        Directive::Scene(a)
        | Directive::Show(a)
        | Directive::With(a)
        | Directive::Call(a)
        | Directive::Jump(a)
        | Directive::If(a)
        | Directive::Elif(a)
        | Directive::Import(a)
        | Directive::File(a)
        | Directive::Voice(a) => a.is_empty(),
        _ => false,
    };
    if empty_argument {
        return Err(malformed());
    }
    Ok(directive)
}

/// Parse a trimmed line as a directive.
///
/// Returns `None` when no directive pattern matches. A matching pattern with
/// unusable arguments is an error.
pub fn parse_directive(line: &str) -> Option<Result<Directive, BuildError>> {
    DIRECTIVE_PATTERNS.iter().find_map(|(kind, re)| {
        re.captures(line).map(|caps| build(*kind, line, &caps))
    })
}

/// Parse a line inside a multi-line directive as `:<keyword> <line>`
pub fn parse_block_line(block: BlockKind, line: &str) -> Result<Directive, BuildError> {
    let kind = block.line_kind();
    let full = format!(":{} {}", kind.keyword(), line);
    let (_, re) = DIRECTIVE_PATTERNS
        .iter()
        .find(|(k, _)| *k == kind)
        .ok_or_else(|| BuildError::MalformedDirective {
            keyword: kind.keyword().to_string(),
            line: full.clone(),
        })?;
    match re.captures(&full) {
        Some(caps) => build(kind, &full, &caps),
        None => Err(BuildError::MalformedDirective {
            keyword: kind.keyword().to_string(),
            line: full,
        }),
    }
}

/// Keyword of a directive-shaped line that matched no pattern, when the
/// keyword itself is known. Such a line has malformed arguments.
#[must_use]
pub fn known_keyword(line: &str) -> Option<&'static str> {
    let caps = KEYWORD_RE.captures(line)?;
    let word = caps.get(1)?.as_str();
    let bare = word.trim_end_matches(':');
    DirectiveKind::ALL.iter().find_map(|kind| {
        let keyword = kind.keyword();
        let known = keyword == word || (!bare.is_empty() && keyword.trim_end_matches(':') == bare);
        known.then_some(keyword)
    })
}
