//! Record formatting
//!
//! A `Formatter` renders a `LogRecord` to text from a template. The template
//! syntax is selected by a `TemplateStyle` strategy: percent placeholders
//! (`%(levelname)s`), brace placeholders (`{levelname}`), or dollar
//! substitution (`${levelname}` / `$levelname`). Templates are parsed and
//! validated once at construction; malformed templates fail fast.

use super::error::{LogError, Result};
use super::record::LogRecord;

/// Interpolation style for format templates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TemplateStyle {
    /// `%(field)s` placeholders, `%%` for a literal percent
    #[default]
    Percent,
    /// `{field}` placeholders, `{{` / `}}` for literal braces
    Brace,
    /// `${field}` or `$field` placeholders, `$$` for a literal dollar
    Dollar,
}

/// Record fields a template may reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RecordField {
    Asctime,
    LevelName,
    Name,
    Message,
    Thread,
    ThreadName,
    Process,
    File,
    Line,
    Module,
}

impl RecordField {
    fn from_name(name: &str) -> Option<Self> {
        match name {
            "asctime" => Some(RecordField::Asctime),
            "levelname" => Some(RecordField::LevelName),
            "name" => Some(RecordField::Name),
            "message" => Some(RecordField::Message),
            "thread" => Some(RecordField::Thread),
            "threadName" => Some(RecordField::ThreadName),
            "process" => Some(RecordField::Process),
            "file" => Some(RecordField::File),
            "line" => Some(RecordField::Line),
            "module" => Some(RecordField::Module),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
enum Token {
    Literal(String),
    Field(RecordField),
}

/// Renders log records to text.
///
/// # Examples
///
/// ```
/// use logtree::core::format::{Formatter, TemplateStyle};
///
/// let formatter = Formatter::new("{asctime} [{levelname}] {name}: {message}", TemplateStyle::Brace)
///     .expect("valid template");
/// ```
#[derive(Debug, Clone)]
pub struct Formatter {
    tokens: Vec<Token>,
    date_format: String,
    millis: bool,
}

pub(crate) const DEFAULT_DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

impl Formatter {
    /// Parse and validate a template.
    ///
    /// # Errors
    ///
    /// Fails on unterminated placeholders and on unknown field names; a bad
    /// template is a configuration error, caught at setup time.
    pub fn new(template: &str, style: TemplateStyle) -> Result<Self> {
        let tokens = match style {
            TemplateStyle::Percent => parse_percent(template)?,
            TemplateStyle::Brace => parse_brace(template)?,
            TemplateStyle::Dollar => parse_dollar(template)?,
        };
        Ok(Self {
            tokens,
            date_format: DEFAULT_DATE_FORMAT.to_string(),
            millis: true,
        })
    }

    /// Set the strftime date pattern used for `asctime`.
    #[must_use]
    pub fn with_date_format(mut self, format: impl Into<String>) -> Self {
        self.date_format = format.into();
        self
    }

    /// Enable or disable millisecond precision on `asctime`.
    #[must_use]
    pub fn with_millis(mut self, millis: bool) -> Self {
        self.millis = millis;
        self
    }

    /// Render the record. Never fails: message-argument problems degrade to
    /// the record's fallback diagnostic string.
    pub fn format(&self, record: &LogRecord) -> String {
        let mut out = String::with_capacity(128);
        for token in &self.tokens {
            match token {
                Token::Literal(text) => out.push_str(text),
                Token::Field(field) => self.render_field(*field, record, &mut out),
            }
        }
        if let Some(ref exception) = record.exception {
            out.push('\n');
            out.push_str(exception);
        }
        out
    }

    fn render_field(&self, field: RecordField, record: &LogRecord, out: &mut String) {
        match field {
            RecordField::Asctime => {
                out.push_str(&record.timestamp.format(&self.date_format).to_string());
                if self.millis {
                    out.push_str(&format!(".{:03}", record.timestamp.timestamp_subsec_millis()));
                }
            }
            RecordField::LevelName => out.push_str(record.level.as_str()),
            RecordField::Name => out.push_str(&record.name),
            RecordField::Message => {
                out.push_str(&record.rendered_message());
                if !record.extra.is_empty() {
                    out.push_str(" | ");
                    out.push_str(&record.extra.format_fields());
                }
            }
            RecordField::Thread => out.push_str(&record.thread_id),
            RecordField::ThreadName => {
                out.push_str(record.thread_name.as_deref().unwrap_or(&record.thread_id));
            }
            RecordField::Process => out.push_str(&record.process_id.to_string()),
            RecordField::File => out.push_str(record.file.as_deref().unwrap_or("?")),
            RecordField::Line => match record.line {
                Some(line) => out.push_str(&line.to_string()),
                None => out.push('?'),
            },
            RecordField::Module => out.push_str(record.module_path.as_deref().unwrap_or("?")),
        }
    }
}

impl Default for Formatter {
    /// `%(asctime)s [%(levelname)s] %(name)s: %(message)s`
    fn default() -> Self {
        Self {
            tokens: vec![
                Token::Field(RecordField::Asctime),
                Token::Literal(" [".to_string()),
                Token::Field(RecordField::LevelName),
                Token::Literal("] ".to_string()),
                Token::Field(RecordField::Name),
                Token::Literal(": ".to_string()),
                Token::Field(RecordField::Message),
            ],
            date_format: DEFAULT_DATE_FORMAT.to_string(),
            millis: true,
        }
    }
}

fn lookup(name: &str) -> Result<RecordField> {
    RecordField::from_name(name)
        .ok_or_else(|| LogError::template(format!("unknown record field '{}'", name)))
}

fn push_literal(tokens: &mut Vec<Token>, literal: &mut String) {
    if !literal.is_empty() {
        tokens.push(Token::Literal(std::mem::take(literal)));
    }
}

fn parse_percent(template: &str) -> Result<Vec<Token>> {
    let mut tokens = Vec::new();
    let mut literal = String::new();
    let mut chars = template.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '%' {
            literal.push(c);
            continue;
        }
        match chars.next() {
            Some('%') => literal.push('%'),
            Some('(') => {
                let mut name = String::new();
                loop {
                    match chars.next() {
                        Some(')') => break,
                        Some(c) => name.push(c),
                        None => {
                            return Err(LogError::template(format!(
                                "unterminated placeholder '%({}' in template",
                                name
                            )))
                        }
                    }
                }
                match chars.next() {
                    Some('s') | Some('d') => {}
                    _ => {
                        return Err(LogError::template(format!(
                            "placeholder '%({})' must end with 's' or 'd'",
                            name
                        )))
                    }
                }
                push_literal(&mut tokens, &mut literal);
                tokens.push(Token::Field(lookup(&name)?));
            }
            _ => {
                return Err(LogError::template(
                    "stray '%' in template; use '%%' for a literal percent",
                ))
            }
        }
    }
    push_literal(&mut tokens, &mut literal);
    Ok(tokens)
}

fn parse_brace(template: &str) -> Result<Vec<Token>> {
    let mut tokens = Vec::new();
    let mut literal = String::new();
    let mut chars = template.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '{' => {
                if chars.peek() == Some(&'{') {
                    chars.next();
                    literal.push('{');
                    continue;
                }
                let mut name = String::new();
                loop {
                    match chars.next() {
                        Some('}') => break,
                        Some(c) => name.push(c),
                        None => {
                            return Err(LogError::template(format!(
                                "unterminated placeholder '{{{}' in template",
                                name
                            )))
                        }
                    }
                }
                push_literal(&mut tokens, &mut literal);
                tokens.push(Token::Field(lookup(&name)?));
            }
            '}' => {
                if chars.peek() == Some(&'}') {
                    chars.next();
                    literal.push('}');
                } else {
                    return Err(LogError::template(
                        "stray '}' in template; use '}}' for a literal brace",
                    ));
                }
            }
            _ => literal.push(c),
        }
    }
    push_literal(&mut tokens, &mut literal);
    Ok(tokens)
}

fn parse_dollar(template: &str) -> Result<Vec<Token>> {
    let mut tokens = Vec::new();
    let mut literal = String::new();
    let mut chars = template.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '$' {
            literal.push(c);
            continue;
        }
        match chars.peek() {
            Some('$') => {
                chars.next();
                literal.push('$');
            }
            Some('{') => {
                chars.next();
                let mut name = String::new();
                loop {
                    match chars.next() {
                        Some('}') => break,
                        Some(c) => name.push(c),
                        None => {
                            return Err(LogError::template(format!(
                                "unterminated placeholder '${{{}' in template",
                                name
                            )))
                        }
                    }
                }
                push_literal(&mut tokens, &mut literal);
                tokens.push(Token::Field(lookup(&name)?));
            }
            Some(c) if c.is_ascii_alphabetic() || *c == '_' => {
                let mut name = String::new();
                while let Some(c) = chars.peek() {
                    if c.is_ascii_alphanumeric() || *c == '_' {
                        name.push(*c);
                        chars.next();
                    } else {
                        break;
                    }
                }
                push_literal(&mut tokens, &mut literal);
                tokens.push(Token::Field(lookup(&name)?));
            }
            _ => {
                return Err(LogError::template(
                    "stray '$' in template; use '$$' for a literal dollar",
                ))
            }
        }
    }
    push_literal(&mut tokens, &mut literal);
    Ok(tokens)
}
