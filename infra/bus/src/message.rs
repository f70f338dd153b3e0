//! Structured signal payload: a format template plus typed arguments.
//!
//! Templates use `{}` as a positional placeholder, `{{` and `}}` for literal
//! braces. The bus never renders a message; listeners decide whether and how
//! to do so.

use crate::error::MessageError;
use std::borrow::Cow;
use std::fmt::{self, Write as _};
use std::net::{IpAddr, SocketAddr};

/// A single typed message argument.
#[derive(Debug, Clone, PartialEq)]
pub enum Arg {
    Str(Cow<'static, str>),
    Int(i64),
    UInt(u64),
    Float(f64),
    Bool(bool),
    /// Raw bytes, rendered as lowercase hex.
    Bytes(Vec<u8>),
}

impl fmt::Display for Arg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Str(s) => f.write_str(s),
            Self::Int(v) => write!(f, "{v}"),
            Self::UInt(v) => write!(f, "{v}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::Bool(v) => write!(f, "{v}"),
            Self::Bytes(v) => f.write_str(&hex::encode(v)),
        }
    }
}

macro_rules! arg_from {
    ($variant:ident as $target:ty: $($source:ty),+) => {
        $(
            impl From<$source> for Arg {
                fn from(value: $source) -> Self {
                    Self::$variant(<$target>::from(value))
                }
            }
        )+
    };
}

arg_from!(Int as i64: i8, i16, i32, i64);
arg_from!(UInt as u64: u8, u16, u32, u64);
arg_from!(Float as f64: f32, f64);
arg_from!(Bool as bool: bool);

impl From<usize> for Arg {
    fn from(value: usize) -> Self {
        Self::UInt(value as u64)
    }
}

impl From<isize> for Arg {
    fn from(value: isize) -> Self {
        Self::Int(value as i64)
    }
}

impl From<&str> for Arg {
    fn from(value: &str) -> Self {
        Self::Str(Cow::Owned(value.to_owned()))
    }
}

impl From<String> for Arg {
    fn from(value: String) -> Self {
        Self::Str(Cow::Owned(value))
    }
}

impl From<Cow<'static, str>> for Arg {
    fn from(value: Cow<'static, str>) -> Self {
        Self::Str(value)
    }
}

impl From<&String> for Arg {
    fn from(value: &String) -> Self {
        Self::Str(Cow::Owned(value.clone()))
    }
}

impl From<&[u8]> for Arg {
    fn from(value: &[u8]) -> Self {
        Self::Bytes(value.to_vec())
    }
}

impl From<Vec<u8>> for Arg {
    fn from(value: Vec<u8>) -> Self {
        Self::Bytes(value)
    }
}

impl From<IpAddr> for Arg {
    fn from(value: IpAddr) -> Self {
        Self::Str(Cow::Owned(value.to_string()))
    }
}

impl From<SocketAddr> for Arg {
    fn from(value: SocketAddr) -> Self {
        Self::Str(Cow::Owned(value.to_string()))
    }
}

/// Format template plus the arguments that fill its placeholders.
///
/// A `Message` is validated on construction: its placeholder count always
/// equals its argument count, so rendering cannot fail.
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    template: Cow<'static, str>,
    args: Vec<Arg>,
}

impl Message {
    /// Builds a message, checking the template against the arguments.
    ///
    /// # Errors
    /// [`MessageError::MalformedTemplate`] on a stray brace,
    /// [`MessageError::ArgumentMismatch`] when placeholders and arguments differ in count.
    pub fn try_new(
        template: impl Into<Cow<'static, str>>,
        args: Vec<Arg>,
    ) -> Result<Self, MessageError> {
        let template = template.into();
        let expected = placeholders(&template)?;
        if expected != args.len() {
            return Err(MessageError::ArgumentMismatch {
                expected,
                supplied: args.len(),
                context: Some(template),
            });
        }
        Ok(Self { template, args })
    }

    /// Builds a message; used by the emit macros.
    ///
    /// # Panics
    /// When the template is malformed or its placeholder count differs from
    /// `args.len()`. A mismatch is a bug at the call site.
    #[track_caller]
    pub fn new(template: impl Into<Cow<'static, str>>, args: Vec<Arg>) -> Self {
        match Self::try_new(template, args) {
            Ok(message) => message,
            Err(e) => panic!("invalid signal message: {e}"),
        }
    }

    /// A message without arguments.
    ///
    /// # Panics
    /// When `template` contains placeholders or stray braces.
    #[track_caller]
    pub fn text(template: impl Into<Cow<'static, str>>) -> Self {
        Self::new(template, Vec::new())
    }

    #[must_use]
    pub fn template(&self) -> &str {
        &self.template
    }

    #[must_use]
    pub fn args(&self) -> &[Arg] {
        &self.args
    }

    /// Substitutes the arguments into the template.
    #[must_use]
    pub fn render(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut args = self.args.iter();
        let mut chars = self.template.chars().peekable();
        while let Some(c) = chars.next() {
            match (c, chars.peek().copied()) {
                ('{', Some('{')) | ('}', Some('}')) => {
                    chars.next();
                    f.write_char(c)?;
                },
                ('{', Some('}')) => {
                    chars.next();
                    if let Some(arg) = args.next() {
                        write!(f, "{arg}")?;
                    }
                },
                _ => f.write_char(c)?,
            }
        }
        Ok(())
    }
}

fn placeholders(template: &str) -> Result<usize, MessageError> {
    let mut count = 0;
    let mut chars = template.char_indices().peekable();
    while let Some((pos, c)) = chars.next() {
        match (c, chars.peek().map(|&(_, next)| next)) {
            ('{', Some('{')) | ('}', Some('}')) => {
                chars.next();
            },
            ('{', Some('}')) => {
                chars.next();
                count += 1;
            },
            ('{' | '}', _) => {
                return Err(MessageError::MalformedTemplate {
                    message: format!("unmatched '{c}' at byte {pos}").into(),
                    context: Some(Cow::Owned(template.to_owned())),
                });
            },
            _ => {},
        }
    }
    Ok(count)
}

/// Builds a [`Message`] from a template and arguments.
///
/// ```rust
/// let msg = sbus::message!("peer {} sent {} bytes", "10.0.0.1", 512_u32);
/// assert_eq!(msg.render(), "peer 10.0.0.1 sent 512 bytes");
/// ```
#[macro_export]
macro_rules! message {
    ($template:expr $(, $arg:expr)* $(,)?) => {
        $crate::Message::new($template, ::std::vec![$($crate::Arg::from($arg)),*])
    };
}
