//! Blocking encoders: turn one attribute value into (part of) a block key.

use std::str::FromStr;

use serde::Deserialize;

/// Deterministic, pure transform applied to a blocking attribute.
pub trait Encoder: Send + Sync {
    fn encode(&self, value: &str) -> String;
}

impl<F> Encoder for F
where
    F: Fn(&str) -> String + Send + Sync,
{
    fn encode(&self, value: &str) -> String {
        self(value)
    }
}

/// Built-in encoders, selected by name in the config.
///
/// Accepted forms: `exact`, `soundex`, `prefix:N`, `suffix:N`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(try_from = "String")]
pub enum EncoderSpec {
    Exact,
    Soundex,
    Prefix(usize),
    Suffix(usize),
}

impl Encoder for EncoderSpec {
    fn encode(&self, value: &str) -> String {
        match *self {
            Self::Exact => value.to_string(),
            Self::Soundex => soundex(value),
            Self::Prefix(n) => value.chars().take(n).collect(),
            Self::Suffix(n) => {
                let len = value.chars().count();
                value.chars().skip(len.saturating_sub(n)).collect()
            }
        }
    }
}

impl FromStr for EncoderSpec {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if let Some((name, arg)) = s.split_once(':') {
            let n: usize = arg
                .trim()
                .parse()
                .map_err(|_| format!("encoder '{s}': length must be a non-negative integer"))?;
            if n == 0 {
                return Err(format!("encoder '{s}': length must be at least 1"));
            }
            return match name.trim() {
                "prefix" => Ok(Self::Prefix(n)),
                "suffix" => Ok(Self::Suffix(n)),
                other => Err(format!("unknown encoder '{other}' (expected prefix:N or suffix:N)")),
            };
        }
        match s {
            "exact" => Ok(Self::Exact),
            "soundex" => Ok(Self::Soundex),
            other => Err(format!(
                "unknown encoder '{other}' (expected exact, soundex, prefix:N or suffix:N)"
            )),
        }
    }
}

impl TryFrom<String> for EncoderSpec {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl std::fmt::Display for EncoderSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Exact => write!(f, "exact"),
            Self::Soundex => write!(f, "soundex"),
            Self::Prefix(n) => write!(f, "prefix:{n}"),
            Self::Suffix(n) => write!(f, "suffix:{n}"),
        }
    }
}

fn soundex_digit(c: char) -> Option<char> {
    match c {
        'b' | 'f' | 'p' | 'v' => Some('1'),
        'c' | 'g' | 'j' | 'k' | 'q' | 's' | 'x' | 'z' => Some('2'),
        'd' | 't' => Some('3'),
        'l' => Some('4'),
        'm' | 'n' => Some('5'),
        'r' => Some('6'),
        _ => None,
    }
}

/// American Soundex. Non-letters are ignored; a value without letters
/// encodes to `z000`.
pub fn soundex(value: &str) -> String {
    let mut letters = value
        .chars()
        .filter(char::is_ascii_alphabetic)
        .map(|c| c.to_ascii_lowercase());

    let Some(first) = letters.next() else {
        return "z000".to_string();
    };

    let mut code = String::with_capacity(4);
    code.push(first);
    let mut last = soundex_digit(first);

    for c in letters {
        if code.len() == 4 {
            break;
        }
        match soundex_digit(c) {
            Some(d) if Some(d) != last => {
                code.push(d);
                last = Some(d);
            }
            Some(_) => {}
            // h and w do not separate equal codes; vowels do
            None if c != 'h' && c != 'w' => last = None,
            None => {}
        }
    }

    while code.len() < 4 {
        code.push('0');
    }
    code
}
