//! Property-list XML reader
//!
//! Produces a `serde_json::Value` tree: `dict` becomes an object, `array` an
//! array, `integer`/`real` numbers, `true`/`false` booleans, and `string`,
//! `date` and `data` strings (data stays base64).

use quick_xml::events::Event;
use quick_xml::Reader;
use serde_json::{Map, Number, Value};

/// Failure to read a property list
#[derive(Debug, thiserror::Error)]
pub enum PlistError {
    #[error("malformed XML: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("{0}")]
    Structure(String),
}

/// Parse a property-list document
///
/// # Errors
///
/// Returns an error for malformed XML or an unexpected element.
pub fn parse(xml: &str) -> Result<Value, PlistError> {
    let mut parser = Parser::new(xml);

    match parser.next()? {
        Token::Open(tag) if tag == "plist" => {}
        other => return Err(PlistError::Structure(format!("expected <plist>, found {other:?}"))),
    }
    let value = parser.value()?;
    match parser.next()? {
        Token::Close(tag) if tag == "plist" => Ok(value),
        other => Err(PlistError::Structure(format!("expected </plist>, found {other:?}"))),
    }
}

#[derive(Debug, PartialEq)]
enum Token {
    Open(String),
    Empty(String),
    Close(String),
    Text(String),
    Eof,
}

struct Parser<'a> {
    reader: Reader<&'a [u8]>,
}

impl<'a> Parser<'a> {
    fn new(xml: &'a str) -> Self {
        let mut reader = Reader::from_str(xml);
        reader.config_mut().trim_text(true);
        Self { reader }
    }

    fn next(&mut self) -> Result<Token, PlistError> {
        loop {
            let token = match self.reader.read_event()? {
                Event::Start(e) => Token::Open(tag_name(e.name().as_ref())),
                Event::Empty(e) => Token::Empty(tag_name(e.name().as_ref())),
                Event::End(e) => Token::Close(tag_name(e.name().as_ref())),
                Event::Text(t) => Token::Text(
                    t.unescape()
                        .map_err(|e| PlistError::Structure(e.to_string()))?
                        .into_owned(),
                ),
                Event::CData(c) => Token::Text(String::from_utf8_lossy(&c).into_owned()),
                Event::Eof => Token::Eof,
                Event::Decl(_) | Event::DocType(_) | Event::Comment(_) | Event::PI(_) => continue,
            };
            return Ok(token);
        }
    }

    fn value(&mut self) -> Result<Value, PlistError> {
        match self.next()? {
            Token::Open(tag) => self.open_value(&tag),
            Token::Empty(tag) => empty_value(&tag),
            other => Err(PlistError::Structure(format!("expected a value, found {other:?}"))),
        }
    }

    fn open_value(&mut self, tag: &str) -> Result<Value, PlistError> {
        match tag {
            "dict" => self.dict(),
            "array" => self.array(),
            "string" | "date" | "data" => Ok(Value::String(self.text(tag)?)),
            "integer" => {
                let text = self.text(tag)?;
                let number = text
                    .parse::<i64>()
                    .map(Number::from)
                    .or_else(|_| text.parse::<u64>().map(Number::from))
                    .map_err(|_| PlistError::Structure(format!("invalid integer {text:?}")))?;
                Ok(Value::Number(number))
            }
            "real" => {
                let text = self.text(tag)?;
                text.parse::<f64>()
                    .ok()
                    .and_then(Number::from_f64)
                    .map(Value::Number)
                    .ok_or_else(|| PlistError::Structure(format!("invalid real {text:?}")))
            }
            "true" | "false" => {
                self.expect_close(tag)?;
                Ok(Value::Bool(tag == "true"))
            }
            other => Err(PlistError::Structure(format!("unknown element <{other}>"))),
        }
    }

    fn dict(&mut self) -> Result<Value, PlistError> {
        let mut map = Map::new();
        loop {
            match self.next()? {
                Token::Close(tag) if tag == "dict" => return Ok(Value::Object(map)),
                Token::Open(tag) if tag == "key" => {
                    let key = self.text("key")?;
                    let value = self.value()?;
                    map.insert(key, value);
                }
                Token::Empty(tag) if tag == "key" => {
                    let value = self.value()?;
                    map.insert(String::new(), value);
                }
                other => return Err(PlistError::Structure(format!("expected <key>, found {other:?}"))),
            }
        }
    }

    fn array(&mut self) -> Result<Value, PlistError> {
        let mut items = Vec::new();
        loop {
            match self.next()? {
                Token::Close(tag) if tag == "array" => return Ok(Value::Array(items)),
                Token::Open(tag) => items.push(self.open_value(&tag)?),
                Token::Empty(tag) => items.push(empty_value(&tag)?),
                other => return Err(PlistError::Structure(format!("unexpected {other:?} in <array>"))),
            }
        }
    }

    /// Collect text up to the closing `tag`
    fn text(&mut self, tag: &str) -> Result<String, PlistError> {
        let mut text = String::new();
        loop {
            match self.next()? {
                Token::Text(t) => text.push_str(&t),
                Token::Close(close) if close == tag => return Ok(text),
                other => return Err(PlistError::Structure(format!("unexpected {other:?} in <{tag}>"))),
            }
        }
    }

    fn expect_close(&mut self, tag: &str) -> Result<(), PlistError> {
        match self.next()? {
            Token::Close(close) if close == tag => Ok(()),
            other => Err(PlistError::Structure(format!("expected </{tag}>, found {other:?}"))),
        }
    }
}

fn empty_value(tag: &str) -> Result<Value, PlistError> {
    match tag {
        "true" => Ok(Value::Bool(true)),
        "false" => Ok(Value::Bool(false)),
        "dict" => Ok(Value::Object(Map::new())),
        "array" => Ok(Value::Array(Vec::new())),
        "string" | "data" => Ok(Value::String(String::new())),
        other => Err(PlistError::Structure(format!("unexpected empty <{other}/>"))),
    }
}

fn tag_name(name: &[u8]) -> String {
    String::from_utf8_lossy(name).into_owned()
}
