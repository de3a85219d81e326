/// parse document with structure like
/// ```text
/// title1
///   key1: value1, value2
///   key2: value with spaces
/// title2
///   key3: value3; key4: value4
/// ```
/// which has titles and pairs key-vector of values. A template
/// HashMap<String, HashMap<String, Option<Vec<Value>>>> lists the keys the caller expects:
/// if some field i.e. field_x is not found in the document it will be field_x: None.
///
/// Values end at a comma, a semicolon or the end of the line, so they may contain inner spaces
/// (`fprime: 3*x^2 + 1`). Lines starting with `//`, `#`, `%` or `;` are comments.
use nom::{
    IResult, Parser,
    branch::alt,
    bytes::complete::{tag, take_while1},
    character::complete::{alpha1, alphanumeric1, line_ending, multispace0, space0},
    combinator::{eof, map, recognize, verify},
    multi::{many0, many1, separated_list1},
    sequence::{delimited, pair, preceded, separated_pair, terminated},
};
use std::collections::HashMap;
use std::fmt::Display;
use std::path::Path;

pub type SectionMap = HashMap<String, Option<Vec<Value>>>;
pub type DocumentMap = HashMap<String, SectionMap>;

/// enum to represent different value types:
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    String(String),
    Float(f64),
    Integer(i64),
    Boolean(bool),
}

impl Value {
    pub fn as_string(&self) -> Option<&String> {
        if let Value::String(s) = self {
            Some(s)
        } else {
            None
        }
    }

    /// floats and integers both read as f64
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            Value::Integer(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn as_integer(&self) -> Option<i64> {
        if let Value::Integer(i) = self {
            Some(*i)
        } else {
            None
        }
    }

    pub fn as_boolean(&self) -> Option<bool> {
        if let Value::Boolean(b) = self {
            Some(*b)
        } else {
            None
        }
    }

    // Try to convert to string representation
    pub fn to_string_value(&self) -> String {
        match self {
            Value::String(s) => s.clone(),
            Value::Float(f) => f.to_string(),
            Value::Integer(i) => i.to_string(),
            Value::Boolean(b) => b.to_string(),
        }
    }
}

impl Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_string_value())
    }
}

/// Try parsing as different types in order: integer, float, bool, string.
fn classify(s: &str) -> Value {
    if let Ok(val) = s.parse::<i64>() {
        Value::Integer(val)
    } else if let Ok(val) = s.parse::<f64>() {
        Value::Float(val)
    } else if let Ok(val) = s.parse::<bool>() {
        Value::Boolean(val)
    } else {
        Value::String(s.to_string())
    }
}

/// word characters without spaces, used both for titles and keys
fn parse_identifier(input: &str) -> IResult<&str, String> {
    let parser = recognize(pair(
        alt((alpha1, tag("_"))),
        many0(alt((alphanumeric1, tag("_")))),
    ));
    map(parser, String::from).parse(input)
}

/// A title stands alone on its line.
fn parse_title(input: &str) -> IResult<&str, String> {
    preceded(
        multispace0,
        terminated(parse_identifier, (space0, alt((line_ending, eof)))),
    )
    .parse(input)
}

fn parse_value(input: &str) -> IResult<&str, Value> {
    let raw = take_while1(|c: char| !matches!(c, ',' | ';' | '\n' | '\r'));
    map(verify(raw, |s: &str| !s.trim().is_empty()), |s: &str| {
        classify(s.trim())
    })
    .parse(input)
}

fn parse_value_list(input: &str) -> IResult<&str, Vec<Value>> {
    let separator_coma = delimited(space0, tag(","), space0);
    preceded(space0, separated_list1(separator_coma, parse_value)).parse(input)
}

/// `key: v1, v2` ended by `;`, a line break or the end of input
fn parse_key_value_pair(input: &str) -> IResult<&str, (String, Vec<Value>)> {
    let colon_separator = delimited(space0, tag(":"), space0);
    let pair_end = (space0, alt((tag(";"), line_ending, eof)));
    preceded(
        multispace0,
        terminated(
            separated_pair(parse_identifier, colon_separator, parse_value_list),
            pair_end,
        ),
    )
    .parse(input)
}

/// Parses a section with a title and one or more key-value pairs
fn parse_section(input: &str) -> IResult<&str, (String, Vec<(String, Vec<Value>)>)> {
    pair(parse_title, many1(parse_key_value_pair)).parse(input)
}

/// Filters out comment lines (starting with //, #, %, or ;) and blank lines
fn filter_comments(input: &str) -> String {
    input
        .lines()
        .filter(|line| {
            let trimmed = line.trim();
            !trimmed.starts_with("//")
                && !trimmed.starts_with('#')
                && !trimmed.starts_with('%')
                && !trimmed.starts_with(';')
                && !trimmed.is_empty()
        })
        .collect::<Vec<&str>>()
        .join("\n")
}

/// Parses the sections of a document; a title that appears twice merges its keys.
pub fn parse_document(input: &str) -> IResult<&str, DocumentMap> {
    let (input, sections) = terminated(many1(parse_section), multispace0).parse(input)?;
    let mut result: DocumentMap = HashMap::new();
    for (title, pairs) in sections {
        let section = result.entry(title).or_default();
        for (key, values) in pairs {
            section.insert(key, Some(values));
        }
    }
    Ok((input, result))
}

/// Adds every title and key of the template that the document lacks, with value None.
fn merge_template(parsed: &mut DocumentMap, template: &DocumentMap) {
    for (title, keys_map) in template {
        let section = parsed.entry(title.clone()).or_default();
        for key in keys_map.keys() {
            section.entry(key.clone()).or_insert(None);
        }
    }
}

/// Parses a whole document (comments removed) and merges it with an optional template.
pub fn parse_document_as(input: &str, template: Option<DocumentMap>) -> Result<DocumentMap, String> {
    let filtered = filter_comments(input);
    let mut parsed = match parse_document(&filtered) {
        Ok((remaining, parsed)) => {
            if !remaining.trim().is_empty() {
                return Err(format!(
                    "Failed to parse entire document. Remaining: '{}'",
                    remaining
                ));
            }
            parsed
        }
        Err(e) => return Err(format!("Parsing error: {:?}", e)),
    };
    if let Some(template) = template {
        merge_template(&mut parsed, &template);
    }
    Ok(parsed)
}

/// Reads and parses a task file.
pub fn parse_document_from_file(
    path: &Path,
    template: Option<DocumentMap>,
) -> Result<DocumentMap, String> {
    let contents = std::fs::read_to_string(path)
        .map_err(|e| format!("cannot read {}: {}", path.display(), e))?;
    parse_document_as(&contents, template)
}

/// Builds a template from section titles and their expected keys.
pub fn template_from(sections: &[(&str, &[&str])]) -> DocumentMap {
    sections
        .iter()
        .map(|(title, keys)| {
            let keys_map: SectionMap = keys.iter().map(|key| (key.to_string(), None)).collect();
            (title.to_string(), keys_map)
        })
        .collect()
}
