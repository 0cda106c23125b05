/// Parser for sectioned settings documents of the form
///
/// ```text
/// sampler
///   points_1d_max: 2000
///   large_value: 1e10
/// solver
///   window: -100, 100
/// ```
///
/// A document is a list of sections; each section is a title followed by `key: value, value`
/// pairs. Lines starting with `//`, `#` or `%` are comments.
use nom::{
    IResult, Parser,
    branch::alt,
    bytes::complete::{tag, take_while1},
    character::complete::{alpha1, alphanumeric1, multispace0, space0},
    combinator::{map, recognize},
    multi::{many0, many1, separated_list1},
    sequence::{delimited, pair, separated_pair, terminated},
};
use std::collections::HashMap;
use std::fmt::Display;

pub type SectionMap = HashMap<String, Vec<Value>>;
pub type DocumentMap = HashMap<String, SectionMap>;

/// A single scalar value of a key.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    String(String),
    Float(f64),
    Integer(i64),
    Boolean(bool),
}

impl Value {
    /// Numeric view; integers widen to `f64`.
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            Value::Integer(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn as_integer(&self) -> Option<i64> {
        if let Value::Integer(i) = self { Some(*i) } else { None }
    }

    pub fn as_boolean(&self) -> Option<bool> {
        if let Value::Boolean(b) = self { Some(*b) } else { None }
    }

    pub fn as_string(&self) -> Option<&str> {
        if let Value::String(s) = self { Some(s) } else { None }
    }
}

impl Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::String(s) => write!(f, "{}", s),
            Value::Float(val) => write!(f, "{}", val),
            Value::Integer(val) => write!(f, "{}", val),
            Value::Boolean(val) => write!(f, "{}", val),
        }
    }
}

/// identifier: letter or `_`, then letters, digits and `_`
fn parse_identifier(input: &str) -> IResult<&str, String> {
    let mut parser = map(
        recognize(pair(
            alt((alpha1, tag("_"))),
            many0(alt((alphanumeric1, tag("_")))),
        )),
        String::from,
    );
    parser.parse(input)
}

fn parse_title(input: &str) -> IResult<&str, String> {
    let (input, title) = parse_identifier(input)?;
    Ok((input.trim_start(), title))
}

fn parse_value(input: &str) -> IResult<&str, Value> {
    let mut value_parser = map(
        take_while1(|c: char| !matches!(c, ',' | ' ' | '\t' | '\r' | '\n' | ';')),
        |s: &str| {
            if let Ok(val) = s.parse::<i64>() {
                Value::Integer(val)
            } else if let Ok(val) = s.parse::<f64>() {
                Value::Float(val)
            } else if let Ok(val) = s.parse::<bool>() {
                Value::Boolean(val)
            } else {
                Value::String(s.to_string())
            }
        },
    );
    value_parser.parse(input)
}

fn parse_value_list(input: &str) -> IResult<&str, Vec<Value>> {
    let (input, _) = space0(input)?;
    let separator = delimited(space0, tag(","), space0);
    separated_list1(separator, parse_value).parse(input)
}

fn parse_key_value_pair(input: &str) -> IResult<&str, (String, Vec<Value>)> {
    let colon = delimited(space0, tag(":"), space0);
    let (input, result) = separated_pair(parse_identifier, colon, parse_value_list).parse(input)?;
    // an optional `;` closes a pair
    let input = input.trim_start();
    let input = input.strip_prefix(';').unwrap_or(input);
    Ok((input.trim_start(), result))
}

fn parse_section(input: &str) -> IResult<&str, (String, SectionMap)> {
    let (input, title) = parse_title(input)?;
    let (input, _) = multispace0(input)?;
    let (input, pairs) = many1(terminated(parse_key_value_pair, multispace0)).parse(input)?;
    Ok((input, (title, pairs.into_iter().collect())))
}

fn strip_comments(input: &str) -> String {
    input
        .lines()
        .filter(|line| {
            let trimmed = line.trim();
            !(trimmed.is_empty()
                || trimmed.starts_with("//")
                || trimmed.starts_with('#')
                || trimmed.starts_with('%'))
        })
        .collect::<Vec<&str>>()
        .join("\n")
}

/// Parses a whole document. Repeated sections are merged; a repeated key keeps the last value.
pub fn parse_document(input: &str) -> Result<DocumentMap, String> {
    let cleaned = strip_comments(input);
    if cleaned.trim().is_empty() {
        return Ok(DocumentMap::new());
    }
    let mut parser = many1(delimited(multispace0, parse_section, multispace0));
    let (remaining, sections) = parser
        .parse(cleaned.as_str())
        .map_err(|e| format!("Parsing error: {:?}", e))?;
    if !remaining.trim().is_empty() {
        return Err(format!(
            "Failed to parse entire document. Remaining: '{}'",
            remaining.trim()
        ));
    }
    let mut document = DocumentMap::new();
    for (title, section) in sections {
        document.entry(title).or_default().extend(section);
    }
    Ok(document)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_title() {
        let (remaining, title) = parse_title("sampler\n points_1d_max: 10").unwrap();
        assert_eq!(title, "sampler");
        assert_eq!(remaining, "points_1d_max: 10");

        let (remaining, title) = parse_title("_solver2 window: 1").unwrap();
        assert_eq!(title, "_solver2");
        assert_eq!(remaining, "window: 1");
    }

    #[test]
    fn test_parse_value() {
        assert_eq!(parse_value("123, x").unwrap(), (", x", Value::Integer(123)));
        assert_eq!(parse_value("-100").unwrap(), ("", Value::Integer(-100)));
        assert_eq!(parse_value("1e10 next").unwrap(), (" next", Value::Float(1e10)));
        assert_eq!(parse_value("true").unwrap(), ("", Value::Boolean(true)));
        assert_eq!(
            parse_value("debug;").unwrap(),
            (";", Value::String("debug".to_string()))
        );
    }

    #[test]
    fn test_parse_key_value_pair() {
        let (remaining, (key, values)) = parse_key_value_pair("window : -100 , 100").unwrap();
        assert_eq!(key, "window");
        assert_eq!(values, vec![Value::Integer(-100), Value::Integer(100)]);
        assert_eq!(remaining, "");

        let (remaining, (key, values)) = parse_key_value_pair("loglevel: off; timeout_ms: 5").unwrap();
        assert_eq!(key, "loglevel");
        assert_eq!(values, vec![Value::String("off".to_string())]);
        assert_eq!(remaining, "timeout_ms: 5");

        assert!(parse_key_value_pair("window:").is_err());
    }

    #[test]
    fn test_parse_section_stops_at_next_title() {
        let (remaining, (title, map)) =
            parse_section("sampler points_1d_min: 10 points_1d_max: 2000 solver").unwrap();
        assert_eq!(title, "sampler");
        assert_eq!(map.len(), 2);
        assert_eq!(map["points_1d_max"], vec![Value::Integer(2000)]);
        assert_eq!(remaining, "solver");
    }

    #[test]
    fn test_parse_document() {
        let input = r#"
        // engine settings
        sampler
            points_1d_max: 1000
            large_value: 1e8
        # solver settings
        solver
            window: -10, 10
            tolerance: 1e-9
        engine
            loglevel: off
        "#;
        let document = parse_document(input).unwrap();
        assert_eq!(document.len(), 3);
        assert_eq!(document["sampler"]["points_1d_max"][0].as_integer(), Some(1000));
        assert_eq!(document["sampler"]["large_value"][0].as_float(), Some(1e8));
        assert_eq!(
            document["solver"]["window"],
            vec![Value::Integer(-10), Value::Integer(10)]
        );
        assert_eq!(document["engine"]["loglevel"][0].as_string(), Some("off"));
    }

    #[test]
    fn test_repeated_sections_merge() {
        let document = parse_document("solver window: 1, 2\nsolver tolerance: 0.1").unwrap();
        assert_eq!(document["solver"].len(), 2);
    }

    #[test]
    fn test_empty_and_malformed_documents() {
        assert!(parse_document("").unwrap().is_empty());
        assert!(parse_document("// only a comment").unwrap().is_empty());
        assert!(parse_document("sampler").is_err());
        assert!(parse_document("sampler points: 10 ???").is_err());
    }
}
