//! Criteria Parser
//!
//! Parses textual filter expressions into [`Criteria`], so filters can be
//! given on the command line.
//!
//! # Supported Syntax
//!
//! ```text
//! speed > 10
//! "wind speed" >= 2.5
//! name = 'car' OR name = 'bike'
//! (moving = true OR speed != 0) OR gear < 3
//! ```
//!
//! `OR` chains associate to the left. Strings are single-quoted, identifiers
//! are bare or double-quoted, numbers without a fraction are integers.

use nom::{
    branch::alt,
    bytes::complete::{tag, tag_no_case, take_while, take_while1},
    character::complete::{char, digit1, multispace0, multispace1},
    combinator::{map, map_res, opt, recognize, value},
    multi::many0,
    sequence::{delimited, pair, preceded, tuple},
    IResult,
};

use crate::query::criteria::{Comparison, Criteria, Field, Literal, Operator};
use crate::query::error::{QueryError, QueryResult};

/// Parse a filter expression into criteria
pub fn parse_criteria(input: &str) -> QueryResult<Criteria> {
    let input = input.trim();

    match parse_disjunction(input) {
        Ok((remaining, criteria)) => {
            if remaining.trim().is_empty() {
                Ok(criteria)
            } else {
                Err(QueryError::Parse(format!(
                    "Unexpected input after expression: '{}'",
                    remaining.trim()
                )))
            }
        }
        Err(e) => Err(QueryError::Parse(format!("Parse error: {:?}", e))),
    }
}

/// Parse a `key=value` assignment.
///
/// The value is read as a literal when it is one (quoted string, number,
/// boolean); anything else is taken as plain text.
pub fn parse_assignment(input: &str) -> QueryResult<(String, Literal)> {
    let (key, raw) = input
        .split_once('=')
        .ok_or_else(|| QueryError::Parse(format!("Expected key=value, got '{}'", input)))?;

    let key = match parse_field_name(key.trim()) {
        Ok(("", name)) => name,
        _ => return Err(QueryError::Parse(format!("Invalid field name: '{}'", key.trim()))),
    };

    let raw = raw.trim();
    let literal = match parse_literal(raw) {
        Ok(("", literal)) => literal,
        _ => Literal::String(raw.to_string()),
    };

    Ok((key, literal))
}

/// Parse `term (OR term)*`
fn parse_disjunction(input: &str) -> IResult<&str, Criteria> {
    let (input, first) = parse_term(input)?;
    let (input, rest) = many0(preceded(
        delimited(multispace1, tag_no_case("OR"), multispace1),
        parse_term,
    ))(input)?;

    Ok((input, rest.into_iter().fold(first, |acc, next| acc.or(next))))
}

/// Parse a parenthesised group or a single comparison
fn parse_term(input: &str) -> IResult<&str, Criteria> {
    alt((
        delimited(
            pair(char('('), multispace0),
            parse_disjunction,
            pair(multispace0, char(')')),
        ),
        map(parse_comparison, Criteria::from),
    ))(input)
}

/// Parse comparison like "speed >= 10"
fn parse_comparison(input: &str) -> IResult<&str, Comparison> {
    let (input, name) = parse_field_name(input)?;
    let (input, _) = multispace0(input)?;
    let (input, operator) = parse_operator(input)?;
    let (input, _) = multispace0(input)?;
    let (input, value) = parse_literal(input)?;

    Ok((
        input,
        Comparison {
            field: Field::new(name),
            operator,
            value,
        },
    ))
}

/// Parse comparison operator
fn parse_operator(input: &str) -> IResult<&str, Operator> {
    alt((
        value(Operator::Gte, tag(">=")),
        value(Operator::Lte, tag("<=")),
        value(Operator::Ne, alt((tag("!="), tag("<>")))),
        value(Operator::Gt, tag(">")),
        value(Operator::Lt, tag("<")),
        value(Operator::Eq, alt((tag("=="), tag("=")))),
    ))(input)
}

/// Parse a bare or double-quoted field name
fn parse_field_name(input: &str) -> IResult<&str, String> {
    alt((
        map(parse_identifier, str::to_string),
        map(
            delimited(char('"'), take_while1(|c| c != '"'), char('"')),
            |s: &str| s.to_string(),
        ),
    ))(input)
}

/// Parse identifier (field or tag name)
fn parse_identifier(input: &str) -> IResult<&str, &str> {
    recognize(pair(
        take_while1(|c: char| c.is_alphabetic() || c == '_'),
        take_while(|c: char| c.is_alphanumeric() || c == '_' || c == '.' || c == '-'),
    ))(input)
}

/// Parse the right-hand side of a comparison
fn parse_literal(input: &str) -> IResult<&str, Literal> {
    alt((
        map(parse_quoted_string, Literal::String),
        value(Literal::Boolean(true), tag_no_case("true")),
        value(Literal::Boolean(false), tag_no_case("false")),
        parse_number,
    ))(input)
}

/// Parse quoted string
fn parse_quoted_string(input: &str) -> IResult<&str, String> {
    let (input, _) = char('\'')(input)?;
    let (input, content) = take_while(|c| c != '\'')(input)?;
    let (input, _) = char('\'')(input)?;
    Ok((input, content.to_string()))
}

/// Parse integer or floating point number
fn parse_number(input: &str) -> IResult<&str, Literal> {
    alt((
        map_res(
            recognize(tuple((opt(char('-')), digit1, char('.'), digit1))),
            |s: &str| s.parse::<f64>().map(Literal::Float),
        ),
        map_res(recognize(pair(opt(char('-')), digit1)), |s: &str| {
            s.parse::<i64>().map(Literal::Integer)
        }),
    ))(input)
}
