// Licensed under the Apache-2.0 license

//! The `@axion` / `@axion_def` attribute language.
//!
//! ```text
//! annotation := ws* (item ws*)*
//! item       := key ( '=' value )?
//! key        := [A-Za-z_][A-Za-z0-9_]*
//! value      := '"' [^"]* '"' | [xXbB] '"' [^"]* '"' | [^ \t"]+
//! ```
//!
//! Tokenizing is done by [`tokenize`]; [`SignalAttributes`] and
//! [`ModuleAttributes`] give the items their meaning. Keys and flags are
//! case-insensitive, unknown keys are rejected.

use std::str::FromStr;

use axion_registers_generator::AccessMode;
use winnow::ascii::{multispace0, space0};
use winnow::combinator::{alt, delimited, opt, preceded, repeat, terminated};
use winnow::error::ModalResult;
use winnow::prelude::*;
use winnow::token::{one_of, take_till, take_while};

use crate::error::InputError;
use crate::literal::{parse_bool_literal, parse_int_literal, parse_u32_literal};

/// One `key` or `key=value` item.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Item<'s> {
    pub key: &'s str,
    pub value: Option<&'s str>,
}

fn key<'s>(input: &mut &'s str) -> ModalResult<&'s str> {
    (
        one_of(|c: char| c.is_ascii_alphabetic() || c == '_'),
        take_while(0.., |c: char| c.is_ascii_alphanumeric() || c == '_'),
    )
        .take()
        .parse_next(input)
}

fn quoted<'s>(input: &mut &'s str) -> ModalResult<&'s str> {
    delimited('"', take_till(0.., '"'), '"').parse_next(input)
}

/// `x"0F"` kept whole, quotes included, for the literal parser.
fn bit_string<'s>(input: &mut &'s str) -> ModalResult<&'s str> {
    (one_of(['x', 'X', 'b', 'B']), quoted).take().parse_next(input)
}

fn bare<'s>(input: &mut &'s str) -> ModalResult<&'s str> {
    take_while(1.., |c: char| !c.is_whitespace() && c != '"').parse_next(input)
}

fn item<'s>(input: &mut &'s str) -> ModalResult<Item<'s>> {
    (key, opt(preceded((space0, '=', space0), alt((quoted, bit_string, bare)))))
        .map(|(key, value)| Item { key, value })
        .parse_next(input)
}

fn items<'s>(input: &mut &'s str) -> ModalResult<Vec<Item<'s>>> {
    preceded(multispace0, repeat(0.., terminated(item, multispace0))).parse_next(input)
}

/// Splits annotation text into items.
pub fn tokenize(text: &str) -> Result<Vec<Item<'_>>, InputError> {
    items.parse(text).map_err(|e| {
        InputError::syntax(format!(
            "malformed annotation at column {}: '{}'",
            e.offset() + 1,
            text.trim()
        ))
    })
}

fn required<'s>(item: &Item<'s>) -> Result<&'s str, InputError> {
    item.value
        .ok_or_else(|| InputError::syntax(format!("'{}' requires a value", item.key)))
}

fn flag(item: &Item<'_>) -> Result<bool, InputError> {
    match item.value {
        None => Ok(true),
        Some(v) => parse_bool_literal(v).ok_or_else(|| {
            InputError::syntax(format!("'{}' expects true or false, got '{v}'", item.key))
        }),
    }
}

fn no_value(item: &Item<'_>) -> Result<(), InputError> {
    match item.value {
        None => Ok(()),
        Some(_) => Err(InputError::syntax(format!(
            "'{}' does not take a value",
            item.key
        ))),
    }
}

/// Attributes of one `-- @axion` signal annotation.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SignalAttributes {
    pub access_mode: AccessMode,
    pub address: Option<u64>,
    pub read_strobe: bool,
    pub write_strobe: bool,
    pub default_value: Option<u64>,
    pub description: Option<String>,
    pub reg_name: Option<String>,
    pub bit_offset: Option<u32>,
}

impl FromStr for SignalAttributes {
    type Err = InputError;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        let mut attrs = SignalAttributes::default();
        for item in tokenize(text)? {
            match item.key.to_ascii_uppercase().as_str() {
                "RO" | "RW" | "WO" => {
                    no_value(&item)?;
                    attrs.access_mode = item.key.parse()?;
                }
                "ACCESS" => attrs.access_mode = required(&item)?.parse()?,
                "ADDR" | "ADDRESS" => attrs.address = Some(parse_int_literal(required(&item)?)?),
                "R_STROBE" => attrs.read_strobe = flag(&item)?,
                "W_STROBE" => attrs.write_strobe = flag(&item)?,
                "DEFAULT" => {
                    attrs.default_value = Some(parse_int_literal(required(&item)?)?)
                }
                "DESC" | "DESCRIPTION" => {
                    attrs.description = Some(required(&item)?.to_string())
                }
                "REG_NAME" => attrs.reg_name = Some(required(&item)?.to_string()),
                "BIT_OFFSET" => {
                    attrs.bit_offset = Some(parse_u32_literal(required(&item)?)?)
                }
                _ => {
                    return Err(InputError::syntax(format!(
                        "unknown @axion attribute '{}'",
                        item.key
                    )))
                }
            }
        }
        Ok(attrs)
    }
}

/// Attributes of a `-- @axion_def` module annotation.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ModuleAttributes {
    pub base_address: Option<u64>,
    pub cdc_enabled: Option<bool>,
    pub cdc_stages: Option<u32>,
}

impl FromStr for ModuleAttributes {
    type Err = InputError;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        let mut attrs = ModuleAttributes::default();
        for item in tokenize(text)? {
            match item.key.to_ascii_uppercase().as_str() {
                "BASE_ADDR" | "BASE_ADDRESS" => {
                    attrs.base_address = Some(parse_int_literal(required(&item)?)?)
                }
                "CDC_EN" | "CDC_ENABLED" => attrs.cdc_enabled = Some(flag(&item)?),
                "CDC_STAGE" | "CDC_STAGES" => {
                    attrs.cdc_stages = Some(parse_u32_literal(required(&item)?)?)
                }
                _ => {
                    return Err(InputError::syntax(format!(
                        "unknown @axion_def attribute '{}'",
                        item.key
                    )))
                }
            }
        }
        Ok(attrs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokenize() {
        let items = tokenize("  RO ADDR=0x10 DESC=\"two words\"  R_STROBE ").unwrap();
        assert_eq!(
            items,
            vec![
                Item { key: "RO", value: None },
                Item { key: "ADDR", value: Some("0x10") },
                Item { key: "DESC", value: Some("two words") },
                Item { key: "R_STROBE", value: None },
            ]
        );
        assert!(tokenize("").unwrap().is_empty());
    }

    #[test]
    fn test_tokenize_rejects_malformed() {
        assert!(tokenize("ADDR=").is_err());
        assert!(tokenize("DESC=\"unterminated").is_err());
        assert!(tokenize("9lives").is_err());
    }

    #[test]
    fn test_signal_attributes() {
        let attrs: SignalAttributes =
            "wo addr=0x1_0 default=x\"0F\" w_strobe desc=\"Low\" reg_name=ctrl bit_offset=4"
                .parse()
                .unwrap();
        assert_eq!(attrs.access_mode, AccessMode::WriteOnly);
        assert_eq!(attrs.address, Some(0x10));
        assert_eq!(attrs.default_value, Some(0xF));
        assert!(attrs.write_strobe);
        assert!(!attrs.read_strobe);
        assert_eq!(attrs.description.as_deref(), Some("Low"));
        assert_eq!(attrs.reg_name.as_deref(), Some("ctrl"));
        assert_eq!(attrs.bit_offset, Some(4));
    }

    #[test]
    fn test_signal_defaults_to_rw() {
        let attrs: SignalAttributes = "".parse().unwrap();
        assert_eq!(attrs.access_mode, AccessMode::ReadWrite);
        let attrs: SignalAttributes = "ACCESS=ro".parse().unwrap();
        assert_eq!(attrs.access_mode, AccessMode::ReadOnly);
    }

    #[test]
    fn test_signal_errors() {
        assert!(matches!(
            "RO FOO=1".parse::<SignalAttributes>(),
            Err(InputError::Syntax { msg, .. }) if msg.contains("FOO")
        ));
        assert!(matches!(
            "ADDR=0xZZ".parse::<SignalAttributes>(),
            Err(InputError::InvalidInteger(_))
        ));
        assert!(matches!(
            "ACCESS=RX".parse::<SignalAttributes>(),
            Err(InputError::Validation(_))
        ));
        assert!("RO=1".parse::<SignalAttributes>().is_err());
    }

    #[test]
    fn test_module_attributes() {
        let attrs: ModuleAttributes = "BASE_ADDR=0x1234 CDC_EN CDC_STAGE=4".parse().unwrap();
        assert_eq!(attrs.base_address, Some(0x1234));
        assert_eq!(attrs.cdc_enabled, Some(true));
        assert_eq!(attrs.cdc_stages, Some(4));

        let attrs: ModuleAttributes = "cdc_enabled=false base_address=4096".parse().unwrap();
        assert_eq!(attrs.cdc_enabled, Some(false));
        assert_eq!(attrs.base_address, Some(4096));

        assert!("CDC_EN=maybe".parse::<ModuleAttributes>().is_err());
        assert!("ADDR=0".parse::<ModuleAttributes>().is_err());
    }
}
